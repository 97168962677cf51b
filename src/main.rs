//! vgmdeck command-line inspector
//!
//! Prints what the engine can tell about music files without playing them:
//! backend, track count, length, KSS song range and VGM tags. No native
//! library is linked here, so only header-based information is available for
//! most formats.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;

use vgmdeck::container::vgm::VGM_MAGIC;
use vgmdeck::{
    classify, BackendKind, CanonicalTagSet, Engine, EngineConfig, NullLibrary, VgmHeader,
};

#[derive(Debug, Parser)]
#[command(name = "vgmdeck")]
#[command(about = "Inspect chiptune, tracker and MIDI files without playing them")]
#[command(after_help = "Set RUST_LOG=debug for verbose logging.")]
struct CliArgs {
    /// Files to inspect
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Print one JSON object per file
    #[arg(long)]
    json: bool,

    /// Output sample rate used for lengths (default 44100)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    rate: Option<u32>,

    /// JSON engine configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct FileReport {
    path: String,
    kind: BackendKind,
    multi_track: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tracks: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    length_samples: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    length_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kss_range: Option<(u16, u16)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<CanonicalTagSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn vgm_tags(path: &Path) -> Option<CanonicalTagSet> {
    let data = fs::read(path).ok()?;
    if !data.starts_with(VGM_MAGIC) {
        return None;
    }
    let header = VgmHeader::parse(&data).ok()?;
    Some(header.tags(&data))
}

fn inspect(engine: &Engine, path: &Path) -> FileReport {
    let kind = classify(path);
    let mut report = FileReport {
        path: path.display().to_string(),
        kind,
        multi_track: engine.is_multi_track(path),
        tracks: None,
        length_samples: None,
        length_seconds: None,
        kss_range: None,
        tags: None,
        error: None,
    };

    match engine.track_count_direct(path) {
        Ok(count) => report.tracks = Some(count),
        Err(e) => report.error = Some(e.to_string()),
    }

    if kind == BackendKind::MsxMusic {
        if let Ok(range) = engine.kss_track_range(path) {
            report.kss_range = Some((range.first, range.last));
        }
    }

    match engine.track_length_direct(path) {
        Ok(samples) => {
            report.length_samples = Some(samples);
            report.length_seconds = Some(samples as f64 / engine.sample_rate() as f64);
        }
        Err(e) => {
            report.error.get_or_insert_with(|| e.to_string());
        }
    }

    if kind == BackendKind::ChipLog {
        report.tags = vgm_tags(path);
    }
    report
}

fn print_text(report: &FileReport) {
    println!("{}", report.path);
    println!("  backend:     {}", report.kind);
    if let Some(tracks) = report.tracks {
        println!("  tracks:      {tracks}");
    }
    if let Some((first, last)) = report.kss_range {
        println!("  kss songs:   {first}..={last}");
    }
    if let (Some(samples), Some(seconds)) = (report.length_samples, report.length_seconds) {
        let minutes = (seconds / 60.0).floor();
        println!(
            "  length:      {samples} samples ({}:{:05.2})",
            minutes,
            seconds - minutes * 60.0
        );
    }
    if let Some(tags) = &report.tags {
        for (key, value) in tags.iter().filter(|(_, v)| !v.is_empty()) {
            println!("  {:<13}{value}", format!("{}:", key.as_str().to_ascii_lowercase()));
        }
    }
    if let Some(error) = &report.error {
        println!("  error:       {error}");
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(rate) = args.rate {
        config.sample_rate = rate;
    }

    let engine = Engine::with_config(Arc::new(NullLibrary), &config)
        .context("invalid engine configuration")?;

    let mut failures = 0usize;
    for path in &args.files {
        let report = inspect(&engine, path);
        if report.error.is_some() {
            failures += 1;
        }
        if args.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            print_text(&report);
        }
    }

    if failures == args.files.len() {
        bail!("no file could be read");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn parses_flags_and_files() {
        let args =
            CliArgs::try_parse_from(["vgmdeck", "--json", "--rate", "48000", "a.vgm", "b.nsf"])
                .unwrap();
        assert!(args.json);
        assert_eq!(args.rate, Some(48_000));
        assert_eq!(args.config, None);
        assert_eq!(args.files, vec![PathBuf::from("a.vgm"), PathBuf::from("b.nsf")]);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(CliArgs::try_parse_from(["vgmdeck"]).is_err(), "files are required");
        assert!(CliArgs::try_parse_from(["vgmdeck", "--rate", "0", "a.vgm"]).is_err());
        assert!(CliArgs::try_parse_from(["vgmdeck", "--rate", "fast", "a.vgm"]).is_err());
        assert!(CliArgs::try_parse_from(["vgmdeck", "--config"]).is_err());
        assert!(CliArgs::try_parse_from(["vgmdeck", "--loud", "a.vgm"]).is_err());
    }
}
