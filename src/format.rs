//! File classification.
//!
//! Maps a path to the [`BackendKind`] that will play it. Classification only
//! looks at the final extension of the file name; the file itself is never
//! opened here. Anything not claimed by one of the specialised backends falls
//! through to the chip-log backend.

use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Register-log formats (VGM family and friends).
const CHIP_LOG_EXTENSIONS: &[&str] = &["vgm", "vgz", "s98", "dro", "gym"];

/// Console music formats played by a CPU + sound-chip emulator.
const EMULATED_EXTENSIONS: &[&str] = &["nsf", "nsfe", "spc", "gbs", "hes", "ay", "sap"];

/// Tracker modules.
const TRACKER_EXTENSIONS: &[&str] = &[
    "mod", "xm", "s3m", "it", "mptm", "stm", "669", "mtm", "med", "okt", "far", "ult", "umx",
];

/// MSX music formats.
const MSX_EXTENSIONS: &[&str] = &["kss", "mgs", "bgm", "opx", "mpk", "mbm"];

/// Standard MIDI files and close relatives, rendered through OPL synthesis.
const MIDI_EXTENSIONS: &[&str] = &["mid", "midi", "rmi", "smf", "xmi", "mus"];

/// Synthesis backend family responsible for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum BackendKind {
    /// No backend (closed engine).
    #[default]
    None,
    /// Sound-chip register logs (VGM and similar).
    ChipLog,
    /// Emulated console music (NSF, SPC, GBS, ...).
    MultiFormatEmulated,
    /// Tracker modules (MOD, XM, S3M, IT, ...).
    Tracker,
    /// MSX music (KSS, MGS, ...).
    MsxMusic,
    /// General MIDI rendered with OPL synthesis.
    Midi,
}

impl BackendKind {
    /// Every concrete backend, in dispatch order.
    pub const CONCRETE: [BackendKind; 5] = [
        BackendKind::ChipLog,
        BackendKind::MultiFormatEmulated,
        BackendKind::Tracker,
        BackendKind::MsxMusic,
        BackendKind::Midi,
    ];

    /// Extensions explicitly claimed by this backend (lowercase, without dot).
    ///
    /// `ChipLog` additionally receives every unknown extension.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            BackendKind::None => &[],
            BackendKind::ChipLog => CHIP_LOG_EXTENSIONS,
            BackendKind::MultiFormatEmulated => EMULATED_EXTENSIONS,
            BackendKind::Tracker => TRACKER_EXTENSIONS,
            BackendKind::MsxMusic => MSX_EXTENSIONS,
            BackendKind::Midi => MIDI_EXTENSIONS,
        }
    }

    /// Short human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::None => "none",
            BackendKind::ChipLog => "chip log",
            BackendKind::MultiFormatEmulated => "emulated",
            BackendKind::Tracker => "tracker",
            BackendKind::MsxMusic => "msx",
            BackendKind::Midi => "midi",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lowercased final extension of `path`, if the file name has one.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Pick the backend for `path` from its extension.
///
/// Pure function of the file name: no I/O happens here.
pub fn classify(path: impl AsRef<Path>) -> BackendKind {
    let Some(ext) = extension_of(path.as_ref()) else {
        return BackendKind::ChipLog;
    };

    [
        BackendKind::MultiFormatEmulated,
        BackendKind::Tracker,
        BackendKind::MsxMusic,
        BackendKind::Midi,
    ]
    .into_iter()
    .find(|kind| kind.extensions().contains(&ext.as_str()))
    .unwrap_or(BackendKind::ChipLog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn extension_sets_are_pairwise_disjoint() {
        let mut owner: HashMap<&str, BackendKind> = HashMap::new();
        for kind in BackendKind::CONCRETE {
            for ext in kind.extensions() {
                if let Some(previous) = owner.insert(ext, kind) {
                    panic!("extension '{ext}' claimed by both {previous:?} and {kind:?}");
                }
            }
        }
    }

    #[test]
    fn every_listed_extension_maps_to_its_owner() {
        for kind in BackendKind::CONCRETE {
            for ext in kind.extensions() {
                let path = format!("song.{ext}");
                assert_eq!(classify(&path), kind, "{path}");
            }
        }
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classify("Music/Stage1.SPC"), BackendKind::MultiFormatEmulated);
        assert_eq!(classify("intro.Xm"), BackendKind::Tracker);
        assert_eq!(classify("/tmp/GAME.KSS"), BackendKind::MsxMusic);
        assert_eq!(classify("title.MID"), BackendKind::Midi);
    }

    #[test]
    fn only_the_last_dot_segment_counts() {
        assert_eq!(classify("song.mid.vgm"), BackendKind::ChipLog);
        assert_eq!(classify("song.vgm.mod"), BackendKind::Tracker);
    }

    #[test]
    fn unknown_or_missing_extensions_default_to_chip_log() {
        assert_eq!(classify("track.xyz"), BackendKind::ChipLog);
        assert_eq!(classify("README"), BackendKind::ChipLog);
        assert_eq!(classify(""), BackendKind::ChipLog);
    }

    #[test]
    fn none_claims_nothing() {
        assert!(BackendKind::None.extensions().is_empty());
        assert_eq!(BackendKind::default(), BackendKind::None);
    }
}
