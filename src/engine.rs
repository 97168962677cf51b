//! Playback engine.
//!
//! Owns at most one open file (a session) and runs the transport state
//! machine over it:
//!
//! ```text
//! Closed --open--> Playing (backends with explicit transport)
//!                  Stopped (pull-based backends)
//! Stopped <--play/stop--> Playing
//! any --close / open--> Closed
//! ```
//!
//! Settings such as the sample rate, playback speed and endless loop live on
//! the engine, outlive sessions, and are pushed into every new backend.
//! Probe operations (`track_length_direct` and friends) build their own
//! throwaway parse or backend and never touch the session or the tap.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::backend::{open_backend, Backend, Capabilities, OpenParams, StereoFrame};
use crate::config::{ConfigError, EngineConfig, DEFAULT_SAMPLE_RATE};
use crate::container::kss::{track_range_for, TrackRange};
use crate::container::vgm::{VgmHeader, VGM_MAGIC};
use crate::error::{OpenError, OpenResult, TrackError};
use crate::format::{classify, BackendKind};
use crate::native::{AuxFiles, DeviceInfo, NativeLibrary, RomPath, SourceFile};
use crate::spectrum::SpectrumTap;
use crate::tags::CanonicalTagSet;

/// Largest number of frames rendered per backend call.
pub const MAX_CHUNK_FRAMES: usize = 4096;

/// `fill_buffer` logs one line per this many calls.
const FILL_LOG_INTERVAL: u64 = 100;

/// Transport state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TransportState {
    /// No file open.
    #[default]
    Closed,
    /// File open, not playing.
    Stopped,
    /// File open and playing.
    Playing,
}

/// Settings that survive sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Loop forever instead of ending.
    pub endless_loop: bool,
    /// Playback speed multiplier.
    pub playback_speed: f64,
    /// Secondary search path for ROMs and banks.
    pub rom_path: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            endless_loop: false,
            playback_speed: 1.0,
            rom_path: None,
        }
    }
}

impl From<&EngineConfig> for EngineSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            endless_loop: config.endless_loop,
            playback_speed: config.playback_speed,
            rom_path: config.rom_path.clone(),
        }
    }
}

/// Errors from probe operations.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The file could not be opened.
    #[error(transparent)]
    Open(#[from] OpenError),
    /// The requested track does not exist.
    #[error(transparent)]
    Track(#[from] TrackError),
}

struct Session {
    kind: BackendKind,
    path: PathBuf,
    backend: Box<dyn Backend>,
    state: TransportState,
    scratch: Vec<StereoFrame>,
}

/// The playback engine.
pub struct Engine {
    library: Arc<dyn NativeLibrary>,
    settings: EngineSettings,
    session: Option<Session>,
    tap: Arc<SpectrumTap>,
    rom_path: RomPath,
    fill_calls: u64,
}

impl Engine {
    /// Engine with default settings.
    pub fn new(library: Arc<dyn NativeLibrary>) -> Self {
        Self {
            library,
            settings: EngineSettings::default(),
            session: None,
            tap: Arc::new(SpectrumTap::default()),
            rom_path: RomPath::default(),
            fill_calls: 0,
        }
    }

    /// Engine configured from `config`.
    pub fn with_config(
        library: Arc<dyn NativeLibrary>,
        config: &EngineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let tap = SpectrumTap::new(config.spectrum_size)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(Self {
            library,
            settings: EngineSettings::from(config),
            session: None,
            tap: Arc::new(tap),
            rom_path: RomPath::new(config.rom_path.clone()),
            fill_calls: 0,
        })
    }

    /// Current settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Shared handle to the spectrum tap. The same tap serves every session.
    pub fn tap(&self) -> Arc<SpectrumTap> {
        Arc::clone(&self.tap)
    }

    /// Transport state.
    pub fn state(&self) -> TransportState {
        self.session
            .as_ref()
            .map_or(TransportState::Closed, |s| s.state)
    }

    /// Backend of the open file, [`BackendKind::None`] when closed.
    pub fn kind(&self) -> BackendKind {
        self.session.as_ref().map_or(BackendKind::None, |s| s.kind)
    }

    /// Path of the open file.
    pub fn path(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.path.as_path())
    }

    /// Capabilities of the open backend (empty when closed).
    pub fn capabilities(&self) -> Capabilities {
        self.session
            .as_ref()
            .map_or(Capabilities::empty(), |s| s.backend.capabilities())
    }

    fn open_source(&self, kind: BackendKind, source: &SourceFile) -> OpenResult<Box<dyn Backend>> {
        let aux = AuxFiles::shared(&source.path, &self.rom_path);
        let params = OpenParams {
            sample_rate: self.settings.sample_rate,
            aux: &aux,
            library: self.library.as_ref(),
        };
        open_backend(kind, source, params)
    }

    fn probe_backend(&self, path: &Path) -> OpenResult<Box<dyn Backend>> {
        let source = SourceFile::read(path)?;
        self.open_source(classify(path), &source)
    }

    /// Open `path`, replacing any open file.
    ///
    /// The previous session is torn down first; on error the engine stays closed.
    pub fn open(&mut self, path: impl AsRef<Path>) -> OpenResult<()> {
        let path = path.as_ref();
        self.close();

        let kind = classify(path);
        let opened = SourceFile::read(path).and_then(|source| self.open_source(kind, &source));
        let mut backend = match opened {
            Ok(backend) => backend,
            Err(e) => {
                log::error!("open {} ({kind}) failed: {e}", path.display());
                return Err(e);
            }
        };

        backend.set_sample_rate(self.settings.sample_rate);
        backend.set_speed(self.settings.playback_speed);
        backend.set_endless_loop(self.settings.endless_loop);

        let state = if backend.capabilities().contains(Capabilities::TRANSPORT) {
            backend.play();
            TransportState::Playing
        } else {
            TransportState::Stopped
        };

        log::debug!(
            "opened {} as {kind}, rate={} tracks={} length={}",
            path.display(),
            self.settings.sample_rate,
            backend.track_count(),
            backend.total_length()
        );

        self.session = Some(Session {
            kind,
            path: path.to_path_buf(),
            backend,
            state,
            scratch: vec![StereoFrame::SILENCE; MAX_CHUNK_FRAMES],
        });
        Ok(())
    }

    /// Close the open file and clear the spectrum tap.
    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            if session.state == TransportState::Playing {
                session.backend.stop();
            }
            log::debug!("closed {}", session.path.display());
        }
        self.tap.clear();
    }

    /// Start playback.
    pub fn play(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.backend.play();
            session.state = TransportState::Playing;
        }
    }

    /// Stop playback.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.backend.stop();
            session.state = TransportState::Stopped;
        }
    }

    /// Whether the song ended. Never true with endless loop on, or when closed.
    pub fn is_ended(&self) -> bool {
        match &self.session {
            Some(session) => !self.settings.endless_loop && session.backend.is_ended(),
            None => false,
        }
    }

    /// Track length in samples (0 when closed).
    pub fn total_samples(&self) -> u64 {
        self.session
            .as_ref()
            .map_or(0, |s| s.backend.total_length())
    }

    /// Playback position in samples (0 when closed).
    pub fn current_sample(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.backend.position())
    }

    /// Seek to `sample`, where the backend supports it.
    pub fn seek(&mut self, sample: u64) {
        if let Some(session) = self.session.as_mut() {
            session.backend.seek(sample);
        }
    }

    /// Render interleaved stereo into `out` (`out.len() / 2` frames).
    ///
    /// Returns the frames written; fewer than requested means the backend ran
    /// out. Every frame written is also fed to the spectrum tap.
    pub fn fill_buffer(&mut self, out: &mut [i16]) -> usize {
        let Some(session) = self.session.as_mut() else {
            return 0;
        };
        let frames = out.len() / 2;
        let mut written = 0;

        while written < frames {
            let chunk = (frames - written).min(MAX_CHUNK_FRAMES);
            let scratch = &mut session.scratch[..chunk];
            scratch.fill(StereoFrame::SILENCE);
            let got = session.backend.render(scratch).min(chunk);
            if got == 0 {
                log::trace!("render returned 0 frames after {written}");
                break;
            }
            for (i, frame) in scratch[..got].iter().enumerate() {
                let at = (written + i) * 2;
                out[at] = frame.left;
                out[at + 1] = frame.right;
                self.tap.push_frame(*frame);
            }
            written += got;
        }

        if self.fill_calls % FILL_LOG_INTERVAL == 0 {
            log::debug!("fill_buffer: wrote {written}/{frames} frames");
            if written > 0 {
                log::debug!("fill_buffer: first frame L={} R={}", out[0], out[1]);
            }
        }
        self.fill_calls = self.fill_calls.wrapping_add(1);
        written
    }

    /// Magnitude spectrum of the most recent output.
    pub fn spectrum(&self) -> Vec<f32> {
        self.tap.spectrum()
    }

    /// Metadata of the open file (all keys empty when closed).
    pub fn tags(&self) -> CanonicalTagSet {
        self.session
            .as_ref()
            .map_or_else(CanonicalTagSet::new, |s| s.backend.tags())
    }

    /// Number of tracks (0 when closed).
    pub fn track_count(&self) -> u32 {
        self.session
            .as_ref()
            .map_or(0, |s| s.backend.track_count())
    }

    /// 0-based current track (0 when closed).
    pub fn current_track(&self) -> u32 {
        self.session
            .as_ref()
            .map_or(0, |s| s.backend.current_track())
    }

    /// Switch to the 0-based track `index`.
    pub fn set_track(&mut self, index: u32) -> Result<(), TrackError> {
        let session = self.session.as_mut().ok_or(TrackError::NoSession)?;
        session.backend.set_track(index).map_err(|e| {
            log::debug!("set_track({index}) rejected: {e}");
            e
        })
    }

    /// Playback speed multiplier.
    pub fn playback_speed(&self) -> f64 {
        self.settings.playback_speed
    }

    /// Set the playback speed. Non-finite or non-positive values are ignored.
    pub fn set_speed(&mut self, speed: f64) {
        if !speed.is_finite() || speed <= 0.0 {
            log::warn!("ignoring invalid playback speed {speed}");
            return;
        }
        self.settings.playback_speed = speed;
        if let Some(session) = self.session.as_mut() {
            session.backend.set_speed(speed);
        }
    }

    /// Whether endless loop is on.
    pub fn endless_loop(&self) -> bool {
        self.settings.endless_loop
    }

    /// Turn endless loop on or off. The setting survives close and open.
    pub fn set_endless_loop(&mut self, endless: bool) {
        self.settings.endless_loop = endless;
        if let Some(session) = self.session.as_mut() {
            session.backend.set_endless_loop(endless);
        }
    }

    /// Output sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.settings.sample_rate
    }

    /// Change the output rate. Zero is ignored.
    pub fn set_sample_rate(&mut self, rate: u32) {
        if rate == 0 {
            log::warn!("ignoring zero sample rate");
            return;
        }
        self.settings.sample_rate = rate;
        if let Some(session) = self.session.as_mut() {
            session.backend.set_sample_rate(rate);
        }
    }

    /// Set or clear the ROM search path.
    ///
    /// The open session sees the new path on its next file request.
    pub fn set_rom_path(&mut self, path: Option<PathBuf>) {
        log::debug!("rom path: {:?}", path);
        self.rom_path.set(path.clone());
        self.settings.rom_path = path;
    }

    /// Sound chips of the open file, one per id.
    pub fn devices(&self) -> Vec<DeviceInfo> {
        self.session
            .as_ref()
            .map_or_else(Vec::new, |s| s.backend.devices())
    }

    /// Number of distinct devices.
    pub fn device_count(&self) -> usize {
        self.devices().len()
    }

    /// Name of the device with `id`.
    pub fn device_name(&self, id: u32) -> Option<String> {
        self.devices()
            .into_iter()
            .find(|d| d.id == id)
            .map(|d| d.name)
    }

    /// Volume of the device with `id`.
    pub fn device_volume(&self, id: u32) -> Option<u16> {
        self.devices()
            .into_iter()
            .find(|d| d.id == id)
            .map(|d| d.volume)
    }

    /// Set the volume of the device with `id`.
    pub fn set_device_volume(&mut self, id: u32, volume: u16) {
        if let Some(session) = self.session.as_mut() {
            session.backend.set_device_volume(id, volume);
        }
    }

    /// Length of `path`'s first track in samples, without touching the session.
    ///
    /// VGM files are measured from their header alone; everything else,
    /// gzip-compressed VGM included, through a throwaway adapter.
    pub fn track_length_direct(&self, path: impl AsRef<Path>) -> Result<u64, ProbeError> {
        let path = path.as_ref();
        let kind = classify(path);
        let source = SourceFile::read(path)?;
        if kind == BackendKind::ChipLog && source.data.starts_with(VGM_MAGIC) {
            let header = VgmHeader::parse(&source.data).map_err(OpenError::from)?;
            return Ok(header.length_samples(self.settings.sample_rate));
        }
        Ok(self.open_source(kind, &source)?.total_length())
    }

    /// Length of track `index` of `path` in samples, without touching the session.
    pub fn track_length(&self, path: impl AsRef<Path>, index: u32) -> Result<u64, ProbeError> {
        let mut backend = self.probe_backend(path.as_ref())?;
        backend.set_track(index)?;
        Ok(backend.total_length())
    }

    /// Number of tracks in `path`, without touching the session.
    pub fn track_count_direct(&self, path: impl AsRef<Path>) -> Result<u32, ProbeError> {
        let path = path.as_ref();
        match classify(path) {
            BackendKind::MsxMusic => Ok(self.kss_track_range(path)?.count()),
            BackendKind::ChipLog | BackendKind::None => {
                SourceFile::read(path)?;
                Ok(1)
            }
            _ => Ok(self.probe_backend(path)?.track_count()),
        }
    }

    /// Whether `path` holds more than one track. Unreadable files report false.
    pub fn is_multi_track(&self, path: impl AsRef<Path>) -> bool {
        self.track_count_direct(path)
            .map(|count| count > 1)
            .unwrap_or(false)
    }

    /// Native song range of an MSX file.
    pub fn kss_track_range(&self, path: impl AsRef<Path>) -> Result<TrackRange, ProbeError> {
        let source = SourceFile::read(path.as_ref())?;
        let range = track_range_for(&source.path, &source.data).map_err(OpenError::from)?;
        Ok(range)
    }

    /// Number of songs in an MSX file.
    pub fn kss_track_count_direct(&self, path: impl AsRef<Path>) -> Result<u32, ProbeError> {
        Ok(self.kss_track_range(path)?.count())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.close();
    }
}
