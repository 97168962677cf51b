//! Boundary to the native synthesis libraries.
//!
//! The engine never synthesizes audio itself. Each backend family drives a
//! native engine through one of the traits below, and a host-supplied
//! [`NativeLibrary`] creates those engines. The traits keep the conventions of
//! the library family they stand for (fixed-point or float or int16 output,
//! ticks or milliseconds or seconds for positions, 0-based or native track
//! numbers); turning them into the common model is the adapters' job.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{NativeError, OpenError, OpenResult};
use crate::format::extension_of;

/// Result alias for native calls.
pub type NativeResult<T> = std::result::Result<T, NativeError>;

/// A file read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path the bytes came from.
    pub path: PathBuf,
    /// Whole file contents.
    pub data: Vec<u8>,
}

impl SourceFile {
    /// Read `path` fully. Empty files are rejected.
    pub fn read(path: impl AsRef<Path>) -> OpenResult<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| OpenError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if data.is_empty() {
            return Err(OpenError::EmptyFile);
        }
        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    /// Wrap bytes that were already loaded.
    pub fn from_bytes(path: impl Into<PathBuf>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// Lowercased extension of the source path.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.path)
    }
}

/// One stereo frame with 8 extra fractional bits per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedFrame {
    /// Left channel.
    pub left: i32,
    /// Right channel.
    pub right: i32,
}

/// Device volume that leaves a chip's output unchanged (8.8 fixed point).
pub const UNITY_VOLUME: u16 = 0x100;

/// A sound chip instance inside a chip-log song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Device identifier as used by the native player.
    pub id: u32,
    /// Display name of the chip.
    pub name: String,
    /// Volume in 8.8 fixed point (0x100 = unity).
    pub volume: u16,
}

/// Register-log player (VGM and friends).
pub trait ChipLogEngine: Send {
    /// Change the output rate.
    fn set_sample_rate(&mut self, rate: u32);
    /// Begin playback from the current position.
    fn start(&mut self);
    /// Halt playback.
    fn stop(&mut self);
    /// Render up to `out.len()` frames, returning how many were produced.
    fn render(&mut self, out: &mut [FixedFrame]) -> usize;
    /// Current position in 44.1 kHz ticks.
    fn position_ticks(&self) -> u64;
    /// Whole song length in 44.1 kHz ticks.
    fn total_ticks(&self) -> u64;
    /// Jump to a position given in output samples.
    fn seek_sample(&mut self, sample: u64);
    /// Whether the player reached the end of the song.
    fn is_ended(&self) -> bool;
    /// Loop forever instead of ending after the configured loop count.
    fn set_loop_forever(&mut self, forever: bool);
    /// Playback speed multiplier.
    fn set_speed(&mut self, speed: f64);
    /// Chips used by the song. The same chip may be listed more than once.
    fn devices(&self) -> Vec<DeviceInfo>;
    /// Set a chip's volume (8.8 fixed point).
    fn set_device_volume(&mut self, id: u32, volume: u16);
}

/// Per-track information from an emulated-console player.
///
/// Timing fields are milliseconds; zero or negative means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmulatedTrackInfo {
    /// Declared track length.
    pub length_ms: i64,
    /// Part played before the loop.
    pub intro_ms: i64,
    /// Looped part.
    pub loop_ms: i64,
    /// Song name.
    pub song: String,
    /// Game name.
    pub game: String,
    /// Target system.
    pub system: String,
    /// Composer.
    pub author: String,
    /// Copyright line (usually year and publisher).
    pub copyright: String,
    /// Who ripped the file.
    pub dumper: String,
    /// Free-form comment.
    pub comment: String,
}

/// Multi-format console music emulator (NSF, SPC, GBS, ...).
pub trait EmulatedEngine: Send {
    /// Change the output rate.
    fn set_sample_rate(&mut self, rate: u32);
    /// Number of tracks in the file.
    fn track_count(&self) -> u32;
    /// Start the 0-based track `index` from its beginning.
    fn start_track(&mut self, index: u32) -> NativeResult<()>;
    /// Information about the 0-based track `index`.
    fn track_info(&self, index: u32) -> NativeResult<EmulatedTrackInfo>;
    /// Fill `out` with interleaved stereo samples.
    fn play(&mut self, out: &mut [i16]) -> NativeResult<()>;
    /// Milliseconds played in the current track.
    fn tell_ms(&self) -> u64;
    /// Jump to `ms` in the current track.
    fn seek_ms(&mut self, ms: u64) -> NativeResult<()>;
    /// Whether the current track has ended.
    fn track_ended(&self) -> bool;
    /// Tempo multiplier.
    fn set_tempo(&mut self, tempo: f64);
    /// Apply (or lift) the fade-out and end at the declared track length.
    fn set_play_limit(&mut self, limited: bool);
}

/// Tracker module player.
pub trait TrackerEngine: Send {
    /// Change the output rate.
    fn set_sample_rate(&mut self, rate: u32);
    /// Render interleaved stereo floats into `out`, returning frames produced.
    fn read_interleaved_stereo(&mut self, out: &mut [f32]) -> usize;
    /// Current position in seconds.
    fn position_seconds(&self) -> f64;
    /// Jump to `seconds`.
    fn set_position_seconds(&mut self, seconds: f64);
    /// Number of subsongs.
    fn subsong_count(&self) -> u32;
    /// Select the 0-based subsong `index`.
    fn select_subsong(&mut self, index: u32) -> NativeResult<()>;
    /// How often to repeat; -1 repeats forever.
    fn set_repeat_count(&mut self, count: i32);
    /// Tempo factor.
    fn set_tempo_factor(&mut self, factor: f64);
    /// Metadata lookup by key (`title`, `artist`, `date`, `type_long`,
    /// `tracker`, `message`). Unknown keys yield an empty string.
    fn metadata(&self, key: &str) -> String;
}

/// Timing and naming for one MSX song, when the file carries it.
///
/// Timing fields are milliseconds; zero or negative means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MsxTrackInfo {
    /// Song title.
    pub title: String,
    /// Declared length.
    pub length_ms: i64,
    /// Part played before the loop.
    pub intro_ms: i64,
    /// Looped part.
    pub loop_ms: i64,
}

/// MSX music player (KSS and the MSX driver formats).
pub trait MsxEngine: Send {
    /// Change the output rate.
    fn set_sample_rate(&mut self, rate: u32);
    /// Start the song with the native number `song`.
    fn start_song(&mut self, song: u16) -> NativeResult<()>;
    /// Fill `out` with interleaved stereo samples.
    fn calc(&mut self, out: &mut [i16]);
    /// Whether the driver stopped.
    fn stop_flag(&self) -> bool;
    /// File title, possibly empty.
    fn title(&self) -> String;
    /// Optional per-song info for the native song number `song`.
    fn track_info(&self, song: u16) -> Option<MsxTrackInfo>;
}

/// General MIDI player with OPL synthesis.
pub trait MidiEngine: Send {
    /// Change the output rate.
    fn set_sample_rate(&mut self, rate: u32);
    /// Render interleaved stereo floats into `out`, returning frames produced.
    fn play(&mut self, out: &mut [f32]) -> usize;
    /// Current position in seconds.
    fn position_seconds(&self) -> f64;
    /// Song length in seconds.
    fn total_seconds(&self) -> f64;
    /// Jump to `seconds`.
    fn seek_seconds(&mut self, seconds: f64);
    /// Whether the song reached its end.
    fn at_end(&self) -> bool;
    /// Songs in the file (more than one only for XMI).
    fn song_count(&self) -> u32;
    /// Select the 0-based song `index`.
    fn select_song(&mut self, index: u32) -> NativeResult<()>;
    /// Tempo multiplier.
    fn set_tempo(&mut self, tempo: f64);
    /// Loop the song instead of stopping at its end.
    fn set_loop_enabled(&mut self, enabled: bool);
    /// Title meta event, possibly empty.
    fn title(&self) -> String;
    /// Copyright meta event, possibly empty.
    fn copyright(&self) -> String;
}

/// Factory for native engines, supplied by the host.
///
/// Every method defaults to [`NativeError::Unavailable`], so a host only
/// implements the families it actually links.
pub trait NativeLibrary: Send + Sync {
    /// Load a register-log song.
    fn open_chip_log(
        &self,
        _source: &SourceFile,
        _sample_rate: u32,
        _aux: &AuxFiles,
    ) -> NativeResult<Box<dyn ChipLogEngine>> {
        Err(NativeError::Unavailable)
    }

    /// Load an emulated-console music file.
    fn open_emulated(
        &self,
        _source: &SourceFile,
        _sample_rate: u32,
    ) -> NativeResult<Box<dyn EmulatedEngine>> {
        Err(NativeError::Unavailable)
    }

    /// Load a tracker module.
    fn open_tracker(
        &self,
        _source: &SourceFile,
        _sample_rate: u32,
    ) -> NativeResult<Box<dyn TrackerEngine>> {
        Err(NativeError::Unavailable)
    }

    /// Load an MSX music file.
    fn open_msx(
        &self,
        _source: &SourceFile,
        _sample_rate: u32,
    ) -> NativeResult<Box<dyn MsxEngine>> {
        Err(NativeError::Unavailable)
    }

    /// Load a MIDI file.
    fn open_midi(
        &self,
        _source: &SourceFile,
        _sample_rate: u32,
    ) -> NativeResult<Box<dyn MidiEngine>> {
        Err(NativeError::Unavailable)
    }
}

/// Library with no native engines linked.
///
/// Header-only operations (VGM length and tags, KSS track range) still work.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLibrary;

impl NativeLibrary for NullLibrary {}

/// ROM search path shared between the engine and every resolver it hands out.
///
/// Changing it is seen by open native engines the next time they ask for a file.
#[derive(Debug, Clone, Default)]
pub struct RomPath(Arc<RwLock<Option<PathBuf>>>);

impl RomPath {
    /// Cell holding `path`.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self(Arc::new(RwLock::new(path)))
    }

    /// Current path.
    pub fn get(&self) -> Option<PathBuf> {
        self.0.read().clone()
    }

    /// Replace the path (`None` clears it).
    pub fn set(&self, path: Option<PathBuf>) {
        *self.0.write() = path;
    }
}

/// Resolver for secondary files a native engine asks for (sample ROMs,
/// instrument banks).
///
/// A name is tried next to the primary file first (or as given when the
/// primary file has no directory), then inside the ROM search path. Natives
/// may keep a clone and resolve files long after opening; the ROM path is
/// read at lookup time.
#[derive(Debug, Clone, Default)]
pub struct AuxFiles {
    base_dir: Option<PathBuf>,
    rom_path: RomPath,
}

impl AuxFiles {
    /// Resolver for files referenced by `primary`, with a fixed ROM path.
    pub fn new(primary: &Path, rom_path: Option<&Path>) -> Self {
        Self::shared(primary, &RomPath::new(rom_path.map(Path::to_path_buf)))
    }

    /// Resolver for files referenced by `primary` that follows `rom_path`.
    pub fn shared(primary: &Path, rom_path: &RomPath) -> Self {
        let base_dir = primary
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf);
        Self {
            base_dir,
            rom_path: rom_path.clone(),
        }
    }

    /// ROM search path, if one is configured.
    pub fn rom_path(&self) -> Option<PathBuf> {
        self.rom_path.get()
    }

    /// Paths tried for `name`, in order.
    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let requested = Path::new(name);
        let mut paths = Vec::with_capacity(2);
        match &self.base_dir {
            Some(dir) if requested.is_relative() => paths.push(dir.join(requested)),
            _ => paths.push(requested.to_path_buf()),
        }
        if let Some(rom) = self.rom_path.get() {
            let file_name = if requested.is_absolute() {
                requested.file_name().map(Path::new)
            } else {
                Some(requested)
            };
            if let Some(file_name) = file_name {
                paths.push(rom.join(file_name));
            }
        }
        paths
    }

    /// First existing candidate for `name`.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.candidates(name).into_iter().find(|path| path.is_file())
    }

    /// Contents of the first readable candidate for `name`.
    pub fn load(&self, name: &str) -> Option<Vec<u8>> {
        for path in self.candidates(name) {
            match fs::read(&path) {
                Ok(data) => {
                    log::debug!("aux file '{name}' loaded from {}", path.display());
                    return Some(data);
                }
                Err(e) => log::trace!("aux file candidate {} unusable: {e}", path.display()),
            }
        }
        log::debug!("aux file '{name}' not found");
        None
    }
}
