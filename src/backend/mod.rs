//! Backend adapters.
//!
//! One [`Backend`] implementation per [`BackendKind`]. Each adapter owns the
//! native engine for one open file and converts its output, positions,
//! lengths, tracks and metadata into the common model:
//!
//! - audio is interleaved stereo `i16`, always saturated, never wrapped;
//! - positions and lengths are sample counts at the current output rate;
//! - tracks are 0-based;
//! - metadata is a [`CanonicalTagSet`].
//!
//! Operations a backend cannot perform are no-ops, and [`Capabilities`]
//! tells which ones are real.

mod chiplog;
mod emulated;
mod midi;
mod msx;
mod tracker;

pub use chiplog::ChipLogBackend;
pub use emulated::EmulatedBackend;
pub use midi::MidiBackend;
pub use msx::MsxBackend;
pub use tracker::TrackerBackend;

use bitflags::bitflags;

use crate::error::{OpenResult, TrackError};
use crate::format::BackendKind;
use crate::native::{AuxFiles, DeviceInfo, NativeLibrary, SourceFile};
use crate::tags::CanonicalTagSet;

bitflags! {
    /// What an adapter really supports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Explicit start/stop reaches the native engine.
        const TRANSPORT = 0x01;
        /// Seeking moves the playback position.
        const SEEK = 0x02;
        /// Position comes from the native engine's own clock.
        const EXACT_POSITION = 0x04;
        /// Length is authoritative rather than estimated.
        const EXACT_DURATION = 0x08;
        /// Playback speed can be changed.
        const TEMPO = 0x10;
        /// The native engine reports the end of the song.
        const END_DETECTION = 0x20;
        /// Sound chips are exposed as devices.
        const DEVICES = 0x40;
    }
}

/// One interleaved stereo frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StereoFrame {
    /// Left channel.
    pub left: i16,
    /// Right channel.
    pub right: i16,
}

impl StereoFrame {
    /// Silent frame.
    pub const SILENCE: StereoFrame = StereoFrame { left: 0, right: 0 };

    /// Frame from two channel values.
    pub const fn new(left: i16, right: i16) -> Self {
        Self { left, right }
    }

    /// Mono mix normalized to roughly `-1.0..=1.0`.
    #[inline]
    pub fn mono_mix(&self) -> f32 {
        (self.left as f32 + self.right as f32) / 65536.0
    }
}

/// Clamp a wide sample into `i16`.
#[inline]
pub fn saturate_i32(sample: i32) -> i16 {
    sample.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Fixed-point sample with 8 fractional bits to `i16`.
#[inline]
pub fn fixed_to_i16(sample: i32) -> i16 {
    saturate_i32(sample >> 8)
}

/// Unit float sample to `i16` (NaN becomes silence).
#[inline]
pub fn float_to_i16(sample: f32) -> i16 {
    (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Interleaved `i16` pairs into frames; returns frames written.
pub(crate) fn frames_from_i16(src: &[i16], out: &mut [StereoFrame]) -> usize {
    let mut written = 0;
    for (frame, pair) in out.iter_mut().zip(src.chunks_exact(2)) {
        *frame = StereoFrame::new(pair[0], pair[1]);
        written += 1;
    }
    written
}

/// Interleaved float pairs into saturated frames; returns frames written.
pub(crate) fn frames_from_f32(src: &[f32], out: &mut [StereoFrame]) -> usize {
    let mut written = 0;
    for (frame, pair) in out.iter_mut().zip(src.chunks_exact(2)) {
        *frame = StereoFrame::new(float_to_i16(pair[0]), float_to_i16(pair[1]));
        written += 1;
    }
    written
}

/// Reject `index` unless it lies in `0..count`.
pub(crate) fn check_track(index: u32, count: u32) -> Result<(), TrackError> {
    if index < count {
        Ok(())
    } else {
        Err(TrackError::OutOfRange { index, count })
    }
}

/// Everything an adapter needs to open besides the file itself.
#[derive(Clone, Copy)]
pub struct OpenParams<'a> {
    /// Output sample rate.
    pub sample_rate: u32,
    /// Resolver for ROMs and banks the native engine asks for.
    pub aux: &'a AuxFiles,
    /// Source of native engines.
    pub library: &'a dyn NativeLibrary,
}

/// Uniform playback interface over one open file.
pub trait Backend: Send {
    /// Backend family.
    fn kind(&self) -> BackendKind;

    /// Operations that are real for this adapter.
    fn capabilities(&self) -> Capabilities;

    /// Render up to `out.len()` frames.
    ///
    /// Fewer frames mean the stream ended; 0 means nothing is available now.
    fn render(&mut self, out: &mut [StereoFrame]) -> usize;

    /// Current position in samples.
    fn position(&self) -> u64;

    /// Track length in samples (exact or estimated, see [`Capabilities`]).
    fn total_length(&self) -> u64;

    /// Jump to `sample`. No-op without [`Capabilities::SEEK`].
    fn seek(&mut self, _sample: u64) {}

    /// Whether the native engine reported the end of the song.
    fn is_ended(&self) -> bool;

    /// Number of tracks (1 for single-track formats).
    fn track_count(&self) -> u32 {
        1
    }

    /// 0-based current track.
    fn current_track(&self) -> u32 {
        0
    }

    /// Switch to the 0-based track `index`. On error the track is unchanged.
    fn set_track(&mut self, index: u32) -> Result<(), TrackError> {
        check_track(index, self.track_count())
    }

    /// Playback speed multiplier. No-op without [`Capabilities::TEMPO`].
    fn set_speed(&mut self, _speed: f64) {}

    /// Ask the native engine to loop forever where it can.
    fn set_endless_loop(&mut self, _endless: bool) {}

    /// Change the output rate.
    fn set_sample_rate(&mut self, rate: u32);

    /// Start playback. Only meaningful with [`Capabilities::TRANSPORT`].
    fn play(&mut self) {}

    /// Stop playback. Only meaningful with [`Capabilities::TRANSPORT`].
    fn stop(&mut self) {}

    /// Metadata in canonical form.
    fn tags(&self) -> CanonicalTagSet;

    /// Sound chips, one entry per id. Empty for backends without devices.
    fn devices(&self) -> Vec<DeviceInfo> {
        Vec::new()
    }

    /// Set a device's volume. No-op without [`Capabilities::DEVICES`].
    fn set_device_volume(&mut self, _id: u32, _volume: u16) {}
}

/// Build the adapter for `kind`.
///
/// Nothing acquired by a failed open outlives this call.
pub fn open_backend(
    kind: BackendKind,
    source: &SourceFile,
    params: OpenParams<'_>,
) -> OpenResult<Box<dyn Backend>> {
    let backend: Box<dyn Backend> = match kind {
        BackendKind::ChipLog | BackendKind::None => Box::new(ChipLogBackend::open(source, params)?),
        BackendKind::MultiFormatEmulated => Box::new(EmulatedBackend::open(source, params)?),
        BackendKind::Tracker => Box::new(TrackerBackend::open(source, params)?),
        BackendKind::MsxMusic => Box::new(MsxBackend::open(source, params)?),
        BackendKind::Midi => Box::new(MidiBackend::open(source, params)?),
    };
    Ok(backend)
}
