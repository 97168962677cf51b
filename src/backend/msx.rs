//! MSX music adapter (KSS and the MSX driver formats).
//!
//! The native player has no clock and no seek, so the position is the number
//! of frames rendered since the current song started, and seeking is ignored.
//! Song numbers are native: canonical track `i` is song `first + i` of the
//! range the header declares.

use super::{frames_from_i16, Backend, Capabilities, OpenParams, StereoFrame};
use crate::container::kss::{track_range_for, TrackRange};
use crate::duration::{estimate_samples, LengthHint};
use crate::error::{NativeError, OpenError, OpenResult, TrackError};
use crate::format::BackendKind;
use crate::native::{MsxEngine, MsxTrackInfo, SourceFile};
use crate::tags::{CanonicalTagSet, TagKey};

const SYSTEM_NAME: &str = "MSX";

/// Adapter around an [`MsxEngine`].
pub struct MsxBackend {
    native: Box<dyn MsxEngine>,
    range: TrackRange,
    track: u32,
    info: Option<MsxTrackInfo>,
    frames_rendered: u64,
    sample_rate: u32,
    scratch: Vec<i16>,
}

impl MsxBackend {
    /// Read the song range, load the file and start its first song.
    pub fn open(source: &SourceFile, params: OpenParams<'_>) -> OpenResult<Self> {
        let kind = BackendKind::MsxMusic;
        let range = track_range_for(&source.path, &source.data)?;
        let mut native = params
            .library
            .open_msx(source, params.sample_rate)
            .map_err(|e| OpenError::native(kind, e))?;
        native
            .start_song(range.first)
            .map_err(|e| OpenError::native(kind, e))?;
        let info = native.track_info(range.first);

        Ok(Self {
            native,
            range,
            track: 0,
            info,
            frames_rendered: 0,
            sample_rate: params.sample_rate,
            scratch: Vec::new(),
        })
    }

    /// Song range declared by the file.
    pub fn range(&self) -> TrackRange {
        self.range
    }

    fn length_hint(&self) -> LengthHint {
        match &self.info {
            Some(info) => LengthHint::from_native_ms(info.intro_ms, info.loop_ms, info.length_ms),
            None => LengthHint::Endless,
        }
    }
}

impl Backend for MsxBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::MsxMusic
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::END_DETECTION
    }

    fn render(&mut self, out: &mut [StereoFrame]) -> usize {
        if self.native.stop_flag() {
            return 0;
        }
        let samples = out.len() * 2;
        if self.scratch.len() < samples {
            self.scratch.resize(samples, 0);
        }
        let scratch = &mut self.scratch[..samples];
        self.native.calc(scratch);
        let frames = frames_from_i16(scratch, out);
        self.frames_rendered = self.frames_rendered.saturating_add(frames as u64);
        frames
    }

    fn position(&self) -> u64 {
        self.frames_rendered
    }

    fn total_length(&self) -> u64 {
        estimate_samples(self.length_hint(), self.sample_rate)
    }

    fn is_ended(&self) -> bool {
        self.native.stop_flag()
    }

    fn track_count(&self) -> u32 {
        self.range.count()
    }

    fn current_track(&self) -> u32 {
        self.track
    }

    fn set_track(&mut self, index: u32) -> Result<(), TrackError> {
        let count = self.range.count();
        let song = self
            .range
            .native(index)
            .ok_or(TrackError::OutOfRange { index, count })?;
        self.native.start_song(song).map_err(|e| match e {
            NativeError::InvalidTrack(_) => TrackError::OutOfRange { index, count },
            other => TrackError::Native(other),
        })?;
        self.track = index;
        self.info = self.native.track_info(song);
        self.frames_rendered = 0;
        Ok(())
    }

    fn set_sample_rate(&mut self, rate: u32) {
        self.sample_rate = rate;
        self.native.set_sample_rate(rate);
    }

    fn tags(&self) -> CanonicalTagSet {
        let mut title = self.native.title();
        if title.trim().is_empty() {
            if let Some(info) = &self.info {
                title = info.title.clone();
            }
        }
        CanonicalTagSet::new()
            .with(TagKey::Title, title)
            .with(TagKey::System, SYSTEM_NAME)
    }
}
