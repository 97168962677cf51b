//! Emulated-console adapter (NSF, SPC, GBS, HES, AY, SAP).

use super::{check_track, frames_from_i16, Backend, Capabilities, OpenParams, StereoFrame};
use crate::duration::{estimate_samples, ms_to_samples, samples_to_ms, LengthHint};
use crate::error::{NativeError, OpenError, OpenResult, TrackError};
use crate::format::BackendKind;
use crate::native::{EmulatedEngine, EmulatedTrackInfo, SourceFile};
use crate::tags::{CanonicalTagSet, TagKey};

/// Adapter around an [`EmulatedEngine`].
pub struct EmulatedBackend {
    native: Box<dyn EmulatedEngine>,
    track: u32,
    track_count: u32,
    info: EmulatedTrackInfo,
    sample_rate: u32,
    endless: bool,
    scratch: Vec<i16>,
}

impl EmulatedBackend {
    /// Load the file and start its first track.
    pub fn open(source: &SourceFile, params: OpenParams<'_>) -> OpenResult<Self> {
        let kind = BackendKind::MultiFormatEmulated;
        let mut native = params
            .library
            .open_emulated(source, params.sample_rate)
            .map_err(|e| OpenError::native(kind, e))?;

        let track_count = native.track_count();
        if track_count == 0 {
            return Err(OpenError::native(kind, "file contains no tracks".into()));
        }
        native
            .start_track(0)
            .map_err(|e| OpenError::native(kind, e))?;
        let info = load_info(native.as_ref(), 0);

        Ok(Self {
            native,
            track: 0,
            track_count,
            info,
            sample_rate: params.sample_rate,
            endless: false,
            scratch: Vec::new(),
        })
    }

    fn length_hint(&self) -> LengthHint {
        LengthHint::from_native_ms(self.info.intro_ms, self.info.loop_ms, self.info.length_ms)
    }
}

fn load_info(native: &dyn EmulatedEngine, index: u32) -> EmulatedTrackInfo {
    native.track_info(index).unwrap_or_else(|e| {
        log::debug!("no track info for track {index}: {e}");
        EmulatedTrackInfo::default()
    })
}

impl Backend for EmulatedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::MultiFormatEmulated
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SEEK
            | Capabilities::EXACT_POSITION
            | Capabilities::TEMPO
            | Capabilities::END_DETECTION
    }

    fn render(&mut self, out: &mut [StereoFrame]) -> usize {
        if self.native.track_ended() && !self.endless {
            return 0;
        }
        let samples = out.len() * 2;
        if self.scratch.len() < samples {
            self.scratch.resize(samples, 0);
        }
        let scratch = &mut self.scratch[..samples];
        if let Err(e) = self.native.play(scratch) {
            log::warn!("emulator render failed: {e}");
            return 0;
        }
        frames_from_i16(scratch, out)
    }

    fn position(&self) -> u64 {
        ms_to_samples(self.native.tell_ms(), self.sample_rate)
    }

    fn total_length(&self) -> u64 {
        estimate_samples(self.length_hint(), self.sample_rate)
    }

    fn seek(&mut self, sample: u64) {
        if let Err(e) = self.native.seek_ms(samples_to_ms(sample, self.sample_rate)) {
            log::debug!("seek ignored: {e}");
        }
    }

    fn is_ended(&self) -> bool {
        self.native.track_ended()
    }

    fn track_count(&self) -> u32 {
        self.track_count
    }

    fn current_track(&self) -> u32 {
        self.track
    }

    fn set_track(&mut self, index: u32) -> Result<(), TrackError> {
        let count = self.track_count;
        check_track(index, count)?;
        self.native.start_track(index).map_err(|e| match e {
            NativeError::InvalidTrack(_) => TrackError::OutOfRange { index, count },
            other => TrackError::Native(other),
        })?;
        self.track = index;
        self.info = load_info(self.native.as_ref(), index);
        self.native.set_play_limit(!self.endless);
        Ok(())
    }

    fn set_speed(&mut self, speed: f64) {
        self.native.set_tempo(speed);
    }

    fn set_endless_loop(&mut self, endless: bool) {
        self.endless = endless;
        self.native.set_play_limit(!endless);
    }

    fn set_sample_rate(&mut self, rate: u32) {
        self.sample_rate = rate;
        self.native.set_sample_rate(rate);
    }

    fn tags(&self) -> CanonicalTagSet {
        let info = &self.info;
        CanonicalTagSet::new()
            .with(TagKey::Title, info.song.as_str())
            .with(TagKey::Game, info.game.as_str())
            .with(TagKey::System, info.system.as_str())
            .with(TagKey::Artist, info.author.as_str())
            .with(TagKey::Date, info.copyright.as_str())
            .with(TagKey::EncodedBy, info.dumper.as_str())
            .with(TagKey::Comment, info.comment.as_str())
    }
}
