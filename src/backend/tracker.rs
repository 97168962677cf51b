//! Tracker module adapter.
//!
//! Modules are played with infinite repeat, so they never end and their
//! length is the default track length.

use super::{check_track, frames_from_f32, Backend, Capabilities, OpenParams, StereoFrame};
use crate::duration::{estimate_samples, samples_to_secs_f64, secs_f64_to_samples, LengthHint};
use crate::error::{OpenError, OpenResult, TrackError};
use crate::format::BackendKind;
use crate::native::{SourceFile, TrackerEngine};
use crate::tags::{CanonicalTagSet, TagKey};

const REPEAT_FOREVER: i32 = -1;

/// Metadata keys and where they land.
const METADATA_KEYS: [(&str, TagKey); 6] = [
    ("title", TagKey::Title),
    ("artist", TagKey::Artist),
    ("date", TagKey::Date),
    ("type_long", TagKey::System),
    ("tracker", TagKey::EncodedBy),
    ("message", TagKey::Comment),
];

/// Adapter around a [`TrackerEngine`].
pub struct TrackerBackend {
    native: Box<dyn TrackerEngine>,
    subsong: u32,
    subsong_count: u32,
    sample_rate: u32,
    scratch: Vec<f32>,
}

impl TrackerBackend {
    /// Load the module, set to repeat forever.
    pub fn open(source: &SourceFile, params: OpenParams<'_>) -> OpenResult<Self> {
        let mut native = params
            .library
            .open_tracker(source, params.sample_rate)
            .map_err(|e| OpenError::native(BackendKind::Tracker, e))?;
        native.set_repeat_count(REPEAT_FOREVER);
        let subsong_count = native.subsong_count().max(1);

        Ok(Self {
            native,
            subsong: 0,
            subsong_count,
            sample_rate: params.sample_rate,
            scratch: Vec::new(),
        })
    }
}

impl Backend for TrackerBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Tracker
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SEEK | Capabilities::EXACT_POSITION | Capabilities::TEMPO
    }

    fn render(&mut self, out: &mut [StereoFrame]) -> usize {
        let samples = out.len() * 2;
        if self.scratch.len() < samples {
            self.scratch.resize(samples, 0.0);
        }
        let scratch = &mut self.scratch[..samples];
        let frames = self.native.read_interleaved_stereo(scratch).min(out.len());
        frames_from_f32(&scratch[..frames * 2], out)
    }

    fn position(&self) -> u64 {
        secs_f64_to_samples(self.native.position_seconds(), self.sample_rate)
    }

    fn total_length(&self) -> u64 {
        estimate_samples(LengthHint::Endless, self.sample_rate)
    }

    fn seek(&mut self, sample: u64) {
        self.native
            .set_position_seconds(samples_to_secs_f64(sample, self.sample_rate));
    }

    fn is_ended(&self) -> bool {
        false
    }

    fn track_count(&self) -> u32 {
        self.subsong_count
    }

    fn current_track(&self) -> u32 {
        self.subsong
    }

    fn set_track(&mut self, index: u32) -> Result<(), TrackError> {
        check_track(index, self.subsong_count)?;
        self.native.select_subsong(index)?;
        self.subsong = index;
        Ok(())
    }

    fn set_speed(&mut self, speed: f64) {
        self.native.set_tempo_factor(speed);
    }

    fn set_sample_rate(&mut self, rate: u32) {
        self.sample_rate = rate;
        self.native.set_sample_rate(rate);
    }

    fn tags(&self) -> CanonicalTagSet {
        let mut tags = CanonicalTagSet::new();
        for (key, tag) in METADATA_KEYS {
            tags.set(tag, self.native.metadata(key));
        }
        tags
    }
}
