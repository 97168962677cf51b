//! MIDI adapter (OPL synthesis).

use super::{check_track, frames_from_f32, Backend, Capabilities, OpenParams, StereoFrame};
use crate::duration::{
    estimate_samples, samples_to_secs_f64, secs_f64_to_samples, LengthHint,
};
use crate::error::{OpenError, OpenResult, TrackError};
use crate::format::BackendKind;
use crate::native::{MidiEngine, SourceFile};
use crate::tags::{CanonicalTagSet, TagKey};

/// Adapter around a [`MidiEngine`].
pub struct MidiBackend {
    native: Box<dyn MidiEngine>,
    song: u32,
    song_count: u32,
    sample_rate: u32,
    scratch: Vec<f32>,
}

impl MidiBackend {
    /// Load the file; the first song is selected.
    pub fn open(source: &SourceFile, params: OpenParams<'_>) -> OpenResult<Self> {
        let native = params
            .library
            .open_midi(source, params.sample_rate)
            .map_err(|e| OpenError::native(BackendKind::Midi, e))?;
        let song_count = native.song_count().max(1);

        Ok(Self {
            native,
            song: 0,
            song_count,
            sample_rate: params.sample_rate,
            scratch: Vec::new(),
        })
    }
}

impl Backend for MidiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Midi
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SEEK
            | Capabilities::EXACT_POSITION
            | Capabilities::EXACT_DURATION
            | Capabilities::TEMPO
            | Capabilities::END_DETECTION
    }

    fn render(&mut self, out: &mut [StereoFrame]) -> usize {
        let samples = out.len() * 2;
        if self.scratch.len() < samples {
            self.scratch.resize(samples, 0.0);
        }
        let scratch = &mut self.scratch[..samples];
        let frames = self.native.play(scratch).min(out.len());
        frames_from_f32(&scratch[..frames * 2], out)
    }

    fn position(&self) -> u64 {
        secs_f64_to_samples(self.native.position_seconds(), self.sample_rate)
    }

    fn total_length(&self) -> u64 {
        let samples = secs_f64_to_samples(self.native.total_seconds(), self.sample_rate);
        estimate_samples(LengthHint::Exact(samples), self.sample_rate)
    }

    fn seek(&mut self, sample: u64) {
        self.native
            .seek_seconds(samples_to_secs_f64(sample, self.sample_rate));
    }

    fn is_ended(&self) -> bool {
        self.native.at_end()
    }

    fn track_count(&self) -> u32 {
        self.song_count
    }

    fn current_track(&self) -> u32 {
        self.song
    }

    fn set_track(&mut self, index: u32) -> Result<(), TrackError> {
        check_track(index, self.song_count)?;
        self.native.select_song(index)?;
        self.song = index;
        Ok(())
    }

    fn set_speed(&mut self, speed: f64) {
        self.native.set_tempo(speed);
    }

    fn set_endless_loop(&mut self, endless: bool) {
        self.native.set_loop_enabled(endless);
    }

    fn set_sample_rate(&mut self, rate: u32) {
        self.sample_rate = rate;
        self.native.set_sample_rate(rate);
    }

    fn tags(&self) -> CanonicalTagSet {
        CanonicalTagSet::new()
            .with(TagKey::Title, self.native.title())
            .with(TagKey::Comment, self.native.copyright())
    }
}
