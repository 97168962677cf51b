//! Shared fixtures for integration tests: scripted native engines and
//! builders for VGM / KSS files.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use vgmdeck::container::vgm::is_gzip;
use vgmdeck::native::{
    ChipLogEngine, EmulatedEngine, EmulatedTrackInfo, FixedFrame, MidiEngine, MsxEngine,
    MsxTrackInfo, NativeResult, TrackerEngine,
};
use vgmdeck::{AuxFiles, DeviceInfo, NativeError, NativeLibrary, SourceFile};

pub const RATE: u32 = 44_100;

/// Record of what the natives were asked to do.
#[derive(Debug, Default)]
pub struct Calls {
    pub opened: Vec<PathBuf>,
    pub started: usize,
    pub stopped: usize,
    pub songs: Vec<u16>,
    pub aux_loaded: Vec<(String, Vec<u8>)>,
    pub aux_missing: Vec<String>,
}

pub type CallLog = Arc<Mutex<Calls>>;

// ---------------------------------------------------------------------------
// Chip log

#[derive(Debug, Clone)]
pub struct ChipLogScript {
    /// Value emitted for both channels of every frame.
    pub sample: i32,
    /// Frames produced before the song ends.
    pub frames: u64,
    /// Native device list (may contain duplicates).
    pub devices: Vec<DeviceInfo>,
    /// Aux file requested on open.
    pub aux_request: Option<String>,
    /// Aux file requested each time playback starts.
    pub aux_on_start: Option<String>,
    /// Whether gzip payloads are inflated (otherwise rejected).
    pub inflates_gzip: bool,
}

impl Default for ChipLogScript {
    fn default() -> Self {
        Self {
            sample: 0x1000 << 8,
            frames: u64::MAX,
            devices: Vec::new(),
            aux_request: None,
            aux_on_start: None,
            inflates_gzip: true,
        }
    }
}

struct FakeChipLog {
    script: ChipLogScript,
    calls: CallLog,
    aux: AuxFiles,
    rate: u32,
    pos: u64,
    playing: bool,
    loop_forever: bool,
    volumes: HashMap<u32, u16>,
}

impl ChipLogEngine for FakeChipLog {
    fn set_sample_rate(&mut self, rate: u32) {
        self.rate = rate;
    }
    fn start(&mut self) {
        self.playing = true;
        let mut calls = self.calls.lock();
        calls.started += 1;
        if let Some(name) = &self.script.aux_on_start {
            match self.aux.load(name) {
                Some(data) => calls.aux_loaded.push((name.clone(), data)),
                None => calls.aux_missing.push(name.clone()),
            }
        }
    }
    fn stop(&mut self) {
        self.playing = false;
        self.calls.lock().stopped += 1;
    }
    fn render(&mut self, out: &mut [FixedFrame]) -> usize {
        if !self.playing {
            return 0;
        }
        let left = if self.loop_forever {
            out.len() as u64
        } else {
            self.script.frames.saturating_sub(self.pos).min(out.len() as u64)
        };
        let n = left as usize;
        for frame in &mut out[..n] {
            *frame = FixedFrame {
                left: self.script.sample,
                right: self.script.sample,
            };
        }
        self.pos += left;
        n
    }
    fn position_ticks(&self) -> u64 {
        self.pos.saturating_mul(44_100) / self.rate as u64
    }
    fn total_ticks(&self) -> u64 {
        self.script.frames.saturating_mul(44_100) / self.rate as u64
    }
    fn seek_sample(&mut self, sample: u64) {
        self.pos = sample;
    }
    fn is_ended(&self) -> bool {
        !self.loop_forever && self.pos >= self.script.frames
    }
    fn set_loop_forever(&mut self, forever: bool) {
        self.loop_forever = forever;
    }
    fn set_speed(&mut self, _speed: f64) {}
    fn devices(&self) -> Vec<DeviceInfo> {
        self.script
            .devices
            .iter()
            .map(|d| DeviceInfo {
                volume: self.volumes.get(&d.id).copied().unwrap_or(d.volume),
                ..d.clone()
            })
            .collect()
    }
    fn set_device_volume(&mut self, id: u32, volume: u16) {
        self.volumes.insert(id, volume);
    }
}

// ---------------------------------------------------------------------------
// Emulated console

#[derive(Debug, Clone)]
pub struct EmulatedScript {
    pub tracks: Vec<EmulatedTrackInfo>,
    pub sample: i16,
    /// Frames until the track ends while the play limit is on.
    pub frames_per_track: u64,
}

impl Default for EmulatedScript {
    fn default() -> Self {
        Self {
            tracks: vec![EmulatedTrackInfo::default()],
            sample: 1000,
            frames_per_track: u64::MAX,
        }
    }
}

struct FakeEmulated {
    script: EmulatedScript,
    rate: u32,
    track: u32,
    frames: u64,
    limited: bool,
    tempo: f64,
}

impl EmulatedEngine for FakeEmulated {
    fn set_sample_rate(&mut self, rate: u32) {
        self.rate = rate;
    }
    fn track_count(&self) -> u32 {
        self.script.tracks.len() as u32
    }
    fn start_track(&mut self, index: u32) -> NativeResult<()> {
        if index as usize >= self.script.tracks.len() {
            return Err(NativeError::InvalidTrack(index));
        }
        self.track = index;
        self.frames = 0;
        Ok(())
    }
    fn track_info(&self, index: u32) -> NativeResult<EmulatedTrackInfo> {
        self.script
            .tracks
            .get(index as usize)
            .cloned()
            .ok_or(NativeError::InvalidTrack(index))
    }
    fn play(&mut self, out: &mut [i16]) -> NativeResult<()> {
        out.fill(self.script.sample);
        self.frames += (out.len() / 2) as u64;
        Ok(())
    }
    fn tell_ms(&self) -> u64 {
        self.frames.saturating_mul(1000) / self.rate as u64
    }
    fn seek_ms(&mut self, ms: u64) -> NativeResult<()> {
        self.frames = ms.saturating_mul(self.rate as u64) / 1000;
        Ok(())
    }
    fn track_ended(&self) -> bool {
        self.limited && self.frames >= self.script.frames_per_track
    }
    fn set_tempo(&mut self, tempo: f64) {
        self.tempo = tempo;
    }
    fn set_play_limit(&mut self, limited: bool) {
        self.limited = limited;
    }
}

// ---------------------------------------------------------------------------
// Tracker

#[derive(Debug, Clone)]
pub struct TrackerScript {
    pub sample: f32,
    pub subsongs: u32,
    pub metadata: HashMap<String, String>,
}

impl Default for TrackerScript {
    fn default() -> Self {
        Self {
            sample: 0.25,
            subsongs: 1,
            metadata: HashMap::new(),
        }
    }
}

struct FakeTracker {
    script: TrackerScript,
    rate: u32,
    frames: u64,
    subsong: u32,
    repeat: i32,
}

impl TrackerEngine for FakeTracker {
    fn set_sample_rate(&mut self, rate: u32) {
        self.rate = rate;
    }
    fn read_interleaved_stereo(&mut self, out: &mut [f32]) -> usize {
        out.fill(self.script.sample);
        self.frames += (out.len() / 2) as u64;
        out.len() / 2
    }
    fn position_seconds(&self) -> f64 {
        self.frames as f64 / self.rate as f64
    }
    fn set_position_seconds(&mut self, seconds: f64) {
        self.frames = (seconds * self.rate as f64).round() as u64;
    }
    fn subsong_count(&self) -> u32 {
        self.script.subsongs
    }
    fn select_subsong(&mut self, index: u32) -> NativeResult<()> {
        if index >= self.script.subsongs {
            return Err(NativeError::InvalidTrack(index));
        }
        self.subsong = index;
        self.frames = 0;
        Ok(())
    }
    fn set_repeat_count(&mut self, count: i32) {
        self.repeat = count;
    }
    fn set_tempo_factor(&mut self, _factor: f64) {}
    fn metadata(&self, key: &str) -> String {
        self.script.metadata.get(key).cloned().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// MSX

#[derive(Debug, Clone)]
pub struct MsxScript {
    pub title: String,
    pub info: Option<MsxTrackInfo>,
    /// Frames until the driver stops.
    pub frames: u64,
    pub sample: i16,
}

impl Default for MsxScript {
    fn default() -> Self {
        Self {
            title: String::new(),
            info: None,
            frames: u64::MAX,
            sample: 500,
        }
    }
}

struct FakeMsx {
    script: MsxScript,
    calls: CallLog,
    frames: u64,
}

impl MsxEngine for FakeMsx {
    fn set_sample_rate(&mut self, _rate: u32) {}
    fn start_song(&mut self, song: u16) -> NativeResult<()> {
        self.calls.lock().songs.push(song);
        self.frames = 0;
        Ok(())
    }
    fn calc(&mut self, out: &mut [i16]) {
        out.fill(self.script.sample);
        self.frames += (out.len() / 2) as u64;
    }
    fn stop_flag(&self) -> bool {
        self.frames >= self.script.frames
    }
    fn title(&self) -> String {
        self.script.title.clone()
    }
    fn track_info(&self, _song: u16) -> Option<MsxTrackInfo> {
        self.script.info.clone()
    }
}

// ---------------------------------------------------------------------------
// MIDI

#[derive(Debug, Clone)]
pub struct MidiScript {
    pub total_seconds: f64,
    pub songs: u32,
    pub title: String,
    pub copyright: String,
    pub sample: f32,
}

impl Default for MidiScript {
    fn default() -> Self {
        Self {
            total_seconds: 95.5,
            songs: 1,
            title: String::new(),
            copyright: String::new(),
            sample: -0.5,
        }
    }
}

struct FakeMidi {
    script: MidiScript,
    rate: u32,
    frames: u64,
    looping: bool,
    song: u32,
}

impl FakeMidi {
    fn total_frames(&self) -> u64 {
        (self.script.total_seconds * self.rate as f64) as u64
    }
}

impl MidiEngine for FakeMidi {
    fn set_sample_rate(&mut self, rate: u32) {
        self.rate = rate;
    }
    fn play(&mut self, out: &mut [f32]) -> usize {
        let want = (out.len() / 2) as u64;
        let n = if self.looping {
            want
        } else {
            self.total_frames().saturating_sub(self.frames).min(want)
        };
        out[..n as usize * 2].fill(self.script.sample);
        self.frames += n;
        n as usize
    }
    fn position_seconds(&self) -> f64 {
        self.frames as f64 / self.rate as f64
    }
    fn total_seconds(&self) -> f64 {
        self.script.total_seconds
    }
    fn seek_seconds(&mut self, seconds: f64) {
        self.frames = (seconds * self.rate as f64).round() as u64;
    }
    fn at_end(&self) -> bool {
        !self.looping && self.frames >= self.total_frames()
    }
    fn song_count(&self) -> u32 {
        self.script.songs
    }
    fn select_song(&mut self, index: u32) -> NativeResult<()> {
        if index >= self.script.songs {
            return Err(NativeError::InvalidTrack(index));
        }
        self.song = index;
        self.frames = 0;
        Ok(())
    }
    fn set_tempo(&mut self, _tempo: f64) {}
    fn set_loop_enabled(&mut self, enabled: bool) {
        self.looping = enabled;
    }
    fn title(&self) -> String {
        self.script.title.clone()
    }
    fn copyright(&self) -> String {
        self.script.copyright.clone()
    }
}

// ---------------------------------------------------------------------------
// Library

/// Library whose engines follow the scripts. Families without a script are
/// unavailable.
#[derive(Default, Clone)]
pub struct FakeLibrary {
    pub chip_log: Option<ChipLogScript>,
    pub emulated: Option<EmulatedScript>,
    pub tracker: Option<TrackerScript>,
    pub msx: Option<MsxScript>,
    pub midi: Option<MidiScript>,
    pub calls: CallLog,
}

impl FakeLibrary {
    pub fn all() -> Self {
        Self {
            chip_log: Some(ChipLogScript::default()),
            emulated: Some(EmulatedScript::default()),
            tracker: Some(TrackerScript::default()),
            msx: Some(MsxScript::default()),
            midi: Some(MidiScript::default()),
            calls: CallLog::default(),
        }
    }

    fn record(&self, source: &SourceFile) {
        self.calls.lock().opened.push(source.path.clone());
    }
}

impl NativeLibrary for FakeLibrary {
    fn open_chip_log(
        &self,
        source: &SourceFile,
        sample_rate: u32,
        aux: &AuxFiles,
    ) -> NativeResult<Box<dyn ChipLogEngine>> {
        let script = self.chip_log.clone().ok_or(NativeError::Unavailable)?;
        self.record(source);
        if is_gzip(&source.data) && !script.inflates_gzip {
            return Err(NativeError::Rejected("not a VGM stream".to_string()));
        }
        if let Some(name) = &script.aux_request {
            let data = aux
                .load(name)
                .ok_or_else(|| NativeError::Rejected(format!("missing {name}")))?;
            self.calls.lock().aux_loaded.push((name.clone(), data));
        }
        Ok(Box::new(FakeChipLog {
            script,
            calls: Arc::clone(&self.calls),
            aux: aux.clone(),
            rate: sample_rate,
            pos: 0,
            playing: false,
            loop_forever: false,
            volumes: HashMap::new(),
        }))
    }

    fn open_emulated(
        &self,
        source: &SourceFile,
        sample_rate: u32,
    ) -> NativeResult<Box<dyn EmulatedEngine>> {
        let script = self.emulated.clone().ok_or(NativeError::Unavailable)?;
        self.record(source);
        Ok(Box::new(FakeEmulated {
            script,
            rate: sample_rate,
            track: 0,
            frames: 0,
            limited: true,
            tempo: 1.0,
        }))
    }

    fn open_tracker(
        &self,
        source: &SourceFile,
        sample_rate: u32,
    ) -> NativeResult<Box<dyn TrackerEngine>> {
        let script = self.tracker.clone().ok_or(NativeError::Unavailable)?;
        self.record(source);
        Ok(Box::new(FakeTracker {
            script,
            rate: sample_rate,
            frames: 0,
            subsong: 0,
            repeat: 0,
        }))
    }

    fn open_msx(&self, source: &SourceFile, _sample_rate: u32) -> NativeResult<Box<dyn MsxEngine>> {
        let script = self.msx.clone().ok_or(NativeError::Unavailable)?;
        self.record(source);
        Ok(Box::new(FakeMsx {
            script,
            calls: Arc::clone(&self.calls),
            frames: 0,
        }))
    }

    fn open_midi(&self, source: &SourceFile, sample_rate: u32) -> NativeResult<Box<dyn MidiEngine>> {
        let script = self.midi.clone().ok_or(NativeError::Unavailable)?;
        self.record(source);
        Ok(Box::new(FakeMidi {
            script,
            rate: sample_rate,
            frames: 0,
            looping: false,
            song: 0,
        }))
    }
}

// ---------------------------------------------------------------------------
// File builders

/// Minimal VGM 1.71 file of `seconds` length, optionally with a GD3 block.
pub fn vgm_bytes(seconds: u32, gd3: Option<&[&str]>) -> Vec<u8> {
    let mut data = vec![0u8; 0x100];
    data[..4].copy_from_slice(b"Vgm ");
    data[0x08..0x0C].copy_from_slice(&0x171u32.to_le_bytes());
    data[0x18..0x1C].copy_from_slice(&(seconds * 44_100).to_le_bytes());
    data[0x34..0x38].copy_from_slice(&(0x100u32 - 0x34).to_le_bytes());
    data.push(0x66); // end of sound data

    if let Some(fields) = gd3 {
        let gd3_offset = data.len() as u32;
        data[0x14..0x18].copy_from_slice(&(gd3_offset - 0x14).to_le_bytes());
        let mut table = Vec::new();
        for field in fields {
            for unit in field.encode_utf16() {
                table.extend_from_slice(&unit.to_le_bytes());
            }
            table.extend_from_slice(&[0, 0]);
        }
        data.extend_from_slice(b"Gd3 ");
        data.extend_from_slice(&0x100u32.to_le_bytes());
        data.extend_from_slice(&(table.len() as u32).to_le_bytes());
        data.extend_from_slice(&table);
    }

    let eof = data.len() as u32 - 4;
    data[0x04..0x08].copy_from_slice(&eof.to_le_bytes());
    data
}

/// KSSX header declaring songs `first..=last`.
pub fn kssx_bytes(first: u16, last: u16) -> Vec<u8> {
    let mut data = vec![0u8; 0x40];
    data[..4].copy_from_slice(b"KSSX");
    data[0x0E] = 0x10;
    data[0x18..0x1A].copy_from_slice(&first.to_le_bytes());
    data[0x1A..0x1C].copy_from_slice(&last.to_le_bytes());
    data
}

/// Write `data` to `dir/name` and return the path.
pub fn write_fixture(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, data).expect("write fixture");
    path
}
