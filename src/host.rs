//! Host-facing handle.
//!
//! [`DeckHandle`] is what a UI or audio thread holds. Every call has a total
//! result: errors, a closed engine, and negative or out-of-range arguments
//! all produce the neutral value (`false`, 0, empty string) instead of an
//! error. Transport calls serialize on one engine lock; [`get_spectrum`]
//! reads the tap directly so a UI thread never waits for the render thread.
//!
//! [`get_spectrum`]: DeckHandle::get_spectrum

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::Engine;
use crate::native::{NativeLibrary, UNITY_VOLUME};
use crate::spectrum::SpectrumTap;

/// Cloneable, thread-safe handle to one [`Engine`].
#[derive(Clone)]
pub struct DeckHandle {
    engine: Arc<Mutex<Engine>>,
    tap: Arc<SpectrumTap>,
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl DeckHandle {
    /// Handle around a fresh engine.
    pub fn new(library: Arc<dyn NativeLibrary>) -> Self {
        Self::from_engine(Engine::new(library))
    }

    /// Handle around an existing engine.
    pub fn from_engine(engine: Engine) -> Self {
        let tap = engine.tap();
        Self {
            engine: Arc::new(Mutex::new(engine)),
            tap,
        }
    }

    /// Run `f` with the engine locked.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        f(&mut *self.engine.lock())
    }

    /// Set the output rate. Non-positive values are ignored.
    pub fn set_sample_rate(&self, rate: i32) {
        if let Ok(rate) = u32::try_from(rate) {
            self.engine.lock().set_sample_rate(rate);
        }
    }

    /// Set the ROM search path; an empty string clears it.
    pub fn set_rom_path(&self, path: &str) {
        let path = (!path.is_empty()).then(|| PathBuf::from(path));
        self.engine.lock().set_rom_path(path);
    }

    /// Open `path`. Returns `false` on any failure; the engine is then closed.
    pub fn open(&self, path: &str) -> bool {
        self.engine.lock().open(path).is_ok()
    }

    /// Close the open file.
    pub fn close(&self) {
        self.engine.lock().close();
    }

    /// Start playback.
    pub fn play(&self) {
        self.engine.lock().play();
    }

    /// Stop playback.
    pub fn stop(&self) {
        self.engine.lock().stop();
    }

    /// Whether the song ended.
    pub fn is_ended(&self) -> bool {
        self.engine.lock().is_ended()
    }

    /// Track length in samples.
    pub fn get_total_samples(&self) -> i64 {
        to_i64(self.engine.lock().total_samples())
    }

    /// Playback position in samples.
    pub fn get_current_sample(&self) -> i64 {
        to_i64(self.engine.lock().current_sample())
    }

    /// Seek to `sample`. Negative positions are ignored.
    pub fn seek(&self, sample: i64) {
        if let Ok(sample) = u64::try_from(sample) {
            self.engine.lock().seek(sample);
        }
    }

    /// Render up to `frames` interleaved stereo frames into `buffer`.
    ///
    /// The request is clamped to what `buffer` can hold. Returns frames written.
    pub fn fill_buffer(&self, buffer: &mut [i16], frames: i32) -> i32 {
        let Ok(frames) = usize::try_from(frames) else {
            return 0;
        };
        let samples = frames.saturating_mul(2).min(buffer.len() & !1);
        let written = self.engine.lock().fill_buffer(&mut buffer[..samples]);
        i32::try_from(written).unwrap_or(i32::MAX)
    }

    /// Magnitude spectrum (`capacity / 2` bins, 0..=255). Never takes the engine lock.
    pub fn get_spectrum(&self) -> Vec<f32> {
        self.tap.spectrum()
    }

    /// Tags as `KEY|||VALUE|||` for all eleven keys.
    pub fn get_tags(&self) -> String {
        self.engine.lock().tags().to_delimited()
    }

    /// Length of `path` in samples without touching the open file (0 on error).
    pub fn get_track_length_direct(&self, path: &str) -> i64 {
        match self.engine.lock().track_length_direct(path) {
            Ok(length) => to_i64(length),
            Err(e) => {
                log::debug!("length probe of {path} failed: {e}");
                0
            }
        }
    }

    /// Length of track `track` of `path` in samples (0 on error).
    pub fn get_track_length(&self, path: &str, track: i32) -> i64 {
        let Ok(track) = u32::try_from(track) else {
            return 0;
        };
        match self.engine.lock().track_length(path, track) {
            Ok(length) => to_i64(length),
            Err(e) => {
                log::debug!("length probe of {path} track {track} failed: {e}");
                0
            }
        }
    }

    /// Number of tracks in the open file.
    pub fn get_track_count(&self) -> i32 {
        to_i32(self.engine.lock().track_count())
    }

    /// Switch tracks. Returns `false` and keeps the current track on failure.
    pub fn set_track(&self, track: i32) -> bool {
        let Ok(track) = u32::try_from(track) else {
            return false;
        };
        self.engine.lock().set_track(track).is_ok()
    }

    /// 0-based current track.
    pub fn get_current_track(&self) -> i32 {
        to_i32(self.engine.lock().current_track())
    }

    /// Whether `path` holds more than one track.
    pub fn is_multi_track(&self, path: &str) -> bool {
        self.engine.lock().is_multi_track(path)
    }

    /// Number of songs in an MSX file (0 on error).
    pub fn get_kss_track_count_direct(&self, path: &str) -> i32 {
        self.engine
            .lock()
            .kss_track_count_direct(path)
            .map_or(0, to_i32)
    }

    /// First and last native song numbers of an MSX file (`(0, 0)` on error).
    pub fn get_kss_track_range(&self, path: &str) -> (i32, i32) {
        self.engine
            .lock()
            .kss_track_range(path)
            .map_or((0, 0), |range| (i32::from(range.first), i32::from(range.last)))
    }

    /// Turn endless loop on or off.
    pub fn set_endless_loop(&self, endless: bool) {
        self.engine.lock().set_endless_loop(endless);
    }

    /// Whether endless loop is on.
    pub fn get_endless_loop(&self) -> bool {
        self.engine.lock().endless_loop()
    }

    /// Set the playback speed multiplier.
    pub fn set_playback_speed(&self, speed: f64) {
        self.engine.lock().set_speed(speed);
    }

    /// Playback speed multiplier.
    pub fn get_playback_speed(&self) -> f64 {
        self.engine.lock().playback_speed()
    }

    /// Number of distinct sound chips in the open file.
    pub fn get_device_count(&self) -> i32 {
        i32::try_from(self.engine.lock().device_count()).unwrap_or(i32::MAX)
    }

    /// Name of the device with `id` (empty if unknown).
    pub fn get_device_name(&self, id: i32) -> String {
        let Ok(id) = u32::try_from(id) else {
            return String::new();
        };
        self.engine.lock().device_name(id).unwrap_or_default()
    }

    /// Volume of the device with `id`; unity (`0x100`) if unknown or closed.
    pub fn get_device_volume(&self, id: i32) -> i32 {
        let unity = i32::from(UNITY_VOLUME);
        let Ok(id) = u32::try_from(id) else {
            return unity;
        };
        self.engine
            .lock()
            .device_volume(id)
            .map_or(unity, i32::from)
    }

    /// Set the volume of the device with `id`. Values outside `0..=0xFFFF` are ignored.
    pub fn set_device_volume(&self, id: i32, volume: i32) {
        let (Ok(id), Ok(volume)) = (u32::try_from(id), u16::try_from(volume)) else {
            return;
        };
        self.engine.lock().set_device_volume(id, volume);
    }
}
