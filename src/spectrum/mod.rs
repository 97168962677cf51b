//! Real-time spectrum tap.
//!
//! The render path pushes the mono mix of every frame into a fixed-size ring;
//! a UI thread snapshots the ring and turns it into a magnitude spectrum.
//! Neither side takes a lock. Samples are stored as `f32` bit patterns in
//! atomics, so a reader running concurrently with a writer may see a window
//! that is a few samples stale, which is fine for display.

pub mod fft;

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use thiserror::Error;

use crate::backend::StereoFrame;

pub use fft::{magnitude_spectrum, SPECTRUM_PEAK};

/// Default number of samples kept for analysis.
pub const DEFAULT_SPECTRUM_SIZE: usize = 1024;

/// Invalid tap configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpectrumError {
    /// Size is zero or not a power of two.
    #[error("spectrum size must be a non-zero power of two, got {0}")]
    InvalidSize(usize),
}

/// Lock-free ring of the most recent mono samples.
#[derive(Debug)]
pub struct SpectrumTap {
    slots: Box<[AtomicU32]>,
    /// Total writes; the slot index is `cursor & mask`.
    cursor: AtomicUsize,
    mask: usize,
}

impl SpectrumTap {
    /// Tap holding `size` samples.
    pub fn new(size: usize) -> Result<Self, SpectrumError> {
        if size == 0 || !size.is_power_of_two() {
            return Err(SpectrumError::InvalidSize(size));
        }
        Ok(Self::with_size(size))
    }

    fn with_size(size: usize) -> Self {
        Self {
            slots: (0..size).map(|_| AtomicU32::new(0f32.to_bits())).collect(),
            cursor: AtomicUsize::new(0),
            mask: size - 1,
        }
    }

    /// Number of samples kept.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slot the next sample goes to (also the oldest sample).
    pub fn write_index(&self) -> usize {
        self.cursor.load(Ordering::Acquire) & self.mask
    }

    /// Append one mono sample, overwriting the oldest.
    #[inline]
    pub fn push(&self, sample: f32) {
        let index = self.cursor.fetch_add(1, Ordering::AcqRel) & self.mask;
        self.slots[index].store(sample.to_bits(), Ordering::Relaxed);
    }

    /// Append the mono mix of `frame`.
    #[inline]
    pub fn push_frame(&self, frame: StereoFrame) {
        self.push(frame.mono_mix());
    }

    /// Append the mono mix of every frame.
    pub fn push_frames(&self, frames: &[StereoFrame]) {
        for frame in frames {
            self.push_frame(*frame);
        }
    }

    /// Copy of the ring, oldest sample first.
    pub fn snapshot(&self) -> Vec<f32> {
        let start = self.write_index();
        (0..self.slots.len())
            .map(|i| f32::from_bits(self.slots[(start + i) & self.mask].load(Ordering::Relaxed)))
            .collect()
    }

    /// Magnitude spectrum of the current window (`capacity / 2` bins, 0..=255).
    pub fn spectrum(&self) -> Vec<f32> {
        magnitude_spectrum(&self.snapshot())
    }

    /// Zero every slot and rewind the cursor.
    pub fn clear(&self) {
        for slot in self.slots.iter() {
            slot.store(0f32.to_bits(), Ordering::Relaxed);
        }
        self.cursor.store(0, Ordering::Release);
    }
}

impl Default for SpectrumTap {
    fn default() -> Self {
        Self::with_size(DEFAULT_SPECTRUM_SIZE)
    }
}
