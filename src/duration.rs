//! Track length policy.
//!
//! Backends report what they know about a track's length as a [`LengthHint`];
//! [`estimate_samples`] turns it into a sample count. Open sessions and probes
//! go through the same function so both always agree.

/// Length used when nothing better is known.
pub const DEFAULT_TRACK_SECONDS: u64 = 180;

/// Estimates shorter than this are treated as unknown.
pub const MIN_PLAUSIBLE_SECONDS: u64 = 30;

/// What a backend knows about a track's length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthHint {
    /// Authoritative length in samples at the output rate.
    Exact(u64),
    /// Timing metadata in milliseconds; any field may be unknown.
    Estimated {
        /// Part played once before the loop.
        intro_ms: Option<u64>,
        /// Looped part.
        loop_ms: Option<u64>,
        /// Overall length as declared by the file.
        length_ms: Option<u64>,
    },
    /// The track loops forever or its length cannot be known.
    Endless,
}

impl LengthHint {
    /// Hint built from signed native values, where non-positive means unknown.
    pub fn from_native_ms(intro_ms: i64, loop_ms: i64, length_ms: i64) -> Self {
        let known = |ms: i64| u64::try_from(ms).ok().filter(|&ms| ms > 0);
        LengthHint::Estimated {
            intro_ms: known(intro_ms),
            loop_ms: known(loop_ms),
            length_ms: known(length_ms),
        }
    }
}

/// Length in samples at `sample_rate` for `hint`.
///
/// Intro plus two loop passes when both are known, else the declared length.
/// Anything under [`MIN_PLAUSIBLE_SECONDS`] becomes [`DEFAULT_TRACK_SECONDS`].
pub fn estimate_samples(hint: LengthHint, sample_rate: u32) -> u64 {
    match hint {
        LengthHint::Exact(samples) => samples,
        LengthHint::Endless => seconds_to_samples(DEFAULT_TRACK_SECONDS, sample_rate),
        LengthHint::Estimated {
            intro_ms,
            loop_ms,
            length_ms,
        } => {
            let ms = match (intro_ms, loop_ms) {
                (Some(intro), Some(looped)) if intro > 0 && looped > 0 => {
                    intro.saturating_add(looped.saturating_mul(2))
                }
                _ => length_ms.unwrap_or(0),
            };
            if ms < MIN_PLAUSIBLE_SECONDS * 1000 {
                seconds_to_samples(DEFAULT_TRACK_SECONDS, sample_rate)
            } else {
                ms_to_samples(ms, sample_rate)
            }
        }
    }
}

/// `value × mul / div` computed in 128 bits, saturating at `u64::MAX`.
///
/// A zero divisor gives 0.
pub fn rescale(value: u64, mul: u64, div: u64) -> u64 {
    if div == 0 {
        return 0;
    }
    let wide = value as u128 * mul as u128 / div as u128;
    u64::try_from(wide).unwrap_or(u64::MAX)
}

/// `ms × rate / 1000`.
pub fn ms_to_samples(ms: u64, sample_rate: u32) -> u64 {
    rescale(ms, sample_rate as u64, 1000)
}

/// `samples × 1000 / rate` (0 for a zero rate).
pub fn samples_to_ms(samples: u64, sample_rate: u32) -> u64 {
    rescale(samples, 1000, sample_rate as u64)
}

/// `seconds × rate`.
pub fn seconds_to_samples(seconds: u64, sample_rate: u32) -> u64 {
    seconds.saturating_mul(sample_rate as u64)
}

/// Fractional seconds to the nearest sample; negative or non-finite input gives 0.
pub fn secs_f64_to_samples(seconds: f64, sample_rate: u32) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * sample_rate as f64).round() as u64
}

/// Samples to fractional seconds (0.0 for a zero rate).
pub fn samples_to_secs_f64(samples: u64, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    samples as f64 / sample_rate as f64
}
