//! Windowed magnitude spectrum.
//!
//! Iterative radix-2 Cooley-Tukey FFT on `Complex32`, preceded by a Hann
//! window. Input lengths must be powers of two.

use num_complex::Complex32;
use std::f32::consts::PI;

/// Largest value of a normalized spectrum.
pub const SPECTRUM_PEAK: f32 = 255.0;

/// Hann window coefficients for `n` points: `0.5 * (1 - cos(2πi / (n - 1)))`.
pub fn hann_window(n: usize) -> Vec<f32> {
    if n < 2 {
        return vec![1.0; n];
    }
    let denom = (n - 1) as f32;
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / denom).cos()))
        .collect()
}

/// In-place forward FFT. `data.len()` must be a power of two.
pub fn fft_in_place(data: &mut [Complex32]) {
    let n = data.len();
    if n < 2 {
        return;
    }
    debug_assert!(n.is_power_of_two());

    // bit-reversal permutation
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            data.swap(i, j);
        }
    }

    let mut len = 2;
    while len <= n {
        let angle = 2.0 * PI / len as f32;
        let wlen = Complex32::new(angle.cos(), angle.sin());
        let half = len / 2;
        for start in (0..n).step_by(len) {
            let mut w = Complex32::new(1.0, 0.0);
            for k in 0..half {
                let u = data[start + k];
                let v = data[start + k + half] * w;
                data[start + k] = u + v;
                data[start + k + half] = u - v;
                w *= wlen;
            }
        }
        len <<= 1;
    }
}

/// Hann-windowed magnitudes of `samples` for bins `0..len/2`, scaled so the
/// largest bin is [`SPECTRUM_PEAK`]. Silence stays all zero.
pub fn magnitude_spectrum(samples: &[f32]) -> Vec<f32> {
    let n = samples.len();
    let window = hann_window(n);
    let mut data: Vec<Complex32> = samples
        .iter()
        .zip(&window)
        .map(|(&s, &w)| Complex32::new(s * w, 0.0))
        .collect();
    fft_in_place(&mut data);

    let mut magnitudes: Vec<f32> = data[..n / 2].iter().map(|c| c.norm()).collect();
    let max = magnitudes.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 && max.is_finite() {
        let scale = SPECTRUM_PEAK / max;
        for m in &mut magnitudes {
            *m *= scale;
        }
    }
    magnitudes
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn peak_bin(spectrum: &[f32]) -> usize {
        spectrum
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, &m)| if m > best.1 { (i, m) } else { best })
            .0
    }

    #[test]
    fn hann_window_shape() {
        let w = hann_window(9);
        assert_relative_eq!(w[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(w[4], 1.0, epsilon = 1e-6);
        assert_relative_eq!(w[8], 0.0, epsilon = 1e-6);
        assert_relative_eq!(w[2], w[6], epsilon = 1e-6);
        assert_eq!(hann_window(1), vec![1.0]);
    }

    #[test]
    fn impulse_has_flat_spectrum() {
        let mut data = vec![Complex32::new(0.0, 0.0); 8];
        data[0] = Complex32::new(1.0, 0.0);
        fft_in_place(&mut data);
        for bin in data {
            assert_relative_eq!(bin.norm(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn constant_input_lands_in_dc_bin() {
        let mut data = vec![Complex32::new(1.0, 0.0); 16];
        fft_in_place(&mut data);
        assert_relative_eq!(data[0].re, 16.0, epsilon = 1e-4);
        for bin in &data[1..] {
            assert!(bin.norm() < 1e-4);
        }
    }

    #[test]
    fn bin_aligned_sine_peaks_at_its_bin() {
        let n = 1024;
        for k in [5usize, 37, 200, 511] {
            let samples: Vec<f32> = (0..n)
                .map(|i| (2.0 * PI * k as f32 * i as f32 / n as f32).sin() * 0.5)
                .collect();
            let spectrum = magnitude_spectrum(&samples);
            assert_eq!(spectrum.len(), n / 2);
            let peak = peak_bin(&spectrum);
            assert!(peak.abs_diff(k) <= 1, "k={k} peak={peak}");
            assert_relative_eq!(spectrum[peak], SPECTRUM_PEAK, epsilon = 1e-3);
        }
    }

    #[test]
    fn silence_stays_zero() {
        let spectrum = magnitude_spectrum(&[0.0; 256]);
        assert_eq!(spectrum.len(), 128);
        assert!(spectrum.iter().all(|&m| m == 0.0));
    }
}
