//! Spectrum analysis for the visualizer feed.
//!
//! Mirrors the byte contract front ends expect: a 256-point FFT over
//! the most recent tap samples, Hann-windowed, magnitudes smoothed
//! across calls, then mapped from [-100, -30] dB onto 0..255. One
//! byte per bin, 128 bins.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// FFT length in samples.
pub const FFT_SIZE: usize = 256;
/// Bytes per snapshot: one per positive-frequency bin.
pub const BIN_COUNT: usize = FFT_SIZE / 2;

/// Per-bin magnitude carry-over between snapshots.
const SMOOTHING: f32 = 0.8;
const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;

/// Rolling FFT over the analysis tap.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: [f32; FFT_SIZE],
    history: [f32; FFT_SIZE],
    write: usize,
    smoothed: [f32; BIN_COUNT],
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let window = core::array::from_fn(|i| {
            let t = i as f32 / (FFT_SIZE - 1) as f32;
            0.5 * (1.0 - (std::f32::consts::TAU * t).cos())
        });
        Self {
            fft: planner.plan_fft_forward(FFT_SIZE),
            window,
            history: [0.0; FFT_SIZE],
            write: 0,
            smoothed: [0.0; BIN_COUNT],
            scratch: vec![Complex::new(0.0, 0.0); FFT_SIZE],
        }
    }

    /// Feed tap samples; only the most recent `FFT_SIZE` are kept.
    pub fn push(&mut self, samples: &[f32]) {
        for &s in samples {
            self.history[self.write] = s;
            self.write = (self.write + 1) % FFT_SIZE;
        }
    }

    /// Compute the current byte spectrum.
    pub fn snapshot(&mut self) -> Vec<u8> {
        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let sample = self.history[(self.write + i) % FFT_SIZE];
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let mut out = Vec::with_capacity(BIN_COUNT);
        for (k, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.scratch[k].norm() / FFT_SIZE as f32;
            *smoothed = SMOOTHING * *smoothed + (1.0 - SMOOTHING) * magnitude;
            let db = 20.0 * smoothed.log10();
            let scaled = (db - MIN_DB) / (MAX_DB - MIN_DB) * 255.0;
            out.push(scaled.clamp(0.0, 255.0) as u8);
        }
        out
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
