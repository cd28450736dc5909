//! Announcement clip playback.
//!
//! Intro clips arrive as mono PCM at their own rate (24 kHz from the
//! provider) and are linearly resampled to the stream rate on the
//! fly. The voice bypasses the master lowpass but feeds the analysis
//! tap, so speech stays clear and still moves the visualizer.

use dw_ir::IntroClip;

/// A playing announcement. One at a time; a new clip replaces it.
#[derive(Clone, Debug)]
pub struct IntroVoice {
    samples: Vec<f32>,
    pos: f64,
    step: f64,
}

impl IntroVoice {
    pub fn new(clip: IntroClip, output_rate: u32) -> Self {
        let step = if output_rate == 0 {
            1.0
        } else {
            clip.sample_rate as f64 / output_rate as f64
        };
        Self {
            samples: clip.samples,
            pos: 0.0,
            step,
        }
    }

    pub fn is_finished(&self) -> bool {
        let last = self.samples.len().saturating_sub(1);
        self.pos >= last as f64
    }

    /// Next resampled sample; zero once the clip has ended.
    pub fn next(&mut self) -> f32 {
        let i = self.pos as usize;
        if i + 1 >= self.samples.len() {
            return 0.0;
        }
        let frac = (self.pos - i as f64) as f32;
        let sample = self.samples[i] * (1.0 - frac) + self.samples[i + 1] * frac;
        self.pos += self.step;
        sample
    }
}
