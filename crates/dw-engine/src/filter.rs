//! Master lowpass with cutoff wobble.
//!
//! The whole melodic bus runs through one one-pole lowpass. A slow
//! sine LFO drifts the cutoff a few hundred Hz around its target so
//! the top end breathes; cutoff retargets glide over half a second.

use std::f32::consts::TAU;

use dw_ir::DEFAULT_CUTOFF_HZ;

use crate::smooth::SmoothedParam;

/// Wobble rate and depth.
const LFO_HZ: f32 = 0.15;
const LFO_DEPTH_HZ: f32 = 400.0;
/// Seconds for a cutoff retarget to settle.
const RETARGET_SECS: f32 = 0.5;
/// The LFO may push the cutoff low, but never below this.
const MIN_CUTOFF_HZ: f32 = 50.0;

/// One-pole lowpass whose cutoff is the sum of a smoothed target and
/// a slow sine wobble.
#[derive(Clone, Debug)]
pub struct MasterFilter {
    cutoff: SmoothedParam,
    lfo_phase: f32,
    lfo_inc: f32,
    state: f32,
    sample_rate: u32,
}

impl MasterFilter {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            cutoff: SmoothedParam::new(DEFAULT_CUTOFF_HZ, RETARGET_SECS, sample_rate),
            lfo_phase: 0.0,
            lfo_inc: LFO_HZ / sample_rate as f32,
            state: 0.0,
            sample_rate,
        }
    }

    /// Glide the cutoff toward a new target.
    pub fn set_cutoff(&mut self, hz: f32) {
        if hz.is_finite() && hz > 0.0 {
            self.cutoff.set_target(hz);
        }
    }

    pub fn cutoff_target(&self) -> f32 {
        self.cutoff.target()
    }

    /// Filter one sample.
    pub fn process(&mut self, x: f32) -> f32 {
        let base = self.cutoff.advance();
        let wobble = (TAU * self.lfo_phase).sin() * LFO_DEPTH_HZ;
        self.lfo_phase = (self.lfo_phase + self.lfo_inc).fract();

        let fc = (base + wobble).max(MIN_CUTOFF_HZ);
        let alpha = (TAU * fc / self.sample_rate as f32).clamp(0.0, 1.0);
        self.state += alpha * (x - self.state);
        self.state
    }
}
