//! Exponential parameter smoothing.
//!
//! Gain and cutoff changes never jump: they glide toward the target
//! with a one-pole approach, so a level change settles (within 5%)
//! over its stated window instead of clicking.

/// A control value that approaches its target exponentially.
#[derive(Clone, Copy, Debug)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coeff: f32,
}

impl SmoothedParam {
    /// `settle_secs` is the time to come within ~5% of a new target.
    pub fn new(initial: f32, settle_secs: f32, sample_rate: u32) -> Self {
        // Three time constants cover ~95% of the approach.
        let samples = (settle_secs.max(1e-3) * sample_rate as f32) / 3.0;
        Self {
            current: initial,
            target: initial,
            coeff: 1.0 - (-1.0 / samples).exp(),
        }
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump immediately, bypassing the glide.
    pub fn snap_to(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    /// Advance one sample and return the new value.
    pub fn advance(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    pub fn value(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }
}
