//! Runtime evaluator for `Envelope`.
//!
//! Runs at sample rate, so segment shapes are precomputed on entry:
//! a linear segment becomes one add per sample, an exponential one
//! becomes one multiply. The expensive `powf` happens only when a
//! segment boundary is crossed.

use dw_ir::{Curve, Envelope};

/// How the value evolves within the current segment.
#[derive(Clone, Copy, Debug)]
enum SegmentStep {
    Hold,
    Add(f32),
    Mul(f32),
}

/// Runtime state for a playing one-shot envelope.
#[derive(Clone, Debug)]
pub struct EnvelopeState {
    envelope: Envelope,
    sample_rate: u32,
    /// Index of the "from" breakpoint.
    segment: usize,
    /// Samples left before the next breakpoint.
    remaining: u64,
    step: SegmentStep,
    value: f32,
    finished: bool,
}

impl EnvelopeState {
    pub fn new(envelope: Envelope, sample_rate: u32) -> Self {
        let value = envelope.points.first().map_or(0.0, |p| p.value);
        let mut state = Self {
            envelope,
            sample_rate,
            segment: 0,
            remaining: 0,
            step: SegmentStep::Hold,
            value,
            finished: false,
        };
        state.enter_segment(0);
        state
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advance one sample and return the new value.
    pub fn advance(&mut self) -> f32 {
        if self.finished {
            return self.value;
        }
        while self.remaining == 0 {
            self.enter_segment(self.segment + 1);
            if self.finished {
                return self.value;
            }
        }
        self.remaining -= 1;
        match self.step {
            SegmentStep::Hold => {}
            SegmentStep::Add(delta) => self.value += delta,
            SegmentStep::Mul(ratio) => self.value *= ratio,
        }
        if self.remaining == 0 {
            // Land exactly on the breakpoint, absorbing rounding drift.
            self.value = self.envelope.points[self.segment + 1].value;
        }
        self.value
    }

    /// Begin the segment starting at breakpoint `index`.
    fn enter_segment(&mut self, index: usize) {
        self.segment = index;
        let next = index + 1;
        if next >= self.envelope.len() {
            self.finished = true;
            self.value = self.envelope.final_value();
            return;
        }

        let from = self.envelope.points[index];
        let to = self.envelope.points[next];
        self.value = from.value;
        let samples = (to.dt.max(0.0) as f64 * self.sample_rate as f64) as u64;
        self.remaining = samples;
        if samples == 0 {
            // Degenerate segment; the advance loop walks past it.
            self.step = SegmentStep::Hold;
            return;
        }
        self.step = match from.curve {
            Curve::Hold => SegmentStep::Hold,
            Curve::Linear => SegmentStep::Add((to.value - from.value) / samples as f32),
            Curve::ExpRatio => {
                let from_v = from.value.max(1e-6);
                let to_v = to.value.max(1e-6);
                self.value = from_v;
                SegmentStep::Mul((to_v / from_v).powf(1.0 / samples as f32))
            }
        };
    }
}
