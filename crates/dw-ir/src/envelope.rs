//! Breakpoint amplitude envelopes.
//!
//! Every instrument voice is a tone generator shaped by one of these:
//! a short list of `(dt, value)` breakpoints with a curve per segment.
//! `Linear` matches a linear gain ramp, `ExpRatio` the multiplicative
//! ramp used for percussive decays.

use arrayvec::ArrayVec;

/// Breakpoints per envelope. Instrument envelopes are tiny; the
/// largest (bass) uses three points.
pub const MAX_BREAKPOINTS: usize = 8;

/// How a segment travels from its start value to the next point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Curve {
    /// Stay at the start value for the whole segment.
    #[default]
    Hold,
    Linear,
    /// Multiplicative sweep `from * (to/from)^t`. Both endpoints are
    /// floored at a small positive value to keep the ratio defined.
    ExpRatio,
}

/// One envelope point: `dt` seconds after the previous point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Breakpoint {
    pub dt: f32,
    pub value: f32,
    pub curve: Curve,
}

impl Breakpoint {
    pub const fn new(dt: f32, value: f32, curve: Curve) -> Self {
        Self { dt, value, curve }
    }
}

/// A one-shot amplitude contour. The first point's `dt` is ignored
/// (a voice starts at its first value); the voice ends when the last
/// point is reached.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Envelope {
    pub points: ArrayVec<Breakpoint, MAX_BREAKPOINTS>,
}

impl Envelope {
    pub fn from_points(points: &[Breakpoint]) -> Self {
        let mut env = Self::default();
        for p in points.iter().take(MAX_BREAKPOINTS) {
            env.points.push(*p);
        }
        env
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total seconds from the first point to the last.
    pub fn duration(&self) -> f32 {
        self.points.iter().skip(1).map(|p| p.dt).sum()
    }

    /// Value at the final point, or zero for an empty envelope.
    pub fn final_value(&self) -> f32 {
        self.points.last().map_or(0.0, |p| p.value)
    }
}

/// Evaluate a segment at normalized position `t` in `[0, 1]`.
pub fn interpolate(curve: Curve, from: f32, to: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    match curve {
        Curve::Hold => from,
        Curve::Linear => from + (to - from) * t,
        Curve::ExpRatio => {
            let from = from.max(1e-6);
            let to = to.max(1e-6);
            from * libm::powf(to / from, t)
        }
    }
}
