//! Instrument voices.
//!
//! A voice is a tone generator shaped by an envelope and routed to
//! one mix bus. Voices are fire-and-forget: spawned by an event,
//! reaped by the pool once the envelope ends.

use std::f32::consts::TAU;

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg32;

use dw_ir::Envelope;

use crate::envelope_state::EnvelopeState;

/// Where a voice's output lands in the mix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bus {
    /// Through the master lowpass, then the analysis tap.
    Filter,
    /// Straight to the master sum, bypassing filter and tap.
    Direct,
}

/// One-pole highpass, used to thin noise into a snare body.
#[derive(Clone, Copy, Debug)]
pub struct OnePoleHighPass {
    alpha: f32,
    lp: f32,
}

impl OnePoleHighPass {
    pub fn new(cutoff_hz: f32, sample_rate: u32) -> Self {
        Self {
            alpha: (TAU * cutoff_hz / sample_rate as f32).clamp(0.0, 1.0),
            lp: 0.0,
        }
    }

    pub fn process(&mut self, x: f32) -> f32 {
        self.lp += self.alpha * (x - self.lp);
        x - self.lp
    }
}

/// Per-sample tone generator. Phase runs in cycles, `0..1`.
#[derive(Clone, Debug)]
pub enum Tone {
    Sine { phase: f32, inc: f32 },
    Triangle { phase: f32, inc: f32 },
    Square { phase: f32, inc: f32 },
    /// Sine whose frequency decays by a fixed ratio each sample.
    SineSweep { phase: f32, inc: f32, ratio: f32 },
    Noise { rng: Pcg32, highpass: Option<OnePoleHighPass> },
}

impl Tone {
    pub fn sine(freq: f32, sample_rate: u32) -> Self {
        Tone::Sine {
            phase: 0.0,
            inc: freq / sample_rate as f32,
        }
    }

    pub fn triangle(freq: f32, sample_rate: u32) -> Self {
        Tone::Triangle {
            phase: 0.0,
            inc: freq / sample_rate as f32,
        }
    }

    pub fn square(freq: f32, sample_rate: u32) -> Self {
        Tone::Square {
            phase: 0.0,
            inc: freq / sample_rate as f32,
        }
    }

    /// Exponential glide from `from_hz` to `to_hz` over `secs`.
    pub fn sweep(from_hz: f32, to_hz: f32, secs: f32, sample_rate: u32) -> Self {
        let samples = (secs.max(1e-3) * sample_rate as f32).max(1.0);
        let from = from_hz.max(1e-3);
        let to = to_hz.max(1e-3);
        Tone::SineSweep {
            phase: 0.0,
            inc: from / sample_rate as f32,
            ratio: (to / from).powf(1.0 / samples),
        }
    }

    pub fn noise(seed: u64, highpass_hz: Option<f32>, sample_rate: u32) -> Self {
        Tone::Noise {
            rng: Pcg32::seed_from_u64(seed),
            highpass: highpass_hz.map(|hz| OnePoleHighPass::new(hz, sample_rate)),
        }
    }

    /// Next raw sample in -1..1.
    pub fn next(&mut self) -> f32 {
        match self {
            Tone::Sine { phase, inc } => {
                let s = (TAU * *phase).sin();
                *phase = (*phase + *inc).fract();
                s
            }
            Tone::Triangle { phase, inc } => {
                let s = 4.0 * (*phase - 0.5).abs() - 1.0;
                *phase = (*phase + *inc).fract();
                s
            }
            Tone::Square { phase, inc } => {
                let s = if *phase < 0.5 { 1.0 } else { -1.0 };
                *phase = (*phase + *inc).fract();
                s
            }
            Tone::SineSweep { phase, inc, ratio } => {
                let s = (TAU * *phase).sin();
                *phase = (*phase + *inc).fract();
                *inc *= *ratio;
                s
            }
            Tone::Noise { rng, highpass } => {
                let white = rng.gen::<f32>() * 2.0 - 1.0;
                match highpass {
                    Some(hp) => hp.process(white),
                    None => white,
                }
            }
        }
    }
}

/// A sounding instrument voice.
#[derive(Clone, Debug)]
pub struct Voice {
    pub tone: Tone,
    pub env: EnvelopeState,
    /// Post-envelope amplitude scale.
    pub gain: f32,
    pub bus: Bus,
    /// Samples of silence before the envelope starts (chord strum).
    pub delay: u64,
    /// Spawn order, used by the pool's steal policy.
    pub(crate) age: u64,
}

impl Voice {
    pub fn new(tone: Tone, envelope: Envelope, gain: f32, bus: Bus, sample_rate: u32) -> Self {
        Self {
            tone,
            env: EnvelopeState::new(envelope, sample_rate),
            gain,
            bus,
            delay: 0,
            age: 0,
        }
    }

    pub fn with_delay(mut self, samples: u64) -> Self {
        self.delay = samples;
        self
    }

    pub fn is_finished(&self) -> bool {
        self.delay == 0 && self.env.is_finished()
    }

    /// Render one sample.
    pub fn render(&mut self) -> f32 {
        if self.delay > 0 {
            self.delay -= 1;
            return 0.0;
        }
        if self.env.is_finished() {
            return 0.0;
        }
        let amp = self.env.advance();
        self.tone.next() * amp * self.gain
    }
}

/// Derive a fresh noise seed from any `RngCore`.
pub(crate) fn noise_seed<R: RngCore>(rng: &mut R) -> u64 {
    rng.next_u64()
}
