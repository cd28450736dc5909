//! Background textures: vinyl surface noise and the ambient beds.
//!
//! Everything here is generated, not sampled, so the stream never
//! needs an asset and never exposes a loop seam. The four ambient
//! layers are always running; their gains start at zero and glide
//! when the listener mixes them in.

use std::f32::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use dw_ir::AmbientLayer;

use crate::smooth::SmoothedParam;

/// Seconds of precomputed crackle before the loop repeats.
const VINYL_LOOP_SECS: f32 = 2.0;
/// Output trim on the crackle bed.
const VINYL_GAIN: f32 = 0.05;
/// Seconds for an ambient level change to settle.
const AMBIENT_SETTLE_SECS: f32 = 0.2;

/// Looped record-surface noise: a faint hiss with sparse pops.
#[derive(Clone, Debug)]
pub struct VinylSource {
    buffer: Vec<f32>,
    pos: usize,
}

impl VinylSource {
    pub fn new(sample_rate: u32, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let len = (sample_rate as f32 * VINYL_LOOP_SECS) as usize;
        let buffer = (0..len)
            .map(|_| {
                let hiss = (rng.gen::<f32>() * 2.0 - 1.0) * 0.01;
                // Raising uniform noise to a high power leaves rare
                // spikes: the pops.
                let pop = rng.gen::<f32>().powi(30)
                    * if rng.gen::<bool>() { 0.15 } else { -0.15 };
                hiss + pop
            })
            .collect();
        Self { buffer, pos: 0 }
    }

    pub fn next(&mut self) -> f32 {
        let s = self.buffer[self.pos];
        self.pos = (self.pos + 1) % self.buffer.len();
        s * VINYL_GAIN
    }

    pub fn loop_len(&self) -> usize {
        self.buffer.len()
    }
}

/// A bird call in flight: a short downward sine sweep with a
/// triangular amplitude contour.
#[derive(Clone, Copy, Debug)]
struct Chirp {
    phase: f32,
    inc: f32,
    inc_ratio: f32,
    remaining: u32,
    total: u32,
}

/// Per-layer generator state.
#[derive(Clone, Debug)]
enum AmbientGen {
    Rain { rng: Pcg32, lp: f32 },
    Wind { rng: Pcg32, lp: f32, gust_phase: f32 },
    Tide { rng: Pcg32, lp: f32, swell_phase: f32 },
    Birds { rng: Pcg32, silence: u32, chirp: Option<Chirp> },
}

/// One ambient layer: a generator behind a smoothed gain.
#[derive(Clone, Debug)]
struct AmbientVoice {
    gain: SmoothedParam,
    gen: AmbientGen,
    sample_rate: u32,
}

impl AmbientVoice {
    fn new(layer: AmbientLayer, sample_rate: u32, seed: u64) -> Self {
        let rng = Pcg32::seed_from_u64(seed);
        let gen = match layer {
            AmbientLayer::Rain => AmbientGen::Rain { rng, lp: 0.0 },
            AmbientLayer::Wind => AmbientGen::Wind {
                rng,
                lp: 0.0,
                gust_phase: 0.0,
            },
            AmbientLayer::Tide => AmbientGen::Tide {
                rng,
                lp: 0.0,
                swell_phase: 0.0,
            },
            AmbientLayer::Birds => {
                let mut rng = rng;
                let silence = gap_samples(&mut rng, sample_rate);
                AmbientGen::Birds {
                    rng,
                    silence,
                    chirp: None,
                }
            }
        };
        Self {
            gain: SmoothedParam::new(0.0, AMBIENT_SETTLE_SECS, sample_rate),
            gen,
            sample_rate,
        }
    }

    fn next(&mut self) -> f32 {
        let sr = self.sample_rate as f32;
        let raw = match &mut self.gen {
            AmbientGen::Rain { rng, lp } => {
                let white = rng.gen::<f32>() * 2.0 - 1.0;
                *lp += (TAU * 3_000.0 / sr).min(1.0) * (white - *lp);
                let droplet = rng.gen::<f32>().powi(14)
                    * if rng.gen::<bool>() { 0.8 } else { -0.8 };
                *lp * 0.25 + droplet
            }
            AmbientGen::Wind { rng, lp, gust_phase } => {
                let white = rng.gen::<f32>() * 2.0 - 1.0;
                *lp += (TAU * 250.0 / sr).min(1.0) * (white - *lp);
                let gust = 0.6 + 0.4 * (TAU * *gust_phase).sin();
                *gust_phase = (*gust_phase + 0.07 / sr).fract();
                *lp * gust * 4.0
            }
            AmbientGen::Tide { rng, lp, swell_phase } => {
                let white = rng.gen::<f32>() * 2.0 - 1.0;
                *lp += (TAU * 600.0 / sr).min(1.0) * (white - *lp);
                let swell = 0.5 + 0.5 * (TAU * *swell_phase).sin();
                *swell_phase = (*swell_phase + 0.08 / sr).fract();
                *lp * (0.15 + 0.85 * swell * swell) * 3.0
            }
            AmbientGen::Birds {
                rng,
                silence,
                chirp,
            } => {
                let mut out = 0.0;
                let mut landed = false;
                if let Some(c) = chirp.as_mut() {
                    let progress = 1.0 - c.remaining as f32 / c.total as f32;
                    let contour = 1.0 - (2.0 * progress - 1.0).abs();
                    out = (TAU * c.phase).sin() * contour * 0.25;
                    c.phase = (c.phase + c.inc).fract();
                    c.inc *= c.inc_ratio;
                    c.remaining -= 1;
                    landed = c.remaining == 0;
                } else if *silence > 0 {
                    *silence -= 1;
                } else {
                    let total = (0.12 * sr) as u32;
                    *chirp = Some(Chirp {
                        phase: 0.0,
                        inc: 3_200.0 / sr,
                        inc_ratio: (2_400.0f32 / 3_200.0).powf(1.0 / total as f32),
                        remaining: total,
                        total,
                    });
                }
                if landed {
                    *silence = gap_samples(rng, self.sample_rate);
                    *chirp = None;
                }
                out
            }
        };
        raw * self.gain.advance()
    }
}

/// Samples of quiet between bird calls: one to six seconds.
fn gap_samples(rng: &mut Pcg32, sample_rate: u32) -> u32 {
    (rng.gen_range(1.0..6.0) * sample_rate as f32) as u32
}

/// The four ambient layers behind the music.
#[derive(Clone, Debug)]
pub struct AmbientBed {
    layers: [AmbientVoice; 4],
}

impl AmbientBed {
    pub fn new(sample_rate: u32, seed: u64) -> Self {
        let mut seed_rng = Pcg32::seed_from_u64(seed);
        let layers = AmbientLayer::ALL
            .map(|layer| AmbientVoice::new(layer, sample_rate, seed_rng.gen::<u64>()));
        Self { layers }
    }

    /// Glide one layer's gain toward `level` (clamped to 0..1).
    pub fn set_level(&mut self, layer: AmbientLayer, level: f32) {
        let level = if level.is_finite() {
            level.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.layers[layer.index()].gain.set_target(level);
    }

    pub fn level_target(&self, layer: AmbientLayer) -> f32 {
        self.layers[layer.index()].gain.target()
    }

    /// Render one summed sample across all four layers.
    pub fn next(&mut self) -> f32 {
        self.layers.iter_mut().map(|l| l.next()).sum()
    }
}
