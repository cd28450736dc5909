//! Instrument voice constructors.
//!
//! Each function bakes one instrument's tone and contour into a
//! `Voice`. Amplitude numbers live in the envelopes; velocity scales
//! the drum peaks. These are the sound of the stream, so the values
//! are deliberately literal rather than configurable.

use rand::RngCore;

use dw_ir::{Breakpoint, Curve, Envelope, CHORD_VOICING};

use crate::voice::{noise_seed, Bus, Tone, Voice};

/// Kick: a sine dropping from 150 Hz to sub-audio over 0.4 s with a
/// matching exponential amplitude decay.
pub fn kick(velocity: f32, sample_rate: u32) -> Voice {
    let env = Envelope::from_points(&[
        Breakpoint::new(0.0, velocity, Curve::ExpRatio),
        Breakpoint::new(0.4, 0.01, Curve::Hold),
    ]);
    Voice::new(
        Tone::sweep(150.0, 0.01, 0.4, sample_rate),
        env,
        1.0,
        Bus::Filter,
        sample_rate,
    )
}

/// Snare: white noise thinned by a 1 kHz highpass, 0.15 s decay.
pub fn snare<R: RngCore>(velocity: f32, sample_rate: u32, rng: &mut R) -> Voice {
    let env = Envelope::from_points(&[
        Breakpoint::new(0.0, velocity, Curve::ExpRatio),
        Breakpoint::new(0.15, 0.01, Curve::Hold),
    ]);
    Voice::new(
        Tone::noise(noise_seed(rng), Some(1_000.0), sample_rate),
        env,
        1.0,
        Bus::Filter,
        sample_rate,
    )
}

/// Hi-hat: a 12 kHz square chopped to 40 ms.
pub fn hihat(velocity: f32, sample_rate: u32) -> Voice {
    let env = Envelope::from_points(&[
        Breakpoint::new(0.0, velocity, Curve::ExpRatio),
        Breakpoint::new(0.04, 0.001, Curve::Hold),
    ]);
    Voice::new(
        Tone::square(12_000.0, sample_rate),
        env,
        1.0,
        Bus::Filter,
        sample_rate,
    )
}

/// Bass: a sine held for most of the bar. Skips the filter bus so the
/// low end stays solid under the wobbling cutoff.
pub fn bass(freq: f32, sample_rate: u32) -> Voice {
    let env = Envelope::from_points(&[
        Breakpoint::new(0.0, 0.0, Curve::Linear),
        Breakpoint::new(0.1, 0.15, Curve::Linear),
        Breakpoint::new(3.4, 0.0, Curve::Hold),
    ]);
    Voice::new(Tone::sine(freq, sample_rate), env, 1.0, Bus::Direct, sample_rate)
}

/// Chord pad: four triangle voices on the fixed voicing, strummed at
/// 20 ms intervals, each swelling over half a second.
pub fn chord_voices(sample_rate: u32) -> [Voice; 4] {
    let stagger = sample_rate as u64 / 50;
    let mut position = 0u64;
    CHORD_VOICING.map(|freq| {
        let env = Envelope::from_points(&[
            Breakpoint::new(0.0, 0.0, Curve::Linear),
            Breakpoint::new(0.5, 0.02, Curve::Linear),
            Breakpoint::new(3.5, 0.0, Curve::Hold),
        ]);
        let voice = Voice::new(Tone::triangle(freq, sample_rate), env, 1.0, Bus::Filter, sample_rate)
            .with_delay(stagger * position);
        position += 1;
        voice
    })
}

/// Lead: a quick sine pluck, 50 ms up then a long exponential tail.
pub fn lead(freq: f32, sample_rate: u32) -> Voice {
    let env = Envelope::from_points(&[
        Breakpoint::new(0.0, 0.0, Curve::Linear),
        Breakpoint::new(0.05, 0.04, Curve::ExpRatio),
        Breakpoint::new(0.75, 0.001, Curve::Hold),
    ]);
    Voice::new(Tone::sine(freq, sample_rate), env, 1.0, Bus::Filter, sample_rate)
}
