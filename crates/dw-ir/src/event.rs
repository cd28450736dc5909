//! Scheduled engine events.
//!
//! The planner emits timestamped `Event`s roughly 100 ms ahead of the
//! audio clock; the control surface emits immediate ones. The engine
//! holds each event until the clock reaches its time, then fires it
//! within the render callback.

use alloc::vec::Vec;

use crate::clock::ClockTime;
use crate::descriptor::AmbientLayer;

/// One note onset, already resolved to concrete synthesis inputs.
///
/// Pitched specs carry frequency rather than symbol so the planner's
/// random choices (lead scale degree, chord root) are fixed at plan
/// time. `Chord` carries nothing: the voicing is a fixed four-note
/// shape, independent of the bar's chord symbol.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NoteSpec {
    Kick { velocity: f32 },
    Snare { velocity: f32 },
    HiHat { velocity: f32 },
    Bass { freq: f32 },
    Chord,
    Lead { freq: f32 },
}

/// Decoded announcement audio: mono PCM at its native rate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IntroClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl IntroClip {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// What the engine should do when an event's time arrives.
#[derive(Clone, Debug, PartialEq)]
pub enum EventPayload {
    Note(NoteSpec),
    /// Retarget the master lowpass; the engine glides, never jumps.
    SetFilterCutoff(f32),
    /// Retarget one ambient bed's gain, 0..1.
    SetAmbientLevel { layer: AmbientLayer, level: f32 },
    /// Replace whatever announcement is playing with this clip.
    PlayIntro(IntroClip),
}

/// A payload stamped with its audio-clock due time.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub time: ClockTime,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(time: ClockTime, payload: EventPayload) -> Self {
        Self { time, payload }
    }

    /// An event that is already due: fires on the next rendered frame.
    pub fn immediate(payload: EventPayload) -> Self {
        Self {
            time: ClockTime::ZERO,
            payload,
        }
    }
}
