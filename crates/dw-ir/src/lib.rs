//! Core data model for the driftwave lo-fi stream engine.
//!
//! This crate defines the types shared between the step planner, the
//! real-time synthesis engine, and the control surface: track
//! descriptors, audio-clock timestamps, scheduled events, and the
//! amplitude envelopes the instruments are built from.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod clock;
mod descriptor;
mod envelope;
mod event;
mod pitch;

pub use clock::ClockTime;
pub use descriptor::{AmbientLayer, ScaleType, TrackDescriptor, BPM_RANGE, DEFAULT_CUTOFF_HZ};
pub use envelope::{interpolate, Breakpoint, Curve, Envelope, MAX_BREAKPOINTS};
pub use event::{Event, EventPayload, IntroClip, NoteSpec};
pub use pitch::{
    bass_frequency, root_frequency, CHORD_VOICING, FALLBACK_ROOT_HZ, LEAD_SCALE, NOTE_FREQS,
};
