//! Synthesis and sequencing engine for the driftwave lo-fi stream.
//!
//! The engine renders one frame at a time inside the audio thread:
//! it drains due events from its queue, fires instrument voices into
//! a small pool, and mixes them through the master lowpass alongside
//! the vinyl and ambient textures. Step planning is a pure function
//! over `(step, clock, descriptor, rng)` so the dispatch rules can be
//! tested without any audio machinery.

mod analysis;
mod engine;
mod envelope_state;
mod event_queue;
mod filter;
mod frame;
mod instruments;
mod intro;
mod sequencer;
mod smooth;
mod texture;
mod voice;
mod voice_pool;

pub use analysis::{SpectrumAnalyzer, BIN_COUNT, FFT_SIZE};
pub use engine::{Engine, EngineConfig, MASTER_GAIN};
pub use envelope_state::EnvelopeState;
pub use event_queue::EventQueue;
pub use filter::MasterFilter;
pub use frame::Frame;
pub use instruments::{bass, chord_voices, hihat, kick, lead, snare};
pub use intro::IntroVoice;
pub use sequencer::{
    plan_step, seconds_per_step, Sequencer, StepClock, BREAKDOWN_STEPS, LOOK_AHEAD_SECS,
    STEPS_PER_BAR, STEPS_PER_PHRASE,
};
pub use smooth::SmoothedParam;
pub use texture::{AmbientBed, VinylSource};
pub use voice::{Bus, Tone, Voice};
pub use voice_pool::{BusMix, VoicePool, MAX_VOICES};
