//! Track descriptors and ambient layer identity.
//!
//! A `TrackDescriptor` is the unit of programming for the stream: one
//! generated "track" with its tempo, harmony, and synthesis hints.
//! Descriptors arrive from an external provider as camelCase JSON, so
//! every field is defaulted and range-checked on intake rather than
//! trusted.

use alloc::string::String;
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tempo bounds the planner will accept, in beats per minute.
pub const BPM_RANGE: core::ops::RangeInclusive<f32> = 70.0..=85.0;

/// Master lowpass cutoff used when a descriptor gives none.
pub const DEFAULT_CUTOFF_HZ: f32 = 1_800.0;

/// Scale family hint from the provider.
///
/// Carried for forward compatibility with melody shaping; the lead
/// generator currently plays a fixed pentatonic set regardless.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ScaleType {
    Major,
    #[default]
    Minor,
    Pentatonic,
}

/// One generated track: identity plus the musical parameters the
/// planner and engine consume.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct TrackDescriptor {
    pub name: String,
    pub artist: String,
    /// Tempo in beats per minute. One step is a sixteenth note.
    pub bpm: f32,
    pub mood: String,
    /// Display hue for front ends; never interpreted here.
    pub color: String,
    /// Base64 PCM16LE mono 24 kHz announcement, possibly empty.
    pub intro_text: String,
    /// Key name, e.g. "C" or "F#".
    pub key: String,
    pub scale_type: ScaleType,
    /// Chord symbols cycled one per bar, e.g. ["Cmaj7", "Am7"].
    pub chord_progression: Vec<String>,
    /// Master lowpass target in Hz.
    pub filter_cutoff: f32,
    /// Carried for the provider round trip; no reverb stage yet.
    pub reverb_wet: f32,
    /// Probability gate for lead notes, 0..1.
    pub melody_complexity: f32,
}

impl Default for TrackDescriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            artist: String::new(),
            bpm: 80.0,
            mood: String::new(),
            color: String::new(),
            intro_text: String::new(),
            key: String::from("C"),
            scale_type: ScaleType::Minor,
            chord_progression: Vec::new(),
            filter_cutoff: DEFAULT_CUTOFF_HZ,
            reverb_wet: 0.3,
            melody_complexity: 0.4,
        }
    }
}

impl TrackDescriptor {
    /// Force every numeric field into its working range.
    ///
    /// Non-finite or out-of-range values fall back to the defaults
    /// rather than rejecting the descriptor; a bad track should play
    /// conservatively, not stall the stream.
    pub fn sanitized(mut self) -> Self {
        self.bpm = clamp_or(self.bpm, BPM_RANGE, 80.0);
        self.filter_cutoff = clamp_or(self.filter_cutoff, 100.0..=12_000.0, DEFAULT_CUTOFF_HZ);
        self.reverb_wet = clamp_or(self.reverb_wet, 0.0..=1.0, 0.3);
        self.melody_complexity = clamp_or(self.melody_complexity, 0.0..=1.0, 0.4);
        self
    }

    /// Seconds of audio one sequencer step covers at this tempo.
    pub fn seconds_per_step(&self) -> f64 {
        15.0 / self.bpm as f64
    }
}

fn clamp_or(value: f32, range: core::ops::RangeInclusive<f32>, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(*range.start(), *range.end())
    } else {
        fallback
    }
}

/// The four looped background beds mixed under the music.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AmbientLayer {
    Rain,
    Wind,
    Tide,
    Birds,
}

impl AmbientLayer {
    pub const ALL: [AmbientLayer; 4] = [
        AmbientLayer::Rain,
        AmbientLayer::Wind,
        AmbientLayer::Tide,
        AmbientLayer::Birds,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AmbientLayer::Rain => "rain",
            AmbientLayer::Wind => "wind",
            AmbientLayer::Tide => "tide",
            AmbientLayer::Birds => "birds",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.name() == name)
    }

    /// Stable position in mix-state arrays.
    pub fn index(&self) -> usize {
        match self {
            AmbientLayer::Rain => 0,
            AmbientLayer::Wind => 1,
            AmbientLayer::Tide => 2,
            AmbientLayer::Birds => 3,
        }
    }
}
