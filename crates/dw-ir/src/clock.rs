//! Audio-clock time representation.
//!
//! `ClockTime` counts seconds of rendered audio, not wall-clock time.
//! The scheduler plans events against this clock so that note onsets
//! stay sample-accurate even when the planning thread wakes late.

/// A position on the audio clock, in seconds from stream start.
///
/// Ordering uses `f64::total_cmp`, so values are usable as sort keys
/// in the engine's event queue.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClockTime(f64);

impl ClockTime {
    /// The stream origin.
    pub const ZERO: Self = Self(0.0);

    pub const fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    /// Convert a rendered-frame count to clock seconds.
    pub fn from_samples(samples: u64, sample_rate: u32) -> Self {
        Self(samples as f64 / sample_rate as f64)
    }

    pub const fn secs(self) -> f64 {
        self.0
    }

    /// Nearest frame index for this position.
    pub fn to_samples(self, sample_rate: u32) -> u64 {
        let frames = self.0 * sample_rate as f64;
        if frames <= 0.0 {
            0
        } else {
            (frames + 0.5) as u64
        }
    }

    /// Shift by a signed number of seconds.
    pub fn offset(self, secs: f64) -> Self {
        Self(self.0 + secs)
    }
}

impl PartialEq for ClockTime {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0).is_eq()
    }
}

impl Eq for ClockTime {}

impl PartialOrd for ClockTime {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClockTime {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}
