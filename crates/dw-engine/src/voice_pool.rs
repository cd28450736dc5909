//! Fixed-capacity voice pool.
//!
//! The engine never refuses a note: when every slot is busy the pool
//! steals the oldest voice. Finished voices are reaped once per frame
//! so slots recycle without any bookkeeping in the instruments.

use crate::voice::{Bus, Voice};

/// Simultaneous voice ceiling. A dense phrase peaks around twenty
/// live voices (four-note pads overlap across bars), so this leaves
/// comfortable headroom.
pub const MAX_VOICES: usize = 64;

/// One frame's worth of pre-mix bus sums.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BusMix {
    pub filter: f32,
    pub direct: f32,
}

/// Pool of sounding voices.
#[derive(Debug, Default)]
pub struct VoicePool {
    slots: Vec<Option<Voice>>,
    spawned: u64,
}

impl VoicePool {
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_VOICES).map(|_| None).collect(),
            spawned: 0,
        }
    }

    /// Add a voice, stealing the oldest one if the pool is full.
    pub fn spawn(&mut self, mut voice: Voice) {
        voice.age = self.spawned;
        self.spawned += 1;

        if let Some(slot) = self.slots.iter_mut().find(|s| s.is_none()) {
            *slot = Some(voice);
            return;
        }
        if let Some(slot) = self
            .slots
            .iter_mut()
            .min_by_key(|s| s.as_ref().map_or(u64::MAX, |v| v.age))
        {
            *slot = Some(voice);
        }
    }

    /// Render one sample from every live voice, summed per bus.
    pub fn render(&mut self) -> BusMix {
        let mut mix = BusMix::default();
        for voice in self.slots.iter_mut().flatten() {
            let sample = voice.render();
            match voice.bus {
                Bus::Filter => mix.filter += sample,
                Bus::Direct => mix.direct += sample,
            }
        }
        mix
    }

    /// Free every slot whose envelope has ended.
    pub fn reap_finished(&mut self) {
        for slot in self.slots.iter_mut() {
            if slot.as_ref().is_some_and(|v| v.is_finished()) {
                *slot = None;
            }
        }
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }
}
