//! Priority queue for scheduled events.

use dw_ir::{ClockTime, Event};

/// Events ordered by due time.
///
/// The queue stays small (a look-ahead window's worth of notes plus
/// the odd control change), so a sorted `Vec` with insertion by
/// binary search beats anything fancier.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    events: Vec<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Insert keeping time order. Equal times keep arrival order.
    pub fn push(&mut self, event: Event) {
        let pos = self
            .events
            .partition_point(|e| e.time <= event.time);
        self.events.insert(pos, event);
    }

    /// Next event without removing it.
    pub fn peek(&self) -> Option<&Event> {
        self.events.first()
    }

    /// Remove and return the next event if it is due at `now`.
    pub fn pop_due(&mut self, now: ClockTime) -> Option<Event> {
        if self.events.first().is_some_and(|e| e.time <= now) {
            Some(self.events.remove(0))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
