//! Step planning: the rhythmic brain of the stream.
//!
//! State machine and dispatch policy are pure; the scheduler thread
//! that checks the clock lives in the control crate. The policy for
//! one step, in draw order: timing jitter, drum coin-flip, optional
//! extra-kick flip, melody gate, lead position flip, lead note pick.
//! One jitter draw covers every instrument fired that step.

use std::ops::Range;

use rand::Rng;

use dw_ir::{
    bass_frequency, ClockTime, Event, EventPayload, NoteSpec, TrackDescriptor, LEAD_SCALE,
};

/// Steps in the repeating large-scale phrase: 8 bars of 16 steps.
pub const STEPS_PER_PHRASE: u32 = 128;
pub const STEPS_PER_BAR: u32 = 16;
/// The phrase's quiet stretch, where drums mostly drop out.
pub const BREAKDOWN_STEPS: Range<u32> = 64..80;
/// How far ahead of the audio clock steps are planned.
pub const LOOK_AHEAD_SECS: f64 = 0.1;

/// Drum hit probability per step inside the breakdown.
const BREAKDOWN_DENSITY: f64 = 0.2;
/// Chance of the off-beat kick at step%16 == 10.
const EXTRA_KICK_CHANCE: f64 = 0.3;
/// Full width of the per-step timing jitter, seconds.
const JITTER_SECS: f64 = 0.005;

const KICK_VELOCITY: f32 = 0.6;
const SNARE_VELOCITY: f32 = 0.25;
const GHOST_VELOCITY: f32 = 0.05;
const HAT_ACCENT_VELOCITY: f32 = 0.04;
const HAT_SOFT_VELOCITY: f32 = 0.02;

/// Seconds of audio per sequencer step at `bpm`: a sixteenth note.
pub fn seconds_per_step(bpm: f32) -> f64 {
    15.0 / bpm as f64
}

/// Plan one step's events into `out`, all stamped with the same
/// jittered fire time.
pub fn plan_step<R: Rng + ?Sized>(
    step: u32,
    time: ClockTime,
    descriptor: &TrackDescriptor,
    rng: &mut R,
    out: &mut Vec<Event>,
) {
    let step = step % STEPS_PER_PHRASE;
    let jitter = (rng.gen::<f64>() - 0.5) * JITTER_SECS;
    let t = time.offset(jitter);
    let in_breakdown = BREAKDOWN_STEPS.contains(&step);

    let density = if in_breakdown { BREAKDOWN_DENSITY } else { 1.0 };
    if rng.gen::<f64>() < density {
        let beat = step % STEPS_PER_BAR;
        if beat == 0 {
            push_note(out, t, NoteSpec::Kick { velocity: KICK_VELOCITY });
        } else if beat == 10 && rng.gen::<f64>() < EXTRA_KICK_CHANCE {
            push_note(out, t, NoteSpec::Kick { velocity: KICK_VELOCITY });
        }
        if beat == 8 {
            push_note(out, t, NoteSpec::Snare { velocity: SNARE_VELOCITY });
        }
        if beat == 7 || beat == 15 {
            push_note(out, t, NoteSpec::Snare { velocity: GHOST_VELOCITY });
        }
        if step % 2 == 0 {
            let velocity = if step % 4 == 0 {
                HAT_ACCENT_VELOCITY
            } else {
                HAT_SOFT_VELOCITY
            };
            push_note(out, t, NoteSpec::HiHat { velocity });
        }
    }

    if step % STEPS_PER_BAR == 0 {
        let bar = step / STEPS_PER_BAR;
        let symbol = descriptor
            .chord_progression
            .get(bar as usize % descriptor.chord_progression.len().max(1))
            .map(String::as_str)
            .unwrap_or("");
        push_note(out, t, NoteSpec::Chord);
        push_note(out, t, NoteSpec::Bass { freq: bass_frequency(symbol) });
    }

    if !in_breakdown && rng.gen::<f64>() < descriptor.melody_complexity as f64 {
        let fires = step % 4 == 0 || (step % 4 == 2 && rng.gen::<f64>() > 0.5);
        if fires {
            let freq = LEAD_SCALE[rng.gen_range(0..LEAD_SCALE.len())];
            push_note(out, t, NoteSpec::Lead { freq });
        }
    }
}

fn push_note(out: &mut Vec<Event>, t: ClockTime, spec: NoteSpec) {
    out.push(Event::new(t, EventPayload::Note(spec)));
}

/// Phrase position plus the accumulated fire time of the next step.
#[derive(Clone, Copy, Debug, Default)]
pub struct StepClock {
    step: u32,
    next_time: ClockTime,
}

impl StepClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn next_time(&self) -> ClockTime {
        self.next_time
    }

    /// A new track restarts the phrase from its top. Fire time is
    /// left alone; only `begin` re-anchors it.
    pub fn reset_phrase(&mut self) {
        self.step = 0;
    }

    /// Anchor the next step at `now`. Called on every start, so a
    /// resumed stream never replays the gap it was stopped for.
    pub fn begin(&mut self, now: ClockTime) {
        self.next_time = now;
    }

    /// Accumulate one step of tempo time and wrap the phrase.
    pub fn advance(&mut self, bpm: f32) {
        self.next_time = self.next_time.offset(seconds_per_step(bpm));
        self.step = (self.step + 1) % STEPS_PER_PHRASE;
    }
}

/// The descriptor being played plus the phrase position: everything
/// the scheduler thread locks when it wakes.
#[derive(Clone, Debug, Default)]
pub struct Sequencer {
    descriptor: Option<TrackDescriptor>,
    clock: StepClock,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a track and restart the phrase.
    pub fn set_track(&mut self, descriptor: TrackDescriptor) {
        self.descriptor = Some(descriptor.sanitized());
        self.clock.reset_phrase();
    }

    pub fn descriptor(&self) -> Option<&TrackDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn clock(&self) -> StepClock {
        self.clock
    }

    pub fn begin(&mut self, now: ClockTime) {
        self.clock.begin(now);
    }

    /// Plan every step due inside the look-ahead window from `now`.
    ///
    /// The accumulator advances past each planned step before the
    /// window check repeats, so fire times never regress. Without a
    /// descriptor this is a no-op.
    pub fn drain_window<R: Rng + ?Sized>(
        &mut self,
        now: ClockTime,
        rng: &mut R,
        out: &mut Vec<Event>,
    ) {
        let Some(descriptor) = &self.descriptor else {
            return;
        };
        let limit = now.offset(LOOK_AHEAD_SECS);
        while self.clock.next_time < limit {
            plan_step(self.clock.step, self.clock.next_time, descriptor, rng, out);
            self.clock.advance(descriptor.bpm);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn chill_track() -> TrackDescriptor {
        TrackDescriptor {
            bpm: 80.0,
            chord_progression: vec![
                "Cmaj7".to_string(),
                "Am7".to_string(),
                "Fmaj7".to_string(),
                "G7".to_string(),
            ],
            melody_complexity: 0.4,
            ..TrackDescriptor::default()
        }
    }

    fn plan_phrase(descriptor: &TrackDescriptor, rng: &mut Pcg32) -> Vec<(u32, Event)> {
        let mut out = Vec::new();
        let mut tagged = Vec::new();
        for step in 0..STEPS_PER_PHRASE {
            let t = ClockTime::from_secs(step as f64 * seconds_per_step(descriptor.bpm));
            plan_step(step, t, descriptor, rng, &mut out);
            for e in out.drain(..) {
                tagged.push((step, e));
            }
        }
        tagged
    }

    #[test]
    fn step_length_is_fifteen_over_bpm() {
        assert!((seconds_per_step(80.0) - 0.1875).abs() < 1e-12);
        assert!((seconds_per_step(75.0) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn a_phrase_of_advances_spans_the_expected_time() {
        let mut clock = StepClock::new();
        clock.begin(ClockTime::ZERO);
        for _ in 0..STEPS_PER_PHRASE {
            clock.advance(80.0);
        }
        assert_eq!(clock.step(), 0);
        assert!((clock.next_time().secs() - 24.0).abs() < 1e-9);
    }

    #[test]
    fn set_track_resets_the_phrase_but_not_the_anchor() {
        let mut seq = Sequencer::new();
        seq.set_track(chill_track());
        seq.begin(ClockTime::from_secs(5.0));
        let mut rng = Pcg32::seed_from_u64(1);
        let mut out = Vec::new();
        seq.drain_window(ClockTime::from_secs(5.0), &mut rng, &mut out);
        assert!(seq.clock().step() > 0);

        seq.set_track(chill_track());
        assert_eq!(seq.clock().step(), 0);
        let anchored = seq.clock().next_time();
        assert!(anchored > ClockTime::from_secs(5.0));
    }

    #[test]
    fn drain_without_a_track_is_a_no_op() {
        let mut seq = Sequencer::new();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut out = Vec::new();
        seq.drain_window(ClockTime::from_secs(1.0), &mut rng, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn drained_steps_are_not_replanned() {
        let mut seq = Sequencer::new();
        seq.set_track(chill_track());
        seq.begin(ClockTime::ZERO);
        let mut rng = Pcg32::seed_from_u64(7);
        let mut first = Vec::new();
        seq.drain_window(ClockTime::ZERO, &mut rng, &mut first);
        assert!(!first.is_empty());

        let mut second = Vec::new();
        seq.drain_window(ClockTime::ZERO, &mut rng, &mut second);
        assert!(second.is_empty());
    }

    #[test]
    fn drain_covers_exactly_the_look_ahead_window() {
        let mut seq = Sequencer::new();
        seq.set_track(chill_track());
        seq.begin(ClockTime::ZERO);
        let mut rng = Pcg32::seed_from_u64(7);
        let mut out = Vec::new();
        seq.drain_window(ClockTime::ZERO, &mut rng, &mut out);
        for e in &out {
            assert!(e.time.secs() < LOOK_AHEAD_SECS + JITTER_SECS / 2.0);
        }
        assert!(seq.clock().next_time().secs() >= LOOK_AHEAD_SECS);
    }

    #[test]
    fn fire_times_never_regress_within_a_drain() {
        let mut seq = Sequencer::new();
        let mut track = chill_track();
        track.bpm = 85.0;
        seq.set_track(track);
        seq.begin(ClockTime::ZERO);
        let mut rng = Pcg32::seed_from_u64(3);
        let mut out = Vec::new();
        // A window long past the anchor forces a multi-step drain.
        seq.drain_window(ClockTime::from_secs(1.9), &mut rng, &mut out);
        let mut last = ClockTime::from_secs(f64::MIN);
        for e in &out {
            assert!(e.time >= last);
            last = e.time;
        }
    }

    #[test]
    fn jitter_stays_within_its_bound() {
        let track = chill_track();
        let mut rng = Pcg32::seed_from_u64(11);
        let mut out = Vec::new();
        for step in 0..STEPS_PER_PHRASE {
            let nominal = ClockTime::from_secs(1.0);
            plan_step(step, nominal, &track, &mut rng, &mut out);
            for e in out.drain(..) {
                assert!((e.time.secs() - 1.0).abs() <= JITTER_SECS / 2.0 + 1e-12);
            }
        }
    }

    #[test]
    fn every_event_in_a_step_shares_one_jitter() {
        let track = chill_track();
        let mut rng = Pcg32::seed_from_u64(5);
        let mut out = Vec::new();
        plan_step(0, ClockTime::from_secs(2.0), &track, &mut rng, &mut out);
        assert!(out.len() >= 4, "bar start fires kick, hat, chord, bass");
        let t0 = out[0].time;
        assert!(out.iter().all(|e| e.time == t0));
    }

    #[test]
    fn bar_starts_fire_chord_and_bass_together() {
        let track = chill_track();
        let mut rng = Pcg32::seed_from_u64(2);
        let phrase = plan_phrase(&track, &mut rng);
        let chords: Vec<u32> = phrase
            .iter()
            .filter(|(_, e)| matches!(e.payload, EventPayload::Note(NoteSpec::Chord)))
            .map(|(s, _)| *s)
            .collect();
        assert_eq!(chords, vec![0, 16, 32, 48, 64, 80, 96, 112]);
        let basses = phrase
            .iter()
            .filter(|(_, e)| matches!(e.payload, EventPayload::Note(NoteSpec::Bass { .. })))
            .count();
        assert_eq!(basses, 8);
    }

    #[test]
    fn chord_index_cycles_the_progression_per_bar() {
        let track = chill_track();
        let mut rng = Pcg32::seed_from_u64(2);
        let phrase = plan_phrase(&track, &mut rng);
        let roots: Vec<f32> = phrase
            .iter()
            .filter_map(|(_, e)| match e.payload {
                EventPayload::Note(NoteSpec::Bass { freq }) => Some(freq),
                _ => None,
            })
            .collect();
        let expected: Vec<f32> = ["Cmaj7", "Am7", "Fmaj7", "G7", "Cmaj7", "Am7", "Fmaj7", "G7"]
            .iter()
            .map(|s| bass_frequency(s))
            .collect();
        assert_eq!(roots, expected);
    }

    #[test]
    fn empty_progression_falls_back_to_the_default_root() {
        let mut track = chill_track();
        track.chord_progression.clear();
        let mut rng = Pcg32::seed_from_u64(2);
        let mut out = Vec::new();
        plan_step(0, ClockTime::ZERO, &track, &mut rng, &mut out);
        let bass = out.iter().find_map(|e| match e.payload {
            EventPayload::Note(NoteSpec::Bass { freq }) => Some(freq),
            _ => None,
        });
        assert_eq!(bass, Some(bass_frequency("")));
    }

    #[test]
    fn snare_and_ghost_positions() {
        let mut track = chill_track();
        track.melody_complexity = 0.0;
        let mut rng = Pcg32::seed_from_u64(4);
        let mut out = Vec::new();
        for step in 0..STEPS_PER_BAR {
            plan_step(step, ClockTime::ZERO, &track, &mut rng, &mut out);
            let snares: Vec<f32> = out
                .drain(..)
                .filter_map(|e| match e.payload {
                    EventPayload::Note(NoteSpec::Snare { velocity }) => Some(velocity),
                    _ => None,
                })
                .collect();
            match step {
                8 => assert_eq!(snares, vec![SNARE_VELOCITY]),
                7 | 15 => assert_eq!(snares, vec![GHOST_VELOCITY]),
                _ => assert!(snares.is_empty()),
            }
        }
    }

    #[test]
    fn hats_tick_every_even_step_with_alternating_accent() {
        let mut track = chill_track();
        track.melody_complexity = 0.0;
        let mut rng = Pcg32::seed_from_u64(4);
        let mut out = Vec::new();
        for step in 0..STEPS_PER_BAR {
            plan_step(step, ClockTime::ZERO, &track, &mut rng, &mut out);
            let hats: Vec<f32> = out
                .drain(..)
                .filter_map(|e| match e.payload {
                    EventPayload::Note(NoteSpec::HiHat { velocity }) => Some(velocity),
                    _ => None,
                })
                .collect();
            if step % 2 == 0 {
                let expected = if step % 4 == 0 {
                    HAT_ACCENT_VELOCITY
                } else {
                    HAT_SOFT_VELOCITY
                };
                assert_eq!(hats, vec![expected]);
            } else {
                assert!(hats.is_empty());
            }
        }
    }

    #[test]
    fn extra_kick_lands_near_its_advertised_odds() {
        let track = chill_track();
        let mut rng = Pcg32::seed_from_u64(6);
        let mut out = Vec::new();
        let trials = 2_000;
        let mut fired = 0;
        for _ in 0..trials {
            plan_step(10, ClockTime::ZERO, &track, &mut rng, &mut out);
            fired += out
                .drain(..)
                .filter(|e| matches!(e.payload, EventPayload::Note(NoteSpec::Kick { .. })))
                .count();
        }
        let rate = fired as f64 / trials as f64;
        assert!((0.25..0.35).contains(&rate), "extra kick rate {rate}");
    }

    #[test]
    fn breakdown_thins_drums_to_a_fifth() {
        // Every even step carries a hat when the density gate passes,
        // so the hat rate on even breakdown steps reads the gate
        // directly: it must sit near 20%, not merely below normal.
        let mut track = chill_track();
        track.melody_complexity = 0.0;
        let mut rng = Pcg32::seed_from_u64(8);
        let phrases = 200;
        let mut hats = 0usize;
        for _ in 0..phrases {
            for (step, e) in plan_phrase(&track, &mut rng) {
                if BREAKDOWN_STEPS.contains(&step)
                    && matches!(e.payload, EventPayload::Note(NoteSpec::HiHat { .. }))
                {
                    hats += 1;
                }
            }
        }
        // 8 even steps per breakdown, 200 phrases: 1600 gate draws.
        let trials = phrases * 8;
        let rate = hats as f64 / trials as f64;
        assert!((0.15..0.25).contains(&rate), "breakdown hat rate {rate}");
    }

    #[test]
    fn breakdown_suppresses_the_lead_entirely() {
        let mut track = chill_track();
        track.melody_complexity = 1.0;
        let mut rng = Pcg32::seed_from_u64(9);
        for _ in 0..50 {
            for (step, e) in plan_phrase(&track, &mut rng) {
                if matches!(e.payload, EventPayload::Note(NoteSpec::Lead { .. })) {
                    assert!(!BREAKDOWN_STEPS.contains(&step));
                    assert!(step % 4 == 0 || step % 4 == 2);
                }
            }
        }
    }

    #[test]
    fn full_melody_fires_every_downbeat_outside_the_breakdown() {
        let mut track = chill_track();
        track.melody_complexity = 1.0;
        let mut rng = Pcg32::seed_from_u64(10);
        let phrase = plan_phrase(&track, &mut rng);
        for step in (0..STEPS_PER_PHRASE).step_by(4) {
            if BREAKDOWN_STEPS.contains(&step) {
                continue;
            }
            let has_lead = phrase.iter().any(|(s, e)| {
                *s == step && matches!(e.payload, EventPayload::Note(NoteSpec::Lead { .. }))
            });
            assert!(has_lead, "no lead at step {step}");
        }
    }

    #[test]
    fn zero_melody_complexity_never_leads() {
        let mut track = chill_track();
        track.melody_complexity = 0.0;
        let mut rng = Pcg32::seed_from_u64(12);
        for _ in 0..20 {
            for (_, e) in plan_phrase(&track, &mut rng) {
                assert!(!matches!(e.payload, EventPayload::Note(NoteSpec::Lead { .. })));
            }
        }
    }

    #[test]
    fn lead_notes_come_from_the_pentatonic_pool() {
        let mut track = chill_track();
        track.melody_complexity = 1.0;
        let mut rng = Pcg32::seed_from_u64(13);
        for (_, e) in plan_phrase(&track, &mut rng) {
            if let EventPayload::Note(NoteSpec::Lead { freq }) = e.payload {
                assert!(LEAD_SCALE.contains(&freq));
            }
        }
    }
}
