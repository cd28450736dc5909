//! The render core.
//!
//! One `Engine` owns the whole signal graph: voice pool and master
//! lowpass on the melodic bus, vinyl and ambient beds on the direct
//! bus, the announcement voice on the tap. `render_frame` is the only
//! driver: it fires due events, renders one sample from everything,
//! and advances the audio clock. The audio thread calls it in a loop;
//! tests call it directly.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use dw_ir::{ClockTime, Event, EventPayload, NoteSpec};

use crate::event_queue::EventQueue;
use crate::filter::MasterFilter;
use crate::frame::Frame;
use crate::instruments;
use crate::intro::IntroVoice;
use crate::texture::{AmbientBed, VinylSource};
use crate::voice_pool::VoicePool;

/// Fixed master output level.
pub const MASTER_GAIN: f32 = 0.6;

#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    pub sample_rate: u32,
    /// Seeds the noise generators. Streams sound alike but not
    /// sample-identical across different seeds.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            seed: 0,
        }
    }
}

pub struct Engine {
    sample_rate: u32,
    clock_samples: u64,
    queue: EventQueue,
    pool: VoicePool,
    filter: MasterFilter,
    vinyl: VinylSource,
    ambient: AmbientBed,
    intro: Option<IntroVoice>,
    rng: Pcg32,
    last_tap: f32,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let mut rng = Pcg32::seed_from_u64(config.seed);
        let vinyl = VinylSource::new(config.sample_rate, rng.gen());
        let ambient = AmbientBed::new(config.sample_rate, rng.gen());
        Self {
            sample_rate: config.sample_rate,
            clock_samples: 0,
            queue: EventQueue::new(),
            pool: VoicePool::new(),
            filter: MasterFilter::new(config.sample_rate),
            vinyl,
            ambient,
            intro: None,
            rng,
            last_tap: 0.0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Rendered frames so far.
    pub fn clock_samples(&self) -> u64 {
        self.clock_samples
    }

    /// Audio-clock position of the next frame to render.
    pub fn clock(&self) -> ClockTime {
        ClockTime::from_samples(self.clock_samples, self.sample_rate)
    }

    /// Queue an event; due events fire inside `render_frame`.
    pub fn schedule(&mut self, event: Event) {
        self.queue.push(event);
    }

    /// The analysis-tap sample from the most recent frame: the
    /// filtered melodic bus plus the announcement, before master gain.
    pub fn tap_level(&self) -> f32 {
        self.last_tap
    }

    pub fn active_voices(&self) -> usize {
        self.pool.active_count()
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Render one frame and advance the clock.
    pub fn render_frame(&mut self) -> Frame {
        let now = self.clock();
        while let Some(event) = self.queue.pop_due(now) {
            self.dispatch(event.payload);
        }

        let mix = self.pool.render();
        let filtered = self.filter.process(mix.filter);

        let mut intro_sample = 0.0;
        let mut intro_done = false;
        if let Some(voice) = self.intro.as_mut() {
            intro_sample = voice.next();
            intro_done = voice.is_finished();
        }
        if intro_done {
            self.intro = None;
        }

        let tap = filtered + intro_sample;
        self.last_tap = tap;

        let direct = mix.direct + self.vinyl.next() + self.ambient.next();
        let out = (tap + direct) * MASTER_GAIN;

        self.pool.reap_finished();
        self.clock_samples += 1;
        Frame::mono(out).clamped()
    }

    /// Render a batch; convenience for tests and offline use.
    pub fn render_frames(&mut self, count: usize) -> Vec<Frame> {
        (0..count).map(|_| self.render_frame()).collect()
    }

    fn dispatch(&mut self, payload: EventPayload) {
        match payload {
            EventPayload::Note(spec) => self.fire(spec),
            EventPayload::SetFilterCutoff(hz) => self.filter.set_cutoff(hz),
            EventPayload::SetAmbientLevel { layer, level } => {
                self.ambient.set_level(layer, level);
            }
            EventPayload::PlayIntro(clip) => {
                self.intro = Some(IntroVoice::new(clip, self.sample_rate));
            }
        }
    }

    fn fire(&mut self, spec: NoteSpec) {
        let sr = self.sample_rate;
        match spec {
            NoteSpec::Kick { velocity } => self.pool.spawn(instruments::kick(velocity, sr)),
            NoteSpec::Snare { velocity } => {
                let voice = instruments::snare(velocity, sr, &mut self.rng);
                self.pool.spawn(voice);
            }
            NoteSpec::HiHat { velocity } => self.pool.spawn(instruments::hihat(velocity, sr)),
            NoteSpec::Bass { freq } => self.pool.spawn(instruments::bass(freq, sr)),
            NoteSpec::Chord => {
                for voice in instruments::chord_voices(sr) {
                    self.pool.spawn(voice);
                }
            }
            NoteSpec::Lead { freq } => self.pool.spawn(instruments::lead(freq, sr)),
        }
    }
}
