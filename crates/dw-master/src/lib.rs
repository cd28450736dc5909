//! Headless controller for the driftwave stream.
//!
//! Provides the whole control surface a front end needs: install a
//! track, start/stop the sequencer, mix the ambient beds, play a
//! spoken intro, and poll the energy spectrum for a visualizer.
//!
//! The controller owns two worker threads. The render thread is
//! brought up lazily on first use and lives until the controller is
//! dropped: it owns the `Engine` and the audio sink (cpal by
//! default), drains the
//! event inbox, and publishes the audio clock plus tap samples. The
//! scheduler thread exists only while the stream is started: it wakes
//! every ~25 ms and plans all steps inside the look-ahead window.
//! `stop` joins the scheduler only, so in-flight notes, vinyl, and
//! ambient beds keep sounding.

mod intro;
mod presets;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use dw_audio::{AudioError, AudioOutput, CpalOutput};
use dw_engine::{Engine, EngineConfig, Frame, Sequencer, SpectrumAnalyzer};

// Re-export common types so callers don't need dw-ir directly.
pub use dw_ir::{AmbientLayer, ClockTime, ScaleType, TrackDescriptor};

pub use intro::{decode_intro, INTRO_SAMPLE_RATE};
pub use presets::MoodPreset;

use dw_ir::{Event, EventPayload};

/// Builds the render thread's audio sink. The factory crosses into
/// the render thread and runs there, so backends whose streams are
/// not `Send` (cpal) are constructed on the thread that uses them.
/// Injectable so tests can run the controller against a mock sink.
pub type OutputFactory =
    Arc<dyn Fn() -> Result<Box<dyn AudioOutput>, AudioError> + Send + Sync>;

/// The default factory: open the default cpal device.
fn cpal_factory() -> OutputFactory {
    Arc::new(|| {
        let (mut output, frames) = CpalOutput::new()?;
        output.build_stream(frames)?;
        Ok(Box::new(output) as Box<dyn AudioOutput>)
    })
}

/// Events the inbox can hold; a wake that overflows it sheds events.
const INBOX_CAPACITY: usize = 1_024;
/// Tap samples buffered for the visualizer between polls.
const TAP_CAPACITY: usize = 8_192;
/// Decorrelates the planner's RNG from the engine's noise RNG.
const PLANNER_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Why playback could not be brought up. Surfaced once, from
/// `start` or `play_intro`; there is no retry path.
#[derive(Debug)]
pub enum StartError {
    /// The host audio subsystem refused a device or stream.
    Audio(AudioError),
    /// The render thread exited before reporting readiness.
    RenderThreadDied,
}

impl std::fmt::Display for StartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartError::Audio(err) => write!(f, "audio unavailable: {}", err),
            StartError::RenderThreadDied => write!(f, "render thread died during startup"),
        }
    }
}

impl std::error::Error for StartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StartError::Audio(err) => Some(err),
            StartError::RenderThreadDied => None,
        }
    }
}

impl From<AudioError> for StartError {
    fn from(err: AudioError) -> Self {
        StartError::Audio(err)
    }
}

/// Tunables for the planning loop.
#[derive(Clone, Copy, Debug)]
pub struct SchedulerConfig {
    /// How often the planning loop wakes to look ahead.
    pub wake_interval: Duration,
    /// Seeds humanization and noise synthesis.
    pub seed: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            wake_interval: Duration::from_millis(25),
            seed: rand::random(),
        }
    }
}

/// Parse a provider descriptor payload (camelCase JSON).
///
/// The result is not yet range-checked; `Controller::set_track`
/// sanitizes on intake.
pub fn parse_descriptor(json: &str) -> serde_json::Result<TrackDescriptor> {
    serde_json::from_str(json)
}

/// The stream's control surface. One instance per stream; drop it to
/// shut everything down.
pub struct Controller {
    config: SchedulerConfig,
    output_factory: OutputFactory,
    sequencer: Arc<Mutex<Sequencer>>,
    /// Requested bed levels, kept so a stream brought up later starts
    /// from the mix the caller already dialed in.
    ambient: [f32; 4],
    analyzer: SpectrumAnalyzer,
    stream: Option<StreamHandle>,
    scheduler: Option<SchedulerHandle>,
}

struct StreamHandle {
    shutdown: Arc<AtomicBool>,
    clock_samples: Arc<AtomicU64>,
    sample_rate: u32,
    inbox: Arc<Mutex<HeapProd<Event>>>,
    tap: HeapCons<f32>,
    thread: Option<JoinHandle<()>>,
}

impl StreamHandle {
    fn now(&self) -> ClockTime {
        ClockTime::from_samples(self.clock_samples.load(Ordering::Relaxed), self.sample_rate)
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

struct SchedulerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Controller {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self::with_output_factory(config, cpal_factory())
    }

    /// Build against a specific audio sink instead of the default
    /// cpal device. Used by tests and alternate backends.
    pub fn with_output_factory(config: SchedulerConfig, output_factory: OutputFactory) -> Self {
        Self {
            config,
            output_factory,
            sequencer: Arc::new(Mutex::new(Sequencer::new())),
            ambient: [0.0; 4],
            analyzer: SpectrumAnalyzer::new(),
            stream: None,
            scheduler: None,
        }
    }

    // --- Track management ---

    /// Install a new track. The phrase restarts from step 0; the
    /// master filter glides to the track's cutoff. Works whether or
    /// not the stream is running.
    pub fn set_track(&mut self, descriptor: TrackDescriptor) {
        let descriptor = descriptor.sanitized();
        let cutoff = descriptor.filter_cutoff;
        lock(&self.sequencer).set_track(descriptor);
        self.post(Event::immediate(EventPayload::SetFilterCutoff(cutoff)));
    }

    /// The installed track, after intake sanitization.
    pub fn descriptor(&self) -> Option<TrackDescriptor> {
        lock(&self.sequencer).descriptor().cloned()
    }

    /// Current phrase position, 0..128.
    pub fn current_step(&self) -> u32 {
        lock(&self.sequencer).clock().step()
    }

    // --- Playback ---

    /// Bring up the stream (first call only) and start the planning
    /// loop. Idempotent: a second call while running does nothing.
    pub fn start(&mut self) -> Result<(), StartError> {
        self.ensure_stream()?;
        if self.scheduler.is_some() {
            return Ok(());
        }
        let stream = self.stream.as_ref().ok_or(StartError::RenderThreadDied)?;

        // Re-anchor so a resumed stream never replays the stopped gap.
        lock(&self.sequencer).begin(stream.now());

        let stop = Arc::new(AtomicBool::new(false));
        let thread = {
            let sequencer = self.sequencer.clone();
            let inbox = stream.inbox.clone();
            let clock_samples = stream.clock_samples.clone();
            let sample_rate = stream.sample_rate;
            let stop = stop.clone();
            let wake_interval = self.config.wake_interval;
            let seed = self.config.seed ^ PLANNER_SEED_SALT;
            std::thread::spawn(move || {
                scheduler_thread(
                    sequencer,
                    inbox,
                    clock_samples,
                    sample_rate,
                    stop,
                    wake_interval,
                    seed,
                )
            })
        };
        self.scheduler = Some(SchedulerHandle {
            stop,
            thread: Some(thread),
        });
        Ok(())
    }

    /// Halt the planning loop. Sounds already dispatched, the vinyl
    /// bed, and the ambient layers keep playing. Idempotent.
    pub fn stop(&mut self) {
        self.scheduler = None;
    }

    /// Whether the planning loop is running.
    pub fn is_started(&self) -> bool {
        self.scheduler.is_some()
    }

    /// Device rate, once the stream exists.
    pub fn sample_rate(&self) -> Option<u32> {
        self.stream.as_ref().map(|s| s.sample_rate)
    }

    // --- Ambient mixer ---

    /// Retarget one ambient bed's level. The engine glides there over
    /// ~0.2 s; levels persist across track changes and stream startup.
    pub fn set_ambient_volume(&mut self, layer: AmbientLayer, level: f32) {
        let level = level.clamp(0.0, 1.0);
        self.ambient[layer.index()] = level;
        self.post(Event::immediate(EventPayload::SetAmbientLevel {
            layer,
            level,
        }));
    }

    /// The last requested level for a bed.
    pub fn ambient_volume(&self, layer: AmbientLayer) -> f32 {
        self.ambient[layer.index()]
    }

    // --- Narration ---

    /// Decode and play a spoken intro over the stream. Malformed or
    /// empty payloads are a silent no-op; a valid clip replaces any
    /// intro still playing.
    pub fn play_intro(&mut self, base64_payload: &str) -> Result<(), StartError> {
        let Some(clip) = intro::decode_intro(base64_payload) else {
            return Ok(());
        };
        self.ensure_stream()?;
        self.post(Event::immediate(EventPayload::PlayIntro(clip)));
        Ok(())
    }

    // --- Visualizer ---

    /// The current 128-byte energy spectrum, or empty before the
    /// stream exists. Safe to poll every animation frame.
    pub fn get_energy_snapshot(&mut self) -> Vec<u8> {
        let Some(stream) = self.stream.as_mut() else {
            return Vec::new();
        };
        let mut chunk = Vec::new();
        while let Some(sample) = stream.tap.try_pop() {
            chunk.push(sample);
        }
        self.analyzer.push(&chunk);
        self.analyzer.snapshot()
    }

    // --- Internals ---

    /// Build the render thread and cpal stream, exactly once.
    fn ensure_stream(&mut self) -> Result<(), StartError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let (inbox_prod, inbox_cons) = HeapRb::<Event>::new(INBOX_CAPACITY).split();
        let (tap_prod, tap_cons) = HeapRb::<f32>::new(TAP_CAPACITY).split();
        let shutdown = Arc::new(AtomicBool::new(false));
        let clock_samples = Arc::new(AtomicU64::new(0));
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let thread = {
            let factory = self.output_factory.clone();
            let shutdown = shutdown.clone();
            let clock_samples = clock_samples.clone();
            let seed = self.config.seed;
            std::thread::spawn(move || {
                render_thread(
                    factory,
                    inbox_cons,
                    tap_prod,
                    shutdown,
                    clock_samples,
                    ready_tx,
                    seed,
                )
            })
        };

        let sample_rate = match ready_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(err)) => {
                let _ = thread.join();
                return Err(err.into());
            }
            Err(_) => {
                let _ = thread.join();
                return Err(StartError::RenderThreadDied);
            }
        };

        self.stream = Some(StreamHandle {
            shutdown,
            clock_samples,
            sample_rate,
            inbox: Arc::new(Mutex::new(inbox_prod)),
            tap: tap_cons,
            thread: Some(thread),
        });

        // Replay state dialed in before the graph existed.
        if let Some(descriptor) = self.descriptor() {
            self.post(Event::immediate(EventPayload::SetFilterCutoff(
                descriptor.filter_cutoff,
            )));
        }
        for layer in AmbientLayer::ALL {
            let level = self.ambient[layer.index()];
            if level > 0.0 {
                self.post(Event::immediate(EventPayload::SetAmbientLevel {
                    layer,
                    level,
                }));
            }
        }
        Ok(())
    }

    /// Offer an event to the engine; silently dropped when the stream
    /// is not up or the inbox is full.
    fn post(&self, event: Event) {
        if let Some(stream) = &self.stream {
            let _ = lock(&stream.inbox).try_push(event);
        }
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        // Scheduler before stream: the planner must not outlive the
        // clock it reads.
        self.scheduler = None;
        self.stream = None;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn render_thread(
    factory: OutputFactory,
    mut inbox: HeapCons<Event>,
    mut tap: HeapProd<f32>,
    shutdown: Arc<AtomicBool>,
    clock_samples: Arc<AtomicU64>,
    ready: mpsc::SyncSender<Result<u32, AudioError>>,
    seed: u64,
) {
    let mut output = match factory() {
        Ok(output) => output,
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };
    if let Err(err) = output.start() {
        let _ = ready.send(Err(err));
        return;
    }
    let sample_rate = output.sample_rate();
    let _ = ready.send(Ok(sample_rate));

    let mut engine = Engine::new(EngineConfig { sample_rate, seed });
    while !shutdown.load(Ordering::Relaxed) {
        while let Some(event) = inbox.try_pop() {
            engine.schedule(event);
        }
        let frame = engine.render_frame();
        // Overflow means nobody is polling the visualizer; drop.
        let _ = tap.try_push(engine.tap_level());
        clock_samples.store(engine.clock_samples(), Ordering::Relaxed);
        if !push_frame(output.as_mut(), frame, &shutdown) {
            break;
        }
    }
    let _ = output.stop();
}

/// Offer one frame, spinning while the device ring is full. The ring
/// paces the render loop to the hardware clock. Returns false when
/// shutdown was raised mid-spin.
fn push_frame(output: &mut dyn AudioOutput, frame: Frame, shutdown: &AtomicBool) -> bool {
    let mut frame = frame;
    loop {
        match output.try_write(frame) {
            Ok(()) => return true,
            Err(back) => {
                if shutdown.load(Ordering::Relaxed) {
                    return false;
                }
                frame = back;
                std::hint::spin_loop();
            }
        }
    }
}

fn scheduler_thread(
    sequencer: Arc<Mutex<Sequencer>>,
    inbox: Arc<Mutex<HeapProd<Event>>>,
    clock_samples: Arc<AtomicU64>,
    sample_rate: u32,
    stop: Arc<AtomicBool>,
    wake_interval: Duration,
    seed: u64,
) {
    let mut rng = Pcg32::seed_from_u64(seed);
    let mut planned = Vec::with_capacity(16);
    while !stop.load(Ordering::Relaxed) {
        let now = ClockTime::from_samples(clock_samples.load(Ordering::Relaxed), sample_rate);
        lock(&sequencer).drain_window(now, &mut rng, &mut planned);
        if !planned.is_empty() {
            let mut inbox = lock(&inbox);
            for event in planned.drain(..) {
                // An overfull inbox sheds this wake's events; the
                // loop itself always re-arms.
                let _ = inbox.try_push(event);
            }
        }
        std::thread::sleep(wake_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The default factory needs an audio device, so lifecycle tests
    // run against a mock sink injected through
    // `Controller::with_output_factory`. The mock records every frame
    // and paces itself to roughly real time, which keeps the planner's
    // look-ahead window and the render clock aligned the way the
    // hardware ring would.

    const MOCK_RATE: u32 = 8_000;

    struct MockOutput {
        sample_rate: u32,
        frames: Arc<Mutex<Vec<Frame>>>,
        written: usize,
    }

    impl AudioOutput for MockOutput {
        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn try_write(&mut self, frame: Frame) -> Result<(), Frame> {
            lock(&self.frames).push(frame);
            self.written += 1;
            if self.written % (self.sample_rate as usize / 100) == 0 {
                std::thread::sleep(Duration::from_millis(10));
            }
            Ok(())
        }

        fn start(&mut self) -> Result<(), AudioError> {
            Ok(())
        }

        fn stop(&mut self) -> Result<(), AudioError> {
            Ok(())
        }
    }

    fn mock_controller(seed: u64) -> (Controller, Arc<Mutex<Vec<Frame>>>) {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let factory: OutputFactory = {
            let frames = frames.clone();
            Arc::new(move || {
                Ok(Box::new(MockOutput {
                    sample_rate: MOCK_RATE,
                    frames: frames.clone(),
                    written: 0,
                }) as Box<dyn AudioOutput>)
            })
        };
        let config = SchedulerConfig {
            wake_interval: Duration::from_millis(25),
            seed,
        };
        (Controller::with_output_factory(config, factory), frames)
    }

    fn scheduler_thread_id(ctrl: &Controller) -> std::thread::ThreadId {
        let handle = ctrl.scheduler.as_ref().unwrap();
        handle.thread.as_ref().unwrap().thread().id()
    }

    fn render_thread_id(ctrl: &Controller) -> std::thread::ThreadId {
        let stream = ctrl.stream.as_ref().unwrap();
        stream.thread.as_ref().unwrap().thread().id()
    }

    #[test]
    fn fresh_controller_has_nothing_to_report() {
        let mut ctrl = Controller::new();
        assert!(!ctrl.is_started());
        assert!(ctrl.descriptor().is_none());
        assert_eq!(ctrl.current_step(), 0);
        assert!(ctrl.get_energy_snapshot().is_empty());
        assert_eq!(ctrl.sample_rate(), None);
    }

    #[test]
    fn set_track_sanitizes_on_intake() {
        let mut ctrl = Controller::new();
        ctrl.set_track(TrackDescriptor {
            bpm: 200.0,
            melody_complexity: -1.0,
            ..TrackDescriptor::default()
        });
        let d = ctrl.descriptor().unwrap();
        assert_eq!(d.bpm, 85.0);
        assert_eq!(d.melody_complexity, 0.0);
        assert_eq!(ctrl.current_step(), 0);
    }

    #[test]
    fn empty_intro_is_a_no_op_and_starts_nothing() {
        let mut ctrl = Controller::new();
        assert!(ctrl.play_intro("").is_ok());
        assert!(ctrl.play_intro("@@not base64@@").is_ok());
        // No stream was brought up for a payload that can't play.
        assert!(ctrl.get_energy_snapshot().is_empty());
    }

    #[test]
    fn stop_before_start_is_harmless() {
        let mut ctrl = Controller::new();
        ctrl.stop();
        ctrl.stop();
        assert!(!ctrl.is_started());
    }

    #[test]
    fn ambient_levels_clamp_and_persist() {
        let mut ctrl = Controller::new();
        ctrl.set_ambient_volume(AmbientLayer::Rain, 3.0);
        ctrl.set_ambient_volume(AmbientLayer::Birds, -0.5);
        assert_eq!(ctrl.ambient_volume(AmbientLayer::Rain), 1.0);
        assert_eq!(ctrl.ambient_volume(AmbientLayer::Birds), 0.0);
        ctrl.set_track(TrackDescriptor::default());
        assert_eq!(ctrl.ambient_volume(AmbientLayer::Rain), 1.0);
    }

    #[test]
    fn provider_json_parses_with_defaults_for_missing_fields() {
        let json = r#"{
            "name": "Night Drive",
            "artist": "Gemini AI",
            "bpm": 76,
            "mood": "Chill & Relaxed",
            "scaleType": "minor",
            "chordProgression": ["Am7", "Fmaj7", "Cmaj7", "G7"],
            "filterCutoff": 1400,
            "melodyComplexity": 0.35,
            "unknownFutureField": true
        }"#;
        let d = parse_descriptor(json).unwrap();
        assert_eq!(d.name, "Night Drive");
        assert_eq!(d.bpm, 76.0);
        assert_eq!(d.scale_type, ScaleType::Minor);
        assert_eq!(d.chord_progression.len(), 4);
        // Missing fields fall back to defaults.
        assert_eq!(d.reverb_wet, 0.3);
        assert!(d.intro_text.is_empty());
    }

    #[test]
    fn broken_provider_json_is_an_error_not_a_panic() {
        assert!(parse_descriptor("{").is_err());
        assert!(parse_descriptor(r#"{"bpm": "fast"}"#).is_err());
    }

    #[test]
    fn starting_twice_keeps_a_single_planner() {
        let (mut ctrl, frames) = mock_controller(11);
        ctrl.set_track(MoodPreset::Chill.descriptor());
        ctrl.start().unwrap();
        let planner = scheduler_thread_id(&ctrl);
        ctrl.start().unwrap();
        assert_eq!(scheduler_thread_id(&ctrl), planner);

        // Let the phrase open. Two planners seeded alike would stack
        // every note at the same timestamp, so a doubled bar-1 kick
        // would push the peak past a single kick's ceiling.
        std::thread::sleep(Duration::from_millis(400));
        ctrl.stop();
        let peak = lock(&frames)
            .iter()
            .map(|f| f.left.abs().max(f.right.abs()))
            .fold(0.0f32, f32::max);
        assert!(peak > 0.1, "no kick landed, peak {peak}");
        assert!(peak < 0.55, "doubled notes, peak {peak}");
    }

    #[test]
    fn stop_then_start_reuses_the_stream() {
        let (mut ctrl, _frames) = mock_controller(7);
        ctrl.set_track(MoodPreset::Chill.descriptor());
        ctrl.start().unwrap();
        let render = render_thread_id(&ctrl);
        let clock = ctrl.stream.as_ref().unwrap().clock_samples.clone();

        ctrl.stop();
        assert!(!ctrl.is_started());
        ctrl.start().unwrap();
        assert!(ctrl.is_started());

        // Same render thread, same clock: the stream graph survived
        // the stop and was not rebuilt.
        assert_eq!(render_thread_id(&ctrl), render);
        assert!(Arc::ptr_eq(
            &clock,
            &ctrl.stream.as_ref().unwrap().clock_samples
        ));
        assert_eq!(ctrl.sample_rate(), Some(MOCK_RATE));
    }

    #[test]
    fn failing_sink_surfaces_as_a_start_error() {
        let factory: OutputFactory = Arc::new(|| Err(AudioError::NoDevice));
        let config = SchedulerConfig {
            wake_interval: Duration::from_millis(25),
            seed: 3,
        };
        let mut ctrl = Controller::with_output_factory(config, factory);
        match ctrl.start() {
            Err(StartError::Audio(AudioError::NoDevice)) => {}
            other => panic!("expected a device error, got {other:?}"),
        }
        assert!(!ctrl.is_started());
        assert!(ctrl.get_energy_snapshot().is_empty());
    }
}
