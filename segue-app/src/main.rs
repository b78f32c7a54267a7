//! Segue - automatic DJ transitions
//!
//! Runs the transition controller against a simulated two-deck mixer:
//! tracks play out, the queue loads the next one, and the controller
//! syncs, fades and skips as it would in a live set.
//!
//! Usage: `segue [seconds]` (default 60). Log level via `RUST_LOG`.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use segue_analysis::{CamelotKey, MusicalKey};
use segue_engine::{AutoDjConfig, Control, DeckId, Group, MemoryBus, ParamBus, Runtime, RuntimeHandle};

/// Simulation step
const STEP: Duration = Duration::from_millis(50);
/// Play position gained per step (a track lasts 20 s)
const POSITION_STEP: f64 = 0.0025;
/// Leading deck position at which the incoming deck starts
const FADE_START: f64 = 0.8;
/// Crossfader travel per step (full sweep in 2 s)
const CROSSFADER_STEP: f64 = 0.05;
/// Minimum time a queued track waits before it may start
const CUE_DELAY: Duration = Duration::from_millis(1500);
/// Steps between beat pulses on the leading deck
const BEAT_STEPS: u64 = 10;

#[derive(Debug, Clone, Copy)]
struct Track {
    title: &'static str,
    bpm: f64,
    key: u8,
}

impl Track {
    fn camelot(&self) -> String {
        MusicalKey::from_code(self.key)
            .map(|key| CamelotKey::from(key).display())
            .unwrap_or_else(|| "?".to_string())
    }
}

const PLAYLIST: &[Track] = &[
    Track { title: "Opening Set", bpm: 122.0, key: 13 },
    Track { title: "Harbour Lights", bpm: 124.0, key: 20 },
    Track { title: "Double Time", bpm: 174.0, key: 15 },
    Track { title: "Halfway There", bpm: 63.0, key: 8 },
    Track { title: "Night Drive", bpm: 126.0, key: 22 },
    Track { title: "Unknown Tempo", bpm: 0.0, key: 5 },
    Track { title: "Slow Burn", bpm: 118.0, key: 1 },
    Track { title: "Peak Hour", bpm: 128.0, key: 17 },
];

/// Parameter bus shared between the controller thread and the simulation
#[derive(Clone, Default)]
struct SharedBus(Arc<Mutex<MemoryBus>>);

impl ParamBus for SharedBus {
    fn get(&self, group: Group, control: Control) -> f64 {
        self.0.lock().get(group, control)
    }

    fn set(&mut self, group: Group, control: Control, value: f64) {
        self.0.lock().set(group, control, value);
    }

    fn trigger(&mut self, group: Group, control: Control) {
        self.0.lock().trigger(group, control);
    }
}

/// The host side: two decks, a crossfader and the auto-DJ queue
struct Mixer {
    bus: SharedBus,
    queue: Vec<Track>,
    next: usize,
    cued_at: Instant,
    steps: u64,
}

impl Mixer {
    fn new(bus: SharedBus) -> Self {
        Self {
            bus,
            queue: PLAYLIST.to_vec(),
            next: 0,
            cued_at: Instant::now(),
            steps: 0,
        }
    }

    fn load_next(&mut self, deck: DeckId) {
        let track = self.queue[self.next % self.queue.len()];
        self.next += 1;
        self.bus.0.lock().load_deck(deck, track.bpm, track.key);
        self.cued_at = Instant::now();
        tracing::info!(
            "{:?} loaded \"{}\" ({} BPM, {})",
            deck,
            track.title,
            track.bpm,
            track.camelot()
        );
    }

    /// Rotate the rest of the queue; the host shuffles, we keep it reproducible
    fn shuffle(&mut self) {
        let len = self.queue.len();
        if len > 1 {
            self.queue.rotate_left(len / 2);
            tracing::info!("Queue shuffled");
        }
    }

    /// Deck that has been playing longest
    fn leading(&self) -> DeckId {
        let pos_a = self.bus.get(Group::Deck(DeckId::A), Control::PlayPosition);
        let pos_b = self.bus.get(Group::Deck(DeckId::B), Control::PlayPosition);
        if pos_b > pos_a {
            DeckId::B
        } else {
            DeckId::A
        }
    }

    fn start(&mut self) {
        self.load_next(DeckId::A);
        let mut bus = self.bus.0.lock();
        bus.preset(Group::Deck(DeckId::A), Control::Playing, 1.0);
        bus.preset(Group::Deck(DeckId::A), Control::PlayPosition, POSITION_STEP);
        drop(bus);
        self.load_next(DeckId::B);
    }

    fn step(&mut self) {
        self.steps += 1;

        let triggers = self.bus.0.lock().take_triggers();
        let leading = self.leading();
        let incoming = leading.other();
        for (group, control) in triggers {
            match (group, control) {
                (Group::AutoDj, Control::SkipNext) => self.load_next(incoming),
                (Group::AutoDj, Control::ShufflePlaylist) => self.shuffle(),
                _ => {}
            }
        }

        let lead = Group::Deck(leading);
        let inc = Group::Deck(incoming);
        let mut bus = self.bus.0.lock();

        let beat = if self.steps % BEAT_STEPS == 0 { 1.0 } else { 0.0 };
        bus.preset(lead, Control::BeatPulse, beat);

        let lead_pos = bus.get(lead, Control::PlayPosition);
        bus.preset(lead, Control::PlayPosition, (lead_pos + POSITION_STEP).min(1.0));

        let incoming_playing = bus.get(inc, Control::Playing) != 0.0;
        if incoming_playing {
            let inc_pos = bus.get(inc, Control::PlayPosition);
            bus.preset(inc, Control::PlayPosition, inc_pos + POSITION_STEP);
        } else if lead_pos >= FADE_START && self.cued_at.elapsed() >= CUE_DELAY {
            tracing::info!("Starting fade into {:?}", incoming);
            bus.preset(inc, Control::Playing, 1.0);
            bus.preset(inc, Control::PlayPosition, POSITION_STEP);
        }

        if !incoming_playing {
            bus.clear_writes();
            return;
        }

        let target = match incoming {
            DeckId::A => -1.0,
            DeckId::B => 1.0,
        };
        let crossfader = bus.get(Group::Master, Control::Crossfader);
        let moved = if target > crossfader {
            (crossfader + CROSSFADER_STEP).min(target)
        } else {
            (crossfader - CROSSFADER_STEP).max(target)
        };
        bus.preset(Group::Master, Control::Crossfader, moved);
        bus.clear_writes();

        if moved == target {
            // Fade done: the old deck stops and takes the next track
            bus.preset(lead, Control::Playing, 0.0);
            bus.preset(lead, Control::PlayPosition, 0.0);
            drop(bus);
            tracing::info!("Fade into {:?} complete", incoming);
            self.load_next(leading);
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let seconds = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<u64>()?,
        None => 60,
    };

    let config = AutoDjConfig::load();
    if !AutoDjConfig::config_path().exists() {
        // Leave a file with every key in it for tuning
        if let Err(e) = config.save() {
            tracing::warn!("Could not write default configuration: {}", e);
        }
    }
    tracing::info!(
        path = %AutoDjConfig::config_path().display(),
        sync_fade = config.sync_fade.as_str(),
        max_bpm_adjustment = config.max_bpm_adjustment,
        "Configuration loaded"
    );

    let bus = SharedBus::default();
    let (runtime, handle) = Runtime::new(bus.clone(), config);
    let controller_handle = thread::Builder::new()
        .name("segue-controller".into())
        .spawn(move || runtime.run())?;

    let mut mixer = Mixer::new(bus.clone());
    mixer.start();
    enable(&bus, &handle, true);

    let deadline = Instant::now() + Duration::from_secs(seconds);
    while Instant::now() < deadline && !handle.is_shutdown() {
        mixer.step();
        thread::sleep(STEP);
    }

    enable(&bus, &handle, false);
    handle.shutdown();
    if controller_handle.join().is_err() {
        anyhow::bail!("controller thread panicked");
    }
    tracing::info!("Done");
    Ok(())
}

/// Flip the auto-DJ switch the way the host would: value first, then signal
fn enable(bus: &SharedBus, handle: &RuntimeHandle, enabled: bool) {
    let value = if enabled { 1.0 } else { 0.0 };
    bus.0.lock().preset(Group::AutoDj, Control::Enabled, value);
    if !handle.set_enabled(enabled) {
        tracing::warn!("Controller did not receive the auto-DJ switch");
    }
}
