//! Periodic transition controller
//!
//! One [`Controller::tick`] per timer period. Each tick reads both decks,
//! works out which one is leading, and then either drives the running
//! fade (tempo sync, key transplant, EQ taper, quick effect sweep) or,
//! while nothing is fading, judges the queued track.

use segue_analysis::{convergence_target, is_known_bpm, MusicalKey};

use crate::bus::{Control, DeckId, Group, ParamBus};
use crate::config::AutoDjConfig;
use crate::crossfade::{fade_progress, taper_low, ToneFade};
use crate::deck::{assign_roles, DeckSnapshot, Roles};
use crate::selection::{Selector, Verdict};
use crate::sync::{ease_tempo, SyncMachine, DISENGAGE_PROGRESS};

/// Where the current transition stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The incoming deck is playing: a fade is in progress
    Fading,
    /// The incoming deck is stopped: its track is still up for selection
    Selecting,
}

impl Phase {
    /// Classify from the incoming deck
    ///
    /// A deck can report playing before it has moved at all (e.g. while
    /// its track is still being analysed); that counts as not playing.
    pub fn of(incoming: &DeckSnapshot) -> Self {
        if incoming.playing && incoming.position > 0.0 {
            Phase::Fading
        } else {
            Phase::Selecting
        }
    }
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    Faded { progress: f64 },
    /// Selection pass skipped to keep the decision rate down
    Waiting,
    Selected(Verdict),
}

/// Snapshot of the controller's transition state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionState {
    pub syncing: bool,
    pub skip_count: u32,
    pub bpm_tolerance: f64,
    pub refine_wait_ticks: u64,
}

pub struct Controller {
    config: AutoDjConfig,
    sync: SyncMachine,
    selector: Selector,
    /// Ticks since the last selection pass
    refine_wait: u64,
}

impl Controller {
    /// Create a controller; an invalid config is replaced by the defaults
    pub fn new(config: AutoDjConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                tracing::warn!("Invalid configuration ({}), using defaults", e);
                AutoDjConfig::default()
            }
        };
        let selector = Selector::new(&config);
        Self {
            config,
            sync: SyncMachine::new(),
            selector,
            refine_wait: 0,
        }
    }

    pub fn config(&self) -> &AutoDjConfig {
        &self.config
    }

    pub fn state(&self) -> TransitionState {
        TransitionState {
            syncing: self.sync.is_syncing(),
            skip_count: self.selector.skip_count(),
            bpm_tolerance: self.selector.bpm_tolerance(),
            refine_wait_ticks: self.refine_wait,
        }
    }

    /// Run one control period against the mixer
    pub fn tick<B: ParamBus + ?Sized>(&mut self, bus: &mut B) -> Tick {
        let deck_a = DeckSnapshot::read(&*bus, DeckId::A);
        let deck_b = DeckSnapshot::read(&*bus, DeckId::B);
        let roles = assign_roles(deck_a.position, deck_b.position);
        let (leading, incoming) = match roles.leading {
            DeckId::A => (deck_a, deck_b),
            DeckId::B => (deck_b, deck_a),
        };

        match Phase::of(&incoming) {
            Phase::Fading => {
                let progress = self.fade(bus, roles, &leading, &incoming);
                Tick::Faded { progress }
            }
            Phase::Selecting => {
                if !self.refine_due() {
                    return Tick::Waiting;
                }
                Tick::Selected(self.select(bus, roles, &leading, &incoming))
            }
        }
    }

    /// Debounce for the selection pass
    ///
    /// Lets one pass through per `refine_duration_ms`, whatever the tick rate.
    fn refine_due(&mut self) -> bool {
        if self.refine_wait * self.config.tick_interval_ms < self.config.refine_duration_ms {
            self.refine_wait += 1;
            false
        } else {
            self.refine_wait = 0;
            true
        }
    }

    fn fade<B: ParamBus + ?Sized>(
        &mut self,
        bus: &mut B,
        roles: Roles,
        leading: &DeckSnapshot,
        incoming: &DeckSnapshot,
    ) -> f64 {
        let leading_group = Group::Deck(roles.leading);
        let incoming_group = Group::Deck(roles.incoming);

        if self.config.low_change_rate > 0.0 {
            let low = bus.get(leading_group, Control::LowFilter);
            bus.set(leading_group, Control::LowFilter, taper_low(low, self.config.low_change_rate));
            bus.set(incoming_group, Control::LowFilter, 1.0);
        }

        let progress = fade_progress(bus.get(Group::Master, Control::Crossfader), roles.incoming);
        let on_beat = bus.is_set(leading_group, Control::BeatPulse);

        if self.config.bpm_sync {
            if let Some(event) = self.sync.advance(progress, roles, self.config.sync_fade, on_beat) {
                tracing::info!(?event, progress, "Tempo sync");
                event.apply(bus);
            }

            // Nothing to converge on until both tracks are analysed
            if self.config.gradual_sync()
                && self.sync.is_syncing()
                && is_known_bpm(leading.bpm)
                && is_known_bpm(incoming.bpm)
            {
                let current = bus.get(leading_group, Control::LiveBpm);
                let desired = convergence_target(leading.bpm, incoming.bpm);
                bus.set(leading_group, Control::LiveBpm, ease_tempo(current, desired, progress));
            }
        }

        // Key moves over late, on a beat, once per transition
        if self.config.adjust_key
            && progress > DISENGAGE_PROGRESS
            && on_beat
            && MusicalKey::from_param(incoming.key).is_some()
            && bus.get(leading_group, Control::Key) != incoming.key
        {
            tracing::debug!(deck = ?roles.leading, key = incoming.key, "Transplanting key");
            bus.set(leading_group, Control::Key, incoming.key);
        }

        if self.config.fade_quick_effect {
            let tone = ToneFade::at(
                progress,
                self.config.fade_range,
                self.config.reverse_quick_effect,
            );
            bus.set(Group::QuickEffect(roles.leading), Control::ToneKnob, tone.leading);
            bus.set(Group::QuickEffect(roles.incoming), Control::ToneKnob, tone.incoming);
        }

        progress
    }

    fn select<B: ParamBus + ?Sized>(
        &mut self,
        bus: &mut B,
        roles: Roles,
        leading: &DeckSnapshot,
        incoming: &DeckSnapshot,
    ) -> Verdict {
        let leading_group = Group::Deck(roles.leading);

        // Drop residual tempo offset left over from easing
        if self.config.gradual_sync() && is_known_bpm(leading.bpm) {
            bus.set(leading_group, Control::LiveBpm, leading.bpm);
        }

        if self.sync.abort(bus) {
            tracing::warn!("Transition ended before sync was released, sync modes cleared");
        }

        if self.config.fade_quick_effect {
            let parked = ToneFade::parked(self.config.fade_range);
            bus.set(Group::QuickEffect(roles.incoming), Control::ToneKnob, parked.incoming);
            bus.set(Group::QuickEffect(roles.leading), Control::ToneKnob, parked.leading);
        }

        self.selector
            .decide(bus, &self.config, roles, leading, incoming)
    }
}
