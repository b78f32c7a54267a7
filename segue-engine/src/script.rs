//! Controller lifecycle - start/stop hooks and the auto-DJ enable switch

use crate::bus::{Control, DeckId, Group, ParamBus};
use crate::config::AutoDjConfig;
use crate::controller::{Controller, Tick};
use crate::host::{ConnectionId, SignalSource, Timer, TimerId};

/// The transition controller as the host sees it
///
/// The tick timer only runs while auto-DJ is enabled. If the host won't
/// let us follow the enable switch, the timer runs for the whole session.
pub struct AutoDjScript {
    controller: Controller,
    timer: Option<TimerId>,
    connection: Option<ConnectionId>,
}

impl AutoDjScript {
    pub fn new(config: AutoDjConfig) -> Self {
        Self {
            controller: Controller::new(config),
            timer: None,
            connection: None,
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Whether the tick timer is running
    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Whether the enable switch is being followed
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Host start hook
    pub fn on_start<B, T, S>(&mut self, bus: &mut B, timer: &mut T, signals: &mut S)
    where
        B: ParamBus + ?Sized,
        T: Timer + ?Sized,
        S: SignalSource + ?Sized,
    {
        prepare_decks(bus);

        match signals.connect(Group::AutoDj, Control::Enabled) {
            Some(id) => {
                tracing::info!("Following {} {}", Group::AutoDj, Control::Enabled);
                self.connection = Some(id);
                // Pick up the switch's current position
                let enabled = bus.get(Group::AutoDj, Control::Enabled);
                self.on_signal(enabled, timer);
            }
            None => {
                tracing::warn!(
                    "Could not connect to {} {}, running permanently",
                    Group::AutoDj,
                    Control::Enabled
                );
                self.start_timer(timer);
            }
        }
    }

    /// Auto-DJ enable switch changed
    pub fn on_signal<T: Timer + ?Sized>(&mut self, value: f64, timer: &mut T) {
        if value != 0.0 {
            self.start_timer(timer);
        } else if let Some(id) = self.timer.take() {
            timer.stop(id);
            tracing::info!("Auto-DJ disabled, controller paused");
        }
    }

    /// A timer fired; ticks the controller if it is our current timer
    pub fn on_timer<B: ParamBus + ?Sized>(&mut self, id: TimerId, bus: &mut B) -> Option<Tick> {
        if self.timer != Some(id) {
            return None;
        }
        let tick = self.controller.tick(bus);
        tracing::trace!(?tick, "Tick");
        Some(tick)
    }

    /// Host stop hook
    pub fn on_stop<T, S>(&mut self, timer: &mut T, signals: &mut S)
    where
        T: Timer + ?Sized,
        S: SignalSource + ?Sized,
    {
        if let Some(id) = self.connection.take() {
            if !signals.disconnect(id) {
                tracing::warn!("Failed to disconnect from {} {}", Group::AutoDj, Control::Enabled);
            }
        }
        if let Some(id) = self.timer.take() {
            timer.stop(id);
        }
        tracing::info!("Controller stopped");
    }

    fn start_timer<T: Timer + ?Sized>(&mut self, timer: &mut T) {
        if self.timer.is_some() {
            return;
        }
        let interval = self.controller.config().tick_interval();
        self.timer = timer.begin(interval);
        match self.timer {
            Some(_) => tracing::info!(?interval, "Controller running"),
            None => tracing::warn!("Host refused to start the tick timer"),
        }
    }
}

/// Deck setup the transitions rely on
///
/// Quantized beats and keylock on both decks; crossfader all the way to
/// deck A, assuming both decks start out empty.
fn prepare_decks<B: ParamBus + ?Sized>(bus: &mut B) {
    for deck in [DeckId::A, DeckId::B] {
        let group = Group::Deck(deck);
        bus.set(group, Control::Quantize, 1.0);
        bus.set(group, Control::Keylock, 1.0);
        bus.set(group, Control::KeylockMode, 0.0);
    }
    bus.set(Group::Master, Control::Crossfader, -1.0);
}
