//! Standalone host: thread-backed timers and an event loop driving an
//! [`AutoDjScript`] against a parameter bus
//!
//! Every timer runs on its own thread and only posts [`HostEvent::Tick`]
//! onto the runtime's channel. The runtime thread handles one event at a
//! time, so controller ticks are strictly sequential.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::bus::{Control, Group, ParamBus};
use crate::config::AutoDjConfig;
use crate::host::{ConnectionId, SignalSource, Timer, TimerId};
use crate::script::AutoDjScript;

/// How long the event loop blocks before rechecking the shutdown flag
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Events delivered to the runtime thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    Tick(TimerId),
    /// A control changed value
    Signal {
        group: Group,
        control: Control,
        value: f64,
    },
    Shutdown,
}

/// Repeating timers, one sleeper thread each
pub struct ThreadTimer {
    events: Sender<HostEvent>,
    next_id: u64,
    running: HashMap<TimerId, Arc<AtomicBool>>,
}

impl ThreadTimer {
    pub fn new(events: Sender<HostEvent>) -> Self {
        Self {
            events,
            next_id: 0,
            running: HashMap::new(),
        }
    }

    pub fn active(&self) -> usize {
        self.running.len()
    }
}

impl Timer for ThreadTimer {
    fn begin(&mut self, interval: Duration) -> Option<TimerId> {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_thread = stop.clone();
        let events = self.events.clone();

        let spawned = thread::Builder::new()
            .name(format!("segue-timer-{}", id.0))
            .spawn(move || loop {
                thread::sleep(interval);
                if stop_thread.load(Ordering::Relaxed) {
                    break;
                }
                match events.try_send(HostEvent::Tick(id)) {
                    // A backed-up loop just misses a tick
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Disconnected(_)) => break,
                }
            });

        match spawned {
            Ok(_) => {
                self.running.insert(id, stop);
                Some(id)
            }
            Err(e) => {
                tracing::error!("Failed to spawn timer thread: {}", e);
                None
            }
        }
    }

    fn stop(&mut self, id: TimerId) {
        if let Some(flag) = self.running.remove(&id) {
            flag.store(true, Ordering::Relaxed);
        }
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        for flag in self.running.values() {
            flag.store(true, Ordering::Relaxed);
        }
    }
}

/// Connection table for signals arriving as [`HostEvent::Signal`]
#[derive(Debug, Default)]
pub struct ChannelSignals {
    next_id: u64,
    connections: HashMap<ConnectionId, (Group, Control)>,
}

impl ChannelSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self, group: Group, control: Control) -> bool {
        self.connections
            .values()
            .any(|&(g, c)| g == group && c == control)
    }
}

impl SignalSource for ChannelSignals {
    fn connect(&mut self, group: Group, control: Control) -> Option<ConnectionId> {
        self.next_id += 1;
        let id = ConnectionId(self.next_id);
        self.connections.insert(id, (group, control));
        Some(id)
    }

    fn disconnect(&mut self, id: ConnectionId) -> bool {
        self.connections.remove(&id).is_some()
    }
}

/// Handle for talking to a running [`Runtime`] from other threads
#[derive(Clone)]
pub struct RuntimeHandle {
    events: Sender<HostEvent>,
    shutdown: Arc<AtomicBool>,
}

impl RuntimeHandle {
    /// Report a control change; false if the runtime is gone or backed up
    pub fn send_signal(&self, group: Group, control: Control, value: f64) -> bool {
        self.events
            .try_send(HostEvent::Signal {
                group,
                control,
                value,
            })
            .is_ok()
    }

    /// Flip the auto-DJ switch
    pub fn set_enabled(&self, enabled: bool) -> bool {
        let value = if enabled { 1.0 } else { 0.0 };
        self.send_signal(Group::AutoDj, Control::Enabled, value)
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let _ = self.events.try_send(HostEvent::Shutdown);
    }
}

pub struct Runtime<B: ParamBus> {
    bus: B,
    script: AutoDjScript,
    timer: ThreadTimer,
    signals: ChannelSignals,
    events: Receiver<HostEvent>,
    shutdown: Arc<AtomicBool>,
}

impl<B: ParamBus> Runtime<B> {
    /// Create channels for runtime communication
    pub fn create_channel() -> (Sender<HostEvent>, Receiver<HostEvent>) {
        bounded(1024)
    }

    pub fn new(bus: B, config: AutoDjConfig) -> (Self, RuntimeHandle) {
        let (event_tx, event_rx) = Self::create_channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let handle = RuntimeHandle {
            events: event_tx.clone(),
            shutdown: shutdown.clone(),
        };
        let runtime = Self {
            bus,
            script: AutoDjScript::new(config),
            timer: ThreadTimer::new(event_tx),
            signals: ChannelSignals::new(),
            events: event_rx,
            shutdown,
        };
        (runtime, handle)
    }

    /// Run the script until shutdown, then hand the bus back
    pub fn run(mut self) -> B {
        self.script
            .on_start(&mut self.bus, &mut self.timer, &mut self.signals);

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.events.recv_timeout(POLL_INTERVAL) {
                Ok(HostEvent::Shutdown) => break,
                Ok(event) => self.dispatch(event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.script.on_stop(&mut self.timer, &mut self.signals);
        self.bus
    }

    fn dispatch(&mut self, event: HostEvent) {
        match event {
            HostEvent::Tick(id) => {
                self.script.on_timer(id, &mut self.bus);
            }
            HostEvent::Signal {
                group,
                control,
                value,
            } => {
                if self.signals.is_connected(group, control) {
                    self.script.on_signal(value, &mut self.timer);
                } else {
                    tracing::debug!("Ignoring unconnected signal {} {}", group, control);
                }
            }
            HostEvent::Shutdown => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{DeckId, MemoryBus};

    fn fast_config() -> AutoDjConfig {
        AutoDjConfig {
            tick_interval_ms: 5,
            refine_duration_ms: 10,
            ..AutoDjConfig::default()
        }
    }

    #[test]
    fn test_thread_timer_ticks_until_stopped() {
        let (tx, rx) = bounded(64);
        let mut timer = ThreadTimer::new(tx);
        let id = timer.begin(Duration::from_millis(2)).unwrap();

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)),
            Ok(HostEvent::Tick(id))
        );

        timer.stop(id);
        assert_eq!(timer.active(), 0);
        thread::sleep(Duration::from_millis(20));
        // Drain anything sent before the stop was seen
        while rx.try_recv().is_ok() {}
        thread::sleep(Duration::from_millis(20));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_signals_track_connections() {
        let mut signals = ChannelSignals::new();
        assert!(!signals.is_connected(Group::AutoDj, Control::Enabled));

        let id = signals.connect(Group::AutoDj, Control::Enabled).unwrap();
        assert!(signals.is_connected(Group::AutoDj, Control::Enabled));
        assert!(!signals.is_connected(Group::Master, Control::Crossfader));

        assert!(signals.disconnect(id));
        assert!(!signals.disconnect(id));
        assert!(!signals.is_connected(Group::AutoDj, Control::Enabled));
    }

    #[test]
    fn test_runtime_idle_until_enabled() {
        let (runtime, handle) = Runtime::new(MemoryBus::new(), fast_config());
        let worker = thread::spawn(move || runtime.run());

        thread::sleep(Duration::from_millis(50));
        handle.shutdown();
        let bus = worker.join().unwrap();

        // Decks prepared, but no selection pass ever ran
        assert_eq!(bus.get(Group::Deck(DeckId::A), Control::Quantize), 1.0);
        assert_eq!(bus.trigger_count(Group::AutoDj, Control::SkipNext), 0);
    }

    #[test]
    fn test_runtime_ticks_when_enabled() {
        let (runtime, handle) = Runtime::new(MemoryBus::new(), fast_config());
        let worker = thread::spawn(move || runtime.run());

        assert!(handle.set_enabled(true));
        thread::sleep(Duration::from_millis(100));
        handle.shutdown();
        assert!(handle.is_shutdown());
        let bus = worker.join().unwrap();

        // Nothing loaded on the incoming deck: every selection pass skips
        assert!(bus.trigger_count(Group::AutoDj, Control::SkipNext) > 0);
    }
}
