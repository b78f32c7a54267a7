//! Automatic DJ transitions - the controller driving two decks and a mixer
//!
//! - Bus: parameter access to decks, mixer and the auto-DJ queue
//! - Controller: periodic tick running fades and track selection
//! - Sync: tempo sync engage/release during a fade
//! - Selection: accept or skip the queued track
//! - Script/Runtime: lifecycle hooks and a thread-backed host

mod bus;
mod config;
mod controller;
mod crossfade;
mod deck;
mod host;
mod runtime;
mod script;
mod selection;
mod sync;

pub use bus::{BusWrite, Control, DeckId, Group, MemoryBus, ParamBus, SyncMode};
pub use config::{AutoDjConfig, ConfigError, SyncFade};
pub use controller::{Controller, Phase, Tick, TransitionState};
pub use crossfade::{fade_progress, taper_low, ToneFade};
pub use deck::{assign_roles, DeckSnapshot, Roles};
pub use host::{ConnectionId, SignalSource, Timer, TimerId};
pub use runtime::{ChannelSignals, HostEvent, Runtime, RuntimeHandle, ThreadTimer};
pub use script::AutoDjScript;
pub use selection::{RejectReason, SkipOutcome, Selector, Verdict};
pub use sync::{ease_tempo, SyncEvent, SyncMachine, SyncState, DISENGAGE_PROGRESS};
