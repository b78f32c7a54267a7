//! Host capabilities used by the lifecycle: repeating timers and
//! signal connections
//!
//! The host owns the actual callbacks. It reports timer expiry and
//! signal changes back through [`crate::AutoDjScript`], one call at a
//! time, so a tick never overlaps another.

use std::time::Duration;

use crate::bus::{Control, Group};

/// Handle of a running repeating timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Handle of a signal connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

pub trait Timer {
    /// Start a repeating timer; `None` if the host could not create one
    fn begin(&mut self, interval: Duration) -> Option<TimerId>;

    fn stop(&mut self, id: TimerId);
}

pub trait SignalSource {
    /// Subscribe to changes of a control; `None` if the host refused
    fn connect(&mut self, group: Group, control: Control) -> Option<ConnectionId>;

    /// Drop a subscription; false if the host could not
    fn disconnect(&mut self, id: ConnectionId) -> bool;
}
