//! Tempo sync state machine for a single transition
//!
//! Sync is engaged early in the fade and released once the fade passes
//! [`DISENGAGE_PROGRESS`]. In gradual mode the incoming deck follows and
//! the leading deck's tempo is eased towards the incoming track; in snap
//! mode the leading deck follows and jumps to the incoming tempo on the
//! first beat.

use crate::bus::{Control, DeckId, Group, ParamBus, SyncMode};
use crate::config::SyncFade;
use crate::deck::Roles;

/// Fade progress at which sync is released
pub const DISENGAGE_PROGRESS: f64 = 0.75;

/// Share of the remaining tempo gap closed per tick, scaled by progress
const EASE_FACTOR: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    /// Sync is engaged with `follower` tracking the other deck
    Syncing { follower: DeckId },
}

/// A transition the machine took on this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    Engaged {
        follower: DeckId,
        master: DeckId,
        fade: SyncFade,
    },
    Disengaged { follower: DeckId },
}

impl SyncEvent {
    /// Write the event's sync commands to the bus
    ///
    /// The follower's role is set before the master's; the other order
    /// makes the mixer snap the follower at once.
    pub fn apply<B: ParamBus + ?Sized>(&self, bus: &mut B) {
        match *self {
            SyncEvent::Engaged {
                follower,
                master,
                fade,
            } => {
                bus.set(Group::Deck(follower), Control::SyncMode, SyncMode::Follower.value());
                bus.set(Group::Deck(master), Control::SyncMode, SyncMode::Master.value());
                match fade {
                    SyncFade::Gradual => bus.set(Group::Deck(follower), Control::SyncEnabled, 1.0),
                    SyncFade::Snap => bus.trigger(Group::Deck(follower), Control::SyncEnabled),
                }
            }
            SyncEvent::Disengaged { follower } => {
                bus.trigger(Group::Deck(follower), Control::SyncEnabled);
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncMachine {
    state: SyncState,
}

impl SyncMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_syncing(&self) -> bool {
        matches!(self.state, SyncState::Syncing { .. })
    }

    /// Advance on one fading tick
    ///
    /// `leading_on_beat` only matters for snap mode, which waits for a beat
    /// of the leading deck before engaging.
    pub fn advance(
        &mut self,
        progress: f64,
        roles: Roles,
        fade: SyncFade,
        leading_on_beat: bool,
    ) -> Option<SyncEvent> {
        match self.state {
            SyncState::Syncing { follower } if progress > DISENGAGE_PROGRESS => {
                self.state = SyncState::Idle;
                Some(SyncEvent::Disengaged { follower })
            }
            SyncState::Idle if progress < DISENGAGE_PROGRESS => {
                let (follower, master) = match fade {
                    SyncFade::Gradual => (roles.incoming, roles.leading),
                    SyncFade::Snap if leading_on_beat => (roles.leading, roles.incoming),
                    SyncFade::Snap => return None,
                };
                self.state = SyncState::Syncing { follower };
                Some(SyncEvent::Engaged {
                    follower,
                    master,
                    fade,
                })
            }
            _ => None,
        }
    }

    /// Drop back to idle after an aborted transition
    ///
    /// Returns true if sync was engaged and the decks' sync modes were cleared.
    pub fn abort<B: ParamBus + ?Sized>(&mut self, bus: &mut B) -> bool {
        if !self.is_syncing() {
            return false;
        }
        self.state = SyncState::Idle;
        bus.set(Group::Deck(DeckId::A), Control::SyncMode, SyncMode::None.value());
        bus.set(Group::Deck(DeckId::B), Control::SyncMode, SyncMode::None.value());
        true
    }
}

/// Next live tempo of the leading deck while easing towards `desired`
///
/// Each tick closes a quarter of the remaining gap, scaled by progress,
/// so the approach starts slowly and has mostly converged well before
/// sync is released.
pub fn ease_tempo(current: f64, desired: f64, progress: f64) -> f64 {
    current + EASE_FACTOR * progress * (desired - current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MemoryBus;

    const ROLES: Roles = Roles {
        leading: DeckId::A,
        incoming: DeckId::B,
    };

    #[test]
    fn test_gradual_engages_incoming_as_follower() {
        let mut sync = SyncMachine::new();
        let event = sync.advance(0.1, ROLES, SyncFade::Gradual, false);

        assert_eq!(
            event,
            Some(SyncEvent::Engaged {
                follower: DeckId::B,
                master: DeckId::A,
                fade: SyncFade::Gradual,
            })
        );
        assert_eq!(sync.state(), SyncState::Syncing { follower: DeckId::B });
    }

    #[test]
    fn test_engage_only_once() {
        let mut sync = SyncMachine::new();
        assert!(sync.advance(0.1, ROLES, SyncFade::Gradual, false).is_some());
        assert!(sync.advance(0.2, ROLES, SyncFade::Gradual, false).is_none());
        assert!(sync.advance(0.5, ROLES, SyncFade::Gradual, false).is_none());
    }

    #[test]
    fn test_snap_waits_for_beat() {
        let mut sync = SyncMachine::new();
        assert!(sync.advance(0.1, ROLES, SyncFade::Snap, false).is_none());
        assert!(!sync.is_syncing());

        let event = sync.advance(0.15, ROLES, SyncFade::Snap, true);
        assert_eq!(
            event,
            Some(SyncEvent::Engaged {
                follower: DeckId::A,
                master: DeckId::B,
                fade: SyncFade::Snap,
            })
        );
    }

    #[test]
    fn test_disengage_past_threshold() {
        let mut sync = SyncMachine::new();
        sync.advance(0.1, ROLES, SyncFade::Gradual, false);

        // Exactly on the threshold nothing happens
        assert!(sync.advance(DISENGAGE_PROGRESS, ROLES, SyncFade::Gradual, false).is_none());

        let event = sync.advance(0.8, ROLES, SyncFade::Gradual, false);
        assert_eq!(event, Some(SyncEvent::Disengaged { follower: DeckId::B }));
        assert_eq!(sync.state(), SyncState::Idle);
    }

    #[test]
    fn test_no_double_disengage() {
        let mut sync = SyncMachine::new();
        sync.advance(0.1, ROLES, SyncFade::Gradual, false);
        assert!(sync.advance(0.8, ROLES, SyncFade::Gradual, false).is_some());
        assert!(sync.advance(0.9, ROLES, SyncFade::Gradual, false).is_none());
        assert!(sync.advance(1.0, ROLES, SyncFade::Gradual, false).is_none());
    }

    #[test]
    fn test_disengage_uses_deck_that_engaged() {
        let mut sync = SyncMachine::new();
        sync.advance(0.1, ROLES, SyncFade::Snap, true);

        // Roles swapped since the engage; the original follower is released
        let swapped = Roles {
            leading: DeckId::B,
            incoming: DeckId::A,
        };
        let event = sync.advance(0.9, swapped, SyncFade::Snap, false);
        assert_eq!(event, Some(SyncEvent::Disengaged { follower: DeckId::A }));
    }

    #[test]
    fn test_apply_gradual_engage_order() {
        let mut bus = MemoryBus::new();
        SyncEvent::Engaged {
            follower: DeckId::B,
            master: DeckId::A,
            fade: SyncFade::Gradual,
        }
        .apply(&mut bus);

        let writes: Vec<_> = bus.writes().iter().map(|w| (w.group, w.control, w.value)).collect();
        assert_eq!(
            writes,
            vec![
                (Group::Deck(DeckId::B), Control::SyncMode, 1.0),
                (Group::Deck(DeckId::A), Control::SyncMode, 2.0),
                (Group::Deck(DeckId::B), Control::SyncEnabled, 1.0),
            ]
        );
    }

    #[test]
    fn test_apply_disengage_is_momentary() {
        let mut bus = MemoryBus::new();
        SyncEvent::Disengaged { follower: DeckId::B }.apply(&mut bus);
        assert_eq!(bus.trigger_count(Group::Deck(DeckId::B), Control::SyncEnabled), 1);
        assert_eq!(bus.get(Group::Deck(DeckId::B), Control::SyncEnabled), 0.0);
    }

    #[test]
    fn test_abort_clears_sync_modes() {
        let mut bus = MemoryBus::new();
        let mut sync = SyncMachine::new();
        assert!(!sync.abort(&mut bus));
        assert!(bus.writes().is_empty());

        sync.advance(0.3, ROLES, SyncFade::Gradual, false);
        assert!(sync.abort(&mut bus));
        assert!(!sync.is_syncing());
        assert_eq!(bus.writes_to(Group::Deck(DeckId::A), Control::SyncMode), vec![0.0]);
        assert_eq!(bus.writes_to(Group::Deck(DeckId::B), Control::SyncMode), vec![0.0]);
    }

    #[test]
    fn test_ease_tempo() {
        assert_eq!(ease_tempo(120.0, 128.0, 0.0), 120.0);
        assert_eq!(ease_tempo(120.0, 128.0, 0.5), 121.0);
        assert_eq!(ease_tempo(120.0, 112.0, 1.0), 118.0);
    }

    #[test]
    fn test_ease_converges_before_release() {
        // Crossfader moving 0.75 over 60 ticks
        let mut bpm = 120.0;
        for step in 1..=60 {
            let progress = DISENGAGE_PROGRESS * step as f64 / 60.0;
            bpm = ease_tempo(bpm, 128.0, progress);
        }
        assert!((bpm - 128.0).abs() < 0.1);
    }
}
