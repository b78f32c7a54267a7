//! Deck snapshots and leading/incoming role assignment

use crate::bus::{Control, DeckId, Group, ParamBus};

/// What the controller reads from one deck at the start of a tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeckSnapshot {
    /// Declared tempo of the loaded track
    pub bpm: f64,
    /// Tempo currently applied
    pub live_bpm: f64,
    /// Raw key code (0 = unset)
    pub key: f64,
    /// 0.0 - 1.0
    pub position: f64,
    pub playing: bool,
}

impl DeckSnapshot {
    /// Read a deck's state from the bus
    pub fn read<B: ParamBus + ?Sized>(bus: &B, deck: DeckId) -> Self {
        let group = Group::Deck(deck);
        Self {
            bpm: bus.get(group, Control::Bpm),
            live_bpm: bus.get(group, Control::LiveBpm),
            key: bus.get(group, Control::Key),
            position: bus.get(group, Control::PlayPosition),
            playing: bus.is_set(group, Control::Playing),
        }
    }
}

/// Which deck is on air and which one is queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roles {
    /// Deck further into its track (currently audible)
    pub leading: DeckId,
    /// Deck queued next
    pub incoming: DeckId,
}

/// Derive roles from the two play positions
///
/// The deck further into its track leads; on a tie deck A leads.
pub fn assign_roles(position_a: f64, position_b: f64) -> Roles {
    if position_a < position_b {
        Roles {
            leading: DeckId::B,
            incoming: DeckId::A,
        }
    } else {
        Roles {
            leading: DeckId::A,
            incoming: DeckId::B,
        }
    }
}
