//! Parameter bus - the only channel between the controller and the mixer
//!
//! Every read and write the transition logic performs goes through
//! [`ParamBus`]. The mixer host implements it; [`MemoryBus`] is a plain
//! in-memory implementation used by the tests and the simulator.

use std::collections::HashMap;
use std::fmt;

/// Deck identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeckId {
    A,
    B,
}

impl DeckId {
    /// The opposite deck
    pub fn other(self) -> Self {
        match self {
            DeckId::A => DeckId::B,
            DeckId::B => DeckId::A,
        }
    }

    /// Channel number as used in host group names
    pub fn channel(self) -> u8 {
        match self {
            DeckId::A => 1,
            DeckId::B => 2,
        }
    }
}

/// Parameter group (what the host calls "[Channel1]", "[Master]", ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    Deck(DeckId),
    /// Quick effect (coloration) rack of a deck
    QuickEffect(DeckId),
    Master,
    AutoDj,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::Deck(deck) => write!(f, "[Channel{}]", deck.channel()),
            Group::QuickEffect(deck) => write!(f, "[QuickEffectRack1_[Channel{}]]", deck.channel()),
            Group::Master => write!(f, "[Master]"),
            Group::AutoDj => write!(f, "[AutoDJ]"),
        }
    }
}

/// Controls the transition logic reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// Declared (analysed) tempo of the loaded track
    Bpm,
    /// Tempo the deck is currently playing at
    LiveBpm,
    /// Play position, 0.0 - 1.0
    PlayPosition,
    Playing,
    /// Key code, 1-24 (0 = unset)
    Key,
    /// See [`SyncMode`]
    SyncMode,
    SyncEnabled,
    /// Non-zero while the deck is on a beat
    BeatPulse,
    /// Low EQ, 0.0 (killed) - 1.0 (full)
    LowFilter,
    /// Quick effect super knob, 0.5 = neutral
    ToneKnob,
    Quantize,
    Keylock,
    KeylockMode,
    /// -1.0 (deck A) - 1.0 (deck B)
    Crossfader,
    SkipNext,
    ShufflePlaylist,
    Enabled,
}

impl Control {
    /// Host name of the control
    pub fn name(&self) -> &'static str {
        match self {
            Control::Bpm => "file_bpm",
            Control::LiveBpm => "bpm",
            Control::PlayPosition => "playposition",
            Control::Playing => "play_indicator",
            Control::Key => "key",
            Control::SyncMode => "sync_mode",
            Control::SyncEnabled => "sync_enabled",
            Control::BeatPulse => "beat_active",
            Control::LowFilter => "filterLow",
            Control::ToneKnob => "super1",
            Control::Quantize => "quantize",
            Control::Keylock => "keylock",
            Control::KeylockMode => "keylockMode",
            Control::Crossfader => "crossfader",
            Control::SkipNext => "skip_next",
            Control::ShufflePlaylist => "shuffle_playlist",
            Control::Enabled => "enabled",
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Tempo sync role of a deck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    #[default]
    None,
    Follower,
    Master,
}

impl SyncMode {
    pub fn value(self) -> f64 {
        match self {
            SyncMode::None => 0.0,
            SyncMode::Follower => 1.0,
            SyncMode::Master => 2.0,
        }
    }

}

/// Synchronous read/write access to mixer parameters
///
/// Calls are treated as always succeeding; an unknown control reads as 0.
pub trait ParamBus {
    fn get(&self, group: Group, control: Control) -> f64;

    fn set(&mut self, group: Group, control: Control, value: f64);

    /// Read a control as a boolean flag
    fn is_set(&self, group: Group, control: Control) -> bool {
        self.get(group, control) != 0.0
    }

    /// Fire a momentary control: press and release in one step
    fn trigger(&mut self, group: Group, control: Control) {
        self.set(group, control, 1.0);
        self.set(group, control, 0.0);
    }
}

/// A recorded bus write
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusWrite {
    pub group: Group,
    pub control: Control,
    pub value: f64,
}

/// In-memory parameter bus
///
/// Keeps the current value of every control, a log of all writes and a
/// separate log of triggers, so a caller can tell a momentary press from
/// two unrelated writes.
#[derive(Debug, Default, Clone)]
pub struct MemoryBus {
    values: HashMap<(Group, Control), f64>,
    writes: Vec<BusWrite>,
    triggers: Vec<(Group, Control)>,
}

impl MemoryBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value without recording it as a controller write
    pub fn preset(&mut self, group: Group, control: Control, value: f64) {
        self.values.insert((group, control), value);
    }

    /// Preset the controls describing a loaded deck
    pub fn load_deck(&mut self, deck: DeckId, bpm: f64, key: u8) {
        let group = Group::Deck(deck);
        self.preset(group, Control::Bpm, bpm);
        self.preset(group, Control::LiveBpm, bpm);
        self.preset(group, Control::Key, key as f64);
        self.preset(group, Control::PlayPosition, 0.0);
        self.preset(group, Control::Playing, 0.0);
    }

    /// All writes since the last [`MemoryBus::clear_writes`]
    pub fn writes(&self) -> &[BusWrite] {
        &self.writes
    }

    /// Writes to one control, oldest first
    pub fn writes_to(&self, group: Group, control: Control) -> Vec<f64> {
        self.writes
            .iter()
            .filter(|w| w.group == group && w.control == control)
            .map(|w| w.value)
            .collect()
    }

    /// Number of triggers fired on one control
    pub fn trigger_count(&self, group: Group, control: Control) -> usize {
        self.triggers
            .iter()
            .filter(|(g, c)| *g == group && *c == control)
            .count()
    }

    /// Take the pending triggers, oldest first
    pub fn take_triggers(&mut self) -> Vec<(Group, Control)> {
        std::mem::take(&mut self.triggers)
    }

    /// Forget recorded writes, keep values
    ///
    /// Pending triggers stay queued until [`MemoryBus::take_triggers`].
    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }
}

impl ParamBus for MemoryBus {
    fn get(&self, group: Group, control: Control) -> f64 {
        self.values.get(&(group, control)).copied().unwrap_or(0.0)
    }

    fn set(&mut self, group: Group, control: Control, value: f64) {
        self.values.insert((group, control), value);
        self.writes.push(BusWrite {
            group,
            control,
            value,
        });
    }

    fn trigger(&mut self, group: Group, control: Control) {
        self.set(group, control, 1.0);
        self.set(group, control, 0.0);
        self.triggers.push((group, control));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_names() {
        assert_eq!(Group::Deck(DeckId::A).to_string(), "[Channel1]");
        assert_eq!(
            Group::QuickEffect(DeckId::B).to_string(),
            "[QuickEffectRack1_[Channel2]]"
        );
        assert_eq!(Group::AutoDj.to_string(), "[AutoDJ]");
    }

    #[test]
    fn test_unknown_control_reads_zero() {
        let bus = MemoryBus::new();
        assert_eq!(bus.get(Group::Master, Control::Crossfader), 0.0);
        assert!(!bus.is_set(Group::AutoDj, Control::Enabled));
    }

    #[test]
    fn test_trigger_leaves_control_released() {
        let mut bus = MemoryBus::new();
        bus.trigger(Group::AutoDj, Control::SkipNext);

        assert_eq!(bus.get(Group::AutoDj, Control::SkipNext), 0.0);
        assert_eq!(bus.writes_to(Group::AutoDj, Control::SkipNext), vec![1.0, 0.0]);
        assert_eq!(bus.trigger_count(Group::AutoDj, Control::SkipNext), 1);
        assert_eq!(bus.take_triggers(), vec![(Group::AutoDj, Control::SkipNext)]);
        assert_eq!(bus.trigger_count(Group::AutoDj, Control::SkipNext), 0);
    }

    #[test]
    fn test_preset_is_not_logged() {
        let mut bus = MemoryBus::new();
        bus.load_deck(DeckId::A, 128.0, 8);
        assert_eq!(bus.get(Group::Deck(DeckId::A), Control::Bpm), 128.0);
        assert_eq!(bus.get(Group::Deck(DeckId::A), Control::LiveBpm), 128.0);
        assert!(bus.writes().is_empty());
    }

    #[test]
    fn test_sync_mode_values() {
        assert_eq!(SyncMode::None.value(), 0.0);
        assert_eq!(SyncMode::Follower.value(), 1.0);
        assert_eq!(SyncMode::Master.value(), 2.0);
    }

    #[test]
    fn test_clearing_writes_keeps_pending_triggers() {
        let mut bus = MemoryBus::new();
        bus.trigger(Group::AutoDj, Control::SkipNext);
        bus.set(Group::Master, Control::Crossfader, 0.5);

        bus.clear_writes();
        assert!(bus.writes().is_empty());
        assert_eq!(bus.get(Group::Master, Control::Crossfader), 0.5);
        assert_eq!(bus.take_triggers(), vec![(Group::AutoDj, Control::SkipNext)]);
        assert!(bus.take_triggers().is_empty());
    }
}
