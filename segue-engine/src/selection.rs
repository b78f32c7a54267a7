//! Track acceptance - decides whether the queued track may play next
//!
//! The queue manager loads the next track on its own. Before it becomes
//! audible, the track is checked against the leading one for tempo
//! distance and (optionally) key. A rejected track is skipped; after
//! enough consecutive skips the search gives up a little: the tempo
//! tolerance widens and the queue may be shuffled.

use std::fmt;

use segue_analysis::{classify_codes, cue_tempo, is_known_bpm, KeyRelation, TempoDistance};

use crate::bus::{Control, Group, ParamBus};
use crate::config::AutoDjConfig;
use crate::deck::{DeckSnapshot, Roles};

/// Margin kept below the maximum tolerance to absorb float drift
const TOLERANCE_EPSILON: f64 = 0.1;

/// Why a track was skipped
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// The incoming track has no usable BPM
    UnknownTempo,
    TempoTooFar { distance: f64, tolerance: f64 },
    KeyClash(KeyRelation),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::UnknownTempo => write!(f, "tempo unknown"),
            RejectReason::TempoTooFar {
                distance,
                tolerance,
            } => write!(f, "tempo {:.1} BPM off (tolerance {:.1})", distance, tolerance),
            RejectReason::KeyClash(relation) => write!(f, "key: {}", relation.label()),
        }
    }
}

/// Outcome of evaluating the queued track
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// Play it, cued at this tempo
    Accept { cue_bpm: f64 },
    Reject(RejectReason),
}

/// What happened on a skip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SkipOutcome {
    /// The skip count reached the surrender threshold and was reset
    pub surrendered: bool,
    /// The tempo tolerance was widened
    pub widened: bool,
    /// A queue shuffle was requested
    pub shuffled: bool,
}

/// Skip counter and adaptive tempo tolerance
#[derive(Debug, Clone)]
pub struct Selector {
    skip_count: u32,
    bpm_tolerance: f64,
}

impl Selector {
    /// Start with the full configured tolerance
    pub fn new(config: &AutoDjConfig) -> Self {
        Self {
            skip_count: 0,
            bpm_tolerance: config.max_bpm_adjustment,
        }
    }

    pub fn skip_count(&self) -> u32 {
        self.skip_count
    }

    pub fn bpm_tolerance(&self) -> f64 {
        self.bpm_tolerance
    }

    /// Judge the incoming track against the leading one
    pub fn evaluate(
        &self,
        config: &AutoDjConfig,
        leading: &DeckSnapshot,
        incoming: &DeckSnapshot,
    ) -> Verdict {
        if !is_known_bpm(incoming.bpm) {
            return Verdict::Reject(RejectReason::UnknownTempo);
        }

        // Nothing to match against while the leading deck is unanalysed
        let leading_known = is_known_bpm(leading.bpm);
        if leading_known {
            let distance = TempoDistance::between(leading.bpm, incoming.bpm);
            if !distance.within(self.bpm_tolerance) {
                return Verdict::Reject(RejectReason::TempoTooFar {
                    distance: distance.effective(),
                    tolerance: self.bpm_tolerance,
                });
            }
        }

        if config.care_about_key {
            let relation = classify_codes(leading.key, incoming.key);
            if !relation.is_compatible() {
                return Verdict::Reject(RejectReason::KeyClash(relation));
            }
        }

        let cue_bpm = if leading_known && config.gradual_sync() {
            cue_tempo(leading.bpm, incoming.bpm)
        } else {
            incoming.bpm
        };
        Verdict::Accept { cue_bpm }
    }

    /// Evaluate the incoming track and act on the verdict
    pub fn decide<B: ParamBus + ?Sized>(
        &mut self,
        bus: &mut B,
        config: &AutoDjConfig,
        roles: Roles,
        leading: &DeckSnapshot,
        incoming: &DeckSnapshot,
    ) -> Verdict {
        let verdict = self.evaluate(config, leading, incoming);
        match verdict {
            Verdict::Accept { cue_bpm } => self.accept(bus, config, roles, cue_bpm),
            Verdict::Reject(reason) => {
                let outcome = self.skip(bus, config);
                tracing::info!(
                    reason = %reason,
                    skips = self.skip_count,
                    tolerance = self.bpm_tolerance,
                    surrendered = outcome.surrendered,
                    "Skipping queued track"
                );
            }
        }
        verdict
    }

    fn accept<B: ParamBus + ?Sized>(
        &mut self,
        bus: &mut B,
        config: &AutoDjConfig,
        roles: Roles,
        cue_bpm: f64,
    ) {
        if config.low_change_rate > 0.0 {
            bus.set(Group::Deck(roles.leading), Control::LowFilter, 1.0);
            bus.set(Group::Deck(roles.incoming), Control::LowFilter, 1.0);
        }
        if config.adaptive_bpm_search {
            self.bpm_tolerance = config.max_bpm_adjustment / 4.0;
        }
        // Written on every pass, so drift on the cued deck gets corrected too
        bus.set(Group::Deck(roles.incoming), Control::LiveBpm, cue_bpm);
        tracing::debug!(deck = ?roles.incoming, cue_bpm, "Queued track accepted");
    }

    /// Skip the queued track and update the skip bookkeeping
    pub fn skip<B: ParamBus + ?Sized>(&mut self, bus: &mut B, config: &AutoDjConfig) -> SkipOutcome {
        bus.trigger(Group::AutoDj, Control::SkipNext);
        self.skip_count += 1;

        let mut outcome = SkipOutcome::default();
        if self.skip_count < config.skips_till_surrender {
            return outcome;
        }

        self.skip_count = 0;
        outcome.surrendered = true;

        let max = config.max_bpm_adjustment;
        if config.adaptive_bpm_search && self.bpm_tolerance < max - TOLERANCE_EPSILON {
            self.bpm_tolerance = (self.bpm_tolerance + max / 4.0).min(max);
            outcome.widened = true;
        }
        if config.shuffle_after_skip {
            bus.trigger(Group::AutoDj, Control::ShufflePlaylist);
            outcome.shuffled = true;
        }
        outcome
    }
}
