//! Crossfade parameter mapping - crossfader position to fade progress,
//! and fade progress to quick effect (coloration) knob values

use crate::bus::DeckId;

/// Fade progress from the raw crossfader position
///
/// The crossfader runs from -1.0 (deck A) to 1.0 (deck B). Progress runs
/// from 0.0 (only the leading deck audible) to 1.0 (only the incoming
/// deck audible), whichever side the incoming deck is on.
pub fn fade_progress(crossfader: f64, incoming: DeckId) -> f64 {
    let towards_b = ((crossfader + 1.0) / 2.0).clamp(0.0, 1.0);
    match incoming {
        DeckId::A => 1.0 - towards_b,
        DeckId::B => towards_b,
    }
}

/// Quick effect knob positions for both decks at one point of a fade
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneFade {
    pub leading: f64,
    pub incoming: f64,
}

impl ToneFade {
    /// Knob positions for the given progress
    ///
    /// The fading-out knob moves from 0.5 to `0.5 - range/2`, the fading-in
    /// knob from `0.5 + range/2` to 0.5. `reverse` swaps the two sweeps.
    pub fn at(progress: f64, range: f64, reverse: bool) -> Self {
        let swept = progress * range;
        let fade_out = 0.5 - swept / 2.0;
        let fade_in = 0.5 - swept / 2.0 + range / 2.0;
        if reverse {
            Self {
                leading: fade_in,
                incoming: fade_out,
            }
        } else {
            Self {
                leading: fade_out,
                incoming: fade_in,
            }
        }
    }

    /// Knob positions to park the decks at between fades
    pub fn parked(range: f64) -> Self {
        Self {
            leading: 0.5,
            incoming: 0.5 + range / 2.0,
        }
    }
}

/// Next low EQ value of the fading-out deck
pub fn taper_low(current: f64, rate: f64) -> f64 {
    (current - rate).max(0.0)
}
