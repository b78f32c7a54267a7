//! Harmonic compatibility between two track keys
//!
//! Works directly on mixer key codes (see [`MusicalKey`]): the numbering
//! is chromatic within each tonality, so circle-of-fifths neighbours sit
//! 5 or 7 codes apart, and a relative minor sits 9 codes above its major
//! (or 21 codes above, once the minor ring wraps past Bm).

use crate::camelot::MusicalKey;

/// How two keys relate for harmonic mixing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRelation {
    /// Identical key
    Same,
    /// Relative major/minor (e.g. C and Am)
    Relative,
    /// Adjacent on the circle of fifths, same tonality
    FifthNeighbour,
    /// Two fifths apart, same tonality ("energy mix")
    TwoFifths,
    /// One semitone apart, same tonality ("energy mix")
    Semitone,
    /// Nothing that mixes cleanly
    Clash,
    /// At least one key is unknown
    Unknown,
}

impl KeyRelation {
    /// Whether a transition between the two keys is acceptable
    pub fn is_compatible(&self) -> bool {
        !matches!(self, KeyRelation::Clash | KeyRelation::Unknown)
    }

    pub fn label(&self) -> &'static str {
        match self {
            KeyRelation::Same => "same key",
            KeyRelation::Relative => "relative major/minor",
            KeyRelation::FifthNeighbour => "fifth neighbour",
            KeyRelation::TwoFifths => "two fifths",
            KeyRelation::Semitone => "semitone",
            KeyRelation::Clash => "clash",
            KeyRelation::Unknown => "unknown key",
        }
    }
}

/// Classify a pair of keys; `None` stands for an unanalysed track
pub fn classify(a: Option<MusicalKey>, b: Option<MusicalKey>) -> KeyRelation {
    let (Some(a), Some(b)) = (a, b) else {
        return KeyRelation::Unknown;
    };

    let small = a.code().min(b.code());
    let large = a.code().max(b.code());
    let diff = large - small;

    if diff == 0 {
        return KeyRelation::Same;
    }

    if a.is_major() != b.is_major() {
        // `small` is the major key here
        let relative = (small <= 3 && diff == 21) || (small >= 4 && diff == 9);
        return if relative {
            KeyRelation::Relative
        } else {
            KeyRelation::Clash
        };
    }

    match diff {
        5 | 7 => KeyRelation::FifthNeighbour,
        2 | 10 => KeyRelation::TwoFifths,
        1 | 11 => KeyRelation::Semitone,
        _ => KeyRelation::Clash,
    }
}

/// Classify two raw key codes as read from the mixer (0 = unset)
pub fn classify_codes(a: f64, b: f64) -> KeyRelation {
    classify(MusicalKey::from_param(a), MusicalKey::from_param(b))
}

/// Check if two raw key codes are harmonically compatible
///
/// Unset or invalid codes are never compatible.
pub fn keys_compatible(a: f64, b: f64) -> bool {
    classify_codes(a, b).is_compatible()
}
