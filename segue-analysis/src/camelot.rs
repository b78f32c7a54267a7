//! Musical key codes and Camelot wheel notation
//!
//! Mixers report a track's key as a numeric code: 1-12 are the major
//! keys C..B, 13-24 the minor keys Cm..Bm, and 0 means "not analysed".
//! [`MusicalKey`] is the typed form of that code; [`CamelotKey`] is only
//! used for display in logs.

use std::fmt;

/// Musical key (24 possible: 12 major + 12 minor)
///
/// Variant order matches the mixer key code minus one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MusicalKey {
    CMajor,
    DbMajor,
    DMajor,
    EbMajor,
    EMajor,
    FMajor,
    GbMajor,
    GMajor,
    AbMajor,
    AMajor,
    BbMajor,
    BMajor,
    CMinor,
    DbMinor,
    DMinor,
    EbMinor,
    EMinor,
    FMinor,
    GbMinor,
    GMinor,
    AbMinor,
    AMinor,
    BbMinor,
    BMinor,
}

impl MusicalKey {
    const ALL: [MusicalKey; 24] = {
        use MusicalKey::*;
        [
            CMajor, DbMajor, DMajor, EbMajor, EMajor, FMajor, GbMajor, GMajor, AbMajor, AMajor,
            BbMajor, BMajor, CMinor, DbMinor, DMinor, EbMinor, EMinor, FMinor, GbMinor, GMinor,
            AbMinor, AMinor, BbMinor, BMinor,
        ]
    };

    /// Decode a mixer key code (1-24)
    ///
    /// Returns `None` for 0 (unset) and anything outside the valid range.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1..=24 => Some(Self::ALL[(code - 1) as usize]),
            _ => None,
        }
    }

    /// Decode a key code as read from the parameter bus
    ///
    /// Non-integral or non-finite values are rejected rather than rounded.
    pub fn from_param(value: f64) -> Option<Self> {
        if !value.is_finite() || value.fract() != 0.0 || !(1.0..=24.0).contains(&value) {
            return None;
        }
        Self::from_code(value as u8)
    }

    /// Mixer key code (1-24)
    pub fn code(&self) -> u8 {
        *self as u8 + 1
    }

    /// Check if this key is major
    pub fn is_major(&self) -> bool {
        self.code() <= 12
    }
}

impl fmt::Display for MusicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use MusicalKey::*;
        let s = match self {
            CMajor => "C",
            DbMajor => "Db",
            DMajor => "D",
            EbMajor => "Eb",
            EMajor => "E",
            FMajor => "F",
            GbMajor => "Gb",
            GMajor => "G",
            AbMajor => "Ab",
            AMajor => "A",
            BbMajor => "Bb",
            BMajor => "B",
            CMinor => "Cm",
            DbMinor => "Dbm",
            DMinor => "Dm",
            EbMinor => "Ebm",
            EMinor => "Em",
            FMinor => "Fm",
            GbMinor => "Gbm",
            GMinor => "Gm",
            AbMinor => "Abm",
            AMinor => "Am",
            BbMinor => "Bbm",
            BMinor => "Bm",
        };
        write!(f, "{}", s)
    }
}

/// Camelot wheel notation (1A-12B)
///
/// - Numbers 1-12 represent positions on the wheel
/// - 'A' suffix = minor keys
/// - 'B' suffix = major keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CamelotKey {
    /// Position on the wheel (1-12)
    pub number: u8,
    /// true = B (major), false = A (minor)
    pub is_major: bool,
}

impl CamelotKey {
    /// Convert from musical key to Camelot notation
    ///
    /// Relative major/minor share the same number.
    pub fn from_musical_key(key: MusicalKey) -> Self {
        use MusicalKey::*;
        let number = match key {
            AbMinor | BMajor => 1,
            EbMinor | GbMajor => 2,
            BbMinor | DbMajor => 3,
            FMinor | AbMajor => 4,
            CMinor | EbMajor => 5,
            GMinor | BbMajor => 6,
            DMinor | FMajor => 7,
            AMinor | CMajor => 8,
            EMinor | GMajor => 9,
            BMinor | DMajor => 10,
            GbMinor | AMajor => 11,
            DbMinor | EMajor => 12,
        };
        CamelotKey {
            number,
            is_major: key.is_major(),
        }
    }

    /// Get display string (e.g., "8A", "12B")
    pub fn display(&self) -> String {
        format!("{}{}", self.number, if self.is_major { 'B' } else { 'A' })
    }
}

impl From<MusicalKey> for CamelotKey {
    fn from(key: MusicalKey) -> Self {
        Self::from_musical_key(key)
    }
}

impl fmt::Display for CamelotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip_covers_all_keys() {
        for code in 1..=24u8 {
            let key = MusicalKey::from_code(code).unwrap();
            assert_eq!(key.code(), code);
            assert_eq!(key.is_major(), code <= 12);
        }
    }

    #[test]
    fn test_code_anchors() {
        assert_eq!(MusicalKey::from_code(1), Some(MusicalKey::CMajor));
        assert_eq!(MusicalKey::from_code(12), Some(MusicalKey::BMajor));
        assert_eq!(MusicalKey::from_code(13), Some(MusicalKey::CMinor));
        assert_eq!(MusicalKey::from_code(22), Some(MusicalKey::AMinor));
    }

    #[test]
    fn test_unset_and_invalid_codes() {
        assert_eq!(MusicalKey::from_code(0), None);
        assert_eq!(MusicalKey::from_code(25), None);
        assert_eq!(MusicalKey::from_param(0.0), None);
        assert_eq!(MusicalKey::from_param(3.5), None);
        assert_eq!(MusicalKey::from_param(f64::NAN), None);
        assert_eq!(MusicalKey::from_param(8.0), Some(MusicalKey::GMajor));
    }

    #[test]
    fn test_camelot_from_musical_key() {
        assert_eq!(
            CamelotKey::from_musical_key(MusicalKey::CMajor),
            CamelotKey {
                number: 8,
                is_major: true
            }
        );
        assert_eq!(
            CamelotKey::from_musical_key(MusicalKey::AMinor),
            CamelotKey {
                number: 8,
                is_major: false
            }
        );
        assert_eq!(CamelotKey::from(MusicalKey::EMinor).display(), "9A");
        assert_eq!(CamelotKey::from(MusicalKey::EMajor).to_string(), "12B");
    }
}
