//! Tempo distance between two tracks, including half/double time
//!
//! A 65 BPM track mixes fine into a 120 BPM one by matching two of its
//! beats to one, so the distance is taken both directly and with the
//! slower track's tempo doubled.

/// Direct and doubled BPM distance between two tracks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoDistance {
    /// |a - b|
    pub direct: f64,
    /// |2 * slower - faster|
    pub doubled: f64,
}

impl TempoDistance {
    /// Distance between two tempos, symmetric in its arguments
    pub fn between(a: f64, b: f64) -> Self {
        let slower = a.min(b);
        let faster = a.max(b);
        Self {
            direct: (a - b).abs(),
            doubled: (2.0 * slower - faster).abs(),
        }
    }

    /// The smaller of the two distances
    pub fn effective(&self) -> f64 {
        self.direct.min(self.doubled)
    }

    /// True when half/double-time matching is closer than direct matching
    pub fn prefers_doubling(&self) -> bool {
        self.doubled < self.direct
    }

    /// Check the distance against a tolerance (inclusive)
    pub fn within(&self, tolerance: f64) -> bool {
        self.effective() <= tolerance
    }
}

/// Check whether a BPM value read from the mixer comes from an analysed track
pub fn is_known_bpm(bpm: f64) -> bool {
    bpm.is_finite() && bpm > 0.0
}

/// Tempo the leading deck should move towards so that the incoming track
/// lands on its own tempo, or on its half/double when that is closer
pub fn convergence_target(leading_bpm: f64, incoming_bpm: f64) -> f64 {
    let distance = TempoDistance::between(leading_bpm, incoming_bpm);
    if !distance.prefers_doubling() {
        incoming_bpm
    } else if incoming_bpm < leading_bpm {
        incoming_bpm * 2.0
    } else {
        incoming_bpm / 2.0
    }
}

/// Tempo at which the incoming track should be cued so it matches the
/// leading track, or its half/double when that is closer
pub fn cue_tempo(leading_bpm: f64, incoming_bpm: f64) -> f64 {
    let distance = TempoDistance::between(leading_bpm, incoming_bpm);
    if !distance.prefers_doubling() {
        leading_bpm
    } else if incoming_bpm < leading_bpm {
        leading_bpm / 2.0
    } else {
        leading_bpm * 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_distance() {
        let d = TempoDistance::between(128.0, 140.0);
        assert_eq!(d.direct, 12.0);
        assert_eq!(d.doubled, 116.0);
        assert_eq!(d.effective(), 12.0);
        assert!(!d.prefers_doubling());
    }

    #[test]
    fn test_half_time_distance() {
        let d = TempoDistance::between(120.0, 65.0);
        assert_eq!(d.direct, 55.0);
        assert_eq!(d.doubled, 10.0);
        assert_eq!(d.effective(), 10.0);
        assert!(d.prefers_doubling());
    }

    #[test]
    fn test_symmetry() {
        let pairs = [(120.0, 65.0), (128.0, 140.0), (90.0, 174.0), (100.0, 100.0)];
        for (a, b) in pairs {
            assert_eq!(TempoDistance::between(a, b), TempoDistance::between(b, a));
        }
    }

    #[test]
    fn test_tolerance_is_inclusive() {
        let d = TempoDistance::between(128.0, 140.0);
        assert!(d.within(12.0));
        assert!(!d.within(11.99));
    }

    #[test]
    fn test_convergence_target() {
        assert_eq!(convergence_target(128.0, 130.0), 130.0);
        // Slower incoming track: leading deck converges on its double
        assert_eq!(convergence_target(120.0, 65.0), 130.0);
        // Faster incoming track: leading deck converges on its half
        assert_eq!(convergence_target(70.0, 150.0), 75.0);
    }

    #[test]
    fn test_cue_tempo() {
        assert_eq!(cue_tempo(128.0, 130.0), 128.0);
        assert_eq!(cue_tempo(120.0, 65.0), 60.0);
        assert_eq!(cue_tempo(70.0, 150.0), 140.0);
    }

    #[test]
    fn test_known_bpm() {
        assert!(is_known_bpm(124.0));
        assert!(!is_known_bpm(0.0));
        assert!(!is_known_bpm(-3.0));
        assert!(!is_known_bpm(f64::NAN));
        assert!(!is_known_bpm(f64::INFINITY));
    }
}
