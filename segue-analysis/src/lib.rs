//! Track metadata evaluation for Segue
//!
//! Pure functions over what the mixer already knows about a track:
//! harmonic key compatibility and tempo distance.

mod camelot;
mod harmony;
mod tempo;

pub use camelot::{CamelotKey, MusicalKey};
pub use harmony::{classify, classify_codes, keys_compatible, KeyRelation};
pub use tempo::{convergence_target, cue_tempo, is_known_bpm, TempoDistance};
