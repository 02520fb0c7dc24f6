//! Deterministic A/B variant selection.
//!
//! Every team sees one of two presentations of each clue. The choice is a
//! pure function of the team name and the clue id, so the same pair always
//! yields the same variant, across requests and across restarts.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::ClueId;

/// One of the two presentations of a clue.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
pub enum Variant {
    /// First presentation.
    A,
    /// Second presentation.
    B,
}

/// Selects the variant a team sees for a clue.
///
/// Hashes the UTF-8 bytes of `"{team_name}:{clue_id}"` with SHA-256 and reads
/// the digest as a big-endian unsigned integer: even selects [`Variant::A`],
/// odd selects [`Variant::B`]. Only the lowest bit matters, and for a
/// big-endian number that bit lives in the last byte.
#[instrument]
pub fn select_variant(team_name: &str, clue_id: ClueId) -> Variant {
    let digest = Sha256::digest(format!("{team_name}:{clue_id}").as_bytes());
    match digest.last() {
        Some(byte) if byte % 2 == 1 => Variant::B,
        _ => Variant::A,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_stored_variant() {
        assert_eq!("A".parse::<Variant>().unwrap(), Variant::A);
        assert_eq!("B".parse::<Variant>().unwrap(), Variant::B);
        assert!("C".parse::<Variant>().is_err());
    }

    #[test]
    fn test_variant_display_matches_storage() {
        assert_eq!(Variant::A.to_string(), "A");
        assert_eq!(Variant::B.as_ref(), "B");
    }
}
