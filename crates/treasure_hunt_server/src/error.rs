//! Service error type.

use derive_more::{Display, From};
use treasure_hunt::{ClueId, DocumentError, InvalidClue, ScoringError, SettingsError};

use crate::DbError;

/// Errors from hunt operations.
#[derive(Debug, Clone, Display, From)]
pub enum HuntError {
    /// Storage failure.
    #[display("{}", _0)]
    Db(DbError),

    /// Scoring rules rejected the event.
    #[display("{}", _0)]
    Scoring(ScoringError),

    /// Import document rejected.
    #[display("{}", _0)]
    Document(DocumentError),

    /// Settings out of range or unknown key.
    #[display("{}", _0)]
    Settings(SettingsError),

    /// Clue record rejected.
    #[display("{}", _0)]
    InvalidClue(InvalidClue),

    /// The team has already moved past this clue.
    #[display("Team '{}' is no longer on clue {}", team, clue_id)]
    #[from(ignore)]
    Stale {
        /// Team name.
        team: String,
        /// Clue the request was for.
        clue_id: ClueId,
    },

    /// No clue with this id.
    #[display("Clue {} not found", _0)]
    #[from(ignore)]
    ClueNotFound(ClueId),

    /// Request failed a shape check.
    #[display("Invalid request: {}", _0)]
    #[from(ignore)]
    Invalid(String),
}

impl std::error::Error for HuntError {}

impl From<diesel::result::Error> for HuntError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        Self::Db(DbError::from(err))
    }
}
