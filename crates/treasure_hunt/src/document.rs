//! Export/import document.
//!
//! The whole hunt (clues plus settings) as one JSON document:
//!
//! ```json
//! {
//!   "clues": [
//!     {
//!       "id": 1, "title": "Clue 1",
//!       "body_variant_a": "...", "body_variant_b": "...",
//!       "answer_type": "tap", "answer_payload": "",
//!       "hint_text": "...", "order_index": 1, "is_final": false
//!     }
//!   ],
//!   "config": {
//!     "HINT_DELAY_SECONDS": 20, "POINTS_SOLVE": 10, "PENALTY_HINT": 3,
//!     "PENALTY_SKIP": 8, "TIME_PENALTY_WINDOW_SECONDS": 120,
//!     "TIME_PENALTY_POINTS": 1
//!   }
//! }
//! ```
//!
//! Importing replaces everything; a document is validated in full before
//! any of it is applied.

use std::collections::BTreeSet;

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{Clue, ClueId, GameSettings, InvalidClue, SettingsError};

/// Why a document was rejected.
#[derive(Debug, Clone, derive_more::Display, derive_more::From)]
pub enum DocumentError {
    /// Not valid JSON, or missing/mistyped fields.
    #[display("Malformed document: {}", _0)]
    #[from(ignore)]
    Malformed(String),

    /// A clue breaks a field rule.
    #[display("Invalid clue: {}", _0)]
    InvalidClue(InvalidClue),

    /// Two clues share an id.
    #[display("Duplicate clue id {}", _0)]
    #[from(ignore)]
    DuplicateClueId(ClueId),

    /// Settings out of range.
    #[display("Invalid config: {}", _0)]
    InvalidSettings(SettingsError),
}

impl std::error::Error for DocumentError {}

/// All clues and settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct HuntDocument {
    clues: Vec<Clue>,
    config: GameSettings,
}

impl HuntDocument {
    /// Creates a document, listing clues in play order.
    #[instrument(skip(clues), fields(count = clues.len()))]
    pub fn new(mut clues: Vec<Clue>, config: GameSettings) -> Self {
        clues.sort_by_key(|c| (*c.order_index(), *c.id()));
        Self { clues, config }
    }

    /// Parses and validates a document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] for malformed JSON, missing or mistyped
    /// fields (including unknown answer types), invalid clues, duplicate
    /// ids, or out-of-range settings.
    #[instrument(skip(json), fields(bytes = json.len()))]
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let document: Self =
            serde_json::from_str(json).map_err(|e| DocumentError::Malformed(e.to_string()))?;
        document.validate()?;
        info!(clues = document.clues.len(), "Document parsed");
        Ok(document)
    }

    /// Serializes as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Malformed`] if serialization fails.
    pub fn to_json(&self) -> Result<String, DocumentError> {
        serde_json::to_string_pretty(self).map_err(|e| DocumentError::Malformed(e.to_string()))
    }

    /// Checks every clue, id uniqueness and settings ranges.
    ///
    /// # Errors
    ///
    /// Returns the first [`DocumentError`] found.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), DocumentError> {
        let mut seen = BTreeSet::new();
        for clue in &self.clues {
            clue.validate()?;
            if !seen.insert(*clue.id()) {
                return Err(DocumentError::DuplicateClueId(*clue.id()));
            }
        }
        let finals = self.clues.iter().filter(|c| *c.is_final()).count();
        if finals != 1 && !self.clues.is_empty() {
            warn!(finals, "Document does not flag exactly one final clue");
        }
        self.config.validate()?;
        Ok(())
    }

    /// Splits into clues and settings.
    pub fn into_parts(self) -> (Vec<Clue>, GameSettings) {
        (self.clues, self.config)
    }
}
