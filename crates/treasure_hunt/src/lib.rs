//! Treasure hunt rules.
//!
//! Pure game logic for a team treasure hunt: no I/O, no clocks, no storage.
//!
//! # Architecture
//!
//! - **Variant**: deterministic A/B choice per (team, clue)
//! - **Clue**: clue records and answer checking
//! - **Sequencer**: play order over clues, ending in a finished state
//! - **Scoring**: solve/hint/skip rules, time penalties and the hint gate
//! - **Settings**: the six scoring knobs with layered resolution
//! - **Document**: export/import of the whole hunt
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//!
//! use treasure_hunt::{ClueSequence, ClueSlot, Position, select_variant};
//!
//! let sequence = ClueSequence::new(vec![
//!     ClueSlot { id: 1, order_index: 1, is_final: false },
//!     ClueSlot { id: 2, order_index: 2, is_final: true },
//! ]);
//! let completed = BTreeSet::new();
//! assert_eq!(sequence.advance(1, &completed), Position::AtClue(2));
//! assert_eq!(sequence.advance(2, &completed), Position::Finished);
//!
//! let variant = select_variant("Red Foxes", 1);
//! assert_eq!(variant, select_variant("Red Foxes", 1));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod clue;
mod document;
mod scoring;
mod sequencer;
mod settings;
mod variant;

pub use clue::{AnswerError, AnswerType, Clue, ClueId, InvalidClue, parse_choices};
pub use document::{DocumentError, HuntDocument};
pub use scoring::{
    ClueProgress, HintAvailability, ScoreUpdate, ScoringEngine, ScoringError, ScoringEvent,
};
pub use sequencer::{ClueSequence, ClueSlot, Position};
pub use settings::{
    GameSettings, HINT_DELAY_SECONDS, PENALTY_HINT, PENALTY_SKIP, POINTS_SOLVE, SETTING_KEYS,
    SETTING_LIMIT, SettingsError, TIME_PENALTY_POINTS, TIME_PENALTY_WINDOW_SECONDS,
};
pub use variant::{Variant, select_variant};
