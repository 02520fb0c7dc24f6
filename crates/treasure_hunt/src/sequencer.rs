//! Clue sequencing.
//!
//! A team walks the clues in order-index order and ends in
//! [`Position::Finished`]. The sequence is rebuilt from the clue table on
//! each request, so admin edits (reordering, moving the final flag) take
//! effect immediately.
//!
//! Ties in order index are broken by clue id so the order is total.
//! Advancing steps over clues a team already completed, so a reorder never
//! sends a team back into one.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{Clue, ClueId};

/// Where a team stands in the hunt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "clue_id", rename_all = "snake_case")]
pub enum Position {
    /// Working on the given clue.
    AtClue(ClueId),
    /// Terminal. Reached by solving or skipping the final clue.
    Finished,
}

impl Position {
    /// Returns the clue id, or `None` once finished.
    pub fn clue_id(&self) -> Option<ClueId> {
        match self {
            Self::AtClue(id) => Some(*id),
            Self::Finished => None,
        }
    }

    /// Returns whether this is the terminal state.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// The sequencing-relevant part of a clue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClueSlot {
    /// Clue id.
    pub id: ClueId,
    /// Position key.
    pub order_index: i32,
    /// Whether finishing this clue ends the hunt.
    pub is_final: bool,
}

impl From<&Clue> for ClueSlot {
    fn from(clue: &Clue) -> Self {
        Self {
            id: *clue.id(),
            order_index: *clue.order_index(),
            is_final: *clue.is_final(),
        }
    }
}

/// Clues in play order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClueSequence {
    slots: Vec<ClueSlot>,
}

impl ClueSequence {
    /// Builds a sequence, sorting by order index then id.
    #[instrument(skip(slots))]
    pub fn new(mut slots: Vec<ClueSlot>) -> Self {
        slots.sort_by_key(|s| (s.order_index, s.id));
        debug!(count = slots.len(), "Clue sequence built");
        Self { slots }
    }

    /// Builds a sequence from full clue records.
    pub fn from_clues<'a>(clues: impl IntoIterator<Item = &'a Clue>) -> Self {
        Self::new(clues.into_iter().map(ClueSlot::from).collect())
    }

    /// Number of clues in play.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns whether no clues are configured.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Where a new team starts. Finished when no clues exist.
    pub fn start(&self) -> Position {
        self.slots
            .first()
            .map_or(Position::Finished, |s| Position::AtClue(s.id))
    }

    /// Returns where a clue id stands, finished if it is not in play.
    pub fn resolve(&self, clue_id: ClueId) -> Position {
        if self.index_of(clue_id).is_some() {
            Position::AtClue(clue_id)
        } else {
            Position::Finished
        }
    }

    /// One-based place of a clue in play order.
    pub fn ordinal(&self, clue_id: ClueId) -> Option<usize> {
        self.index_of(clue_id).map(|i| i + 1)
    }

    /// Moves past `current`, stepping over clues in `completed`.
    ///
    /// Final or last clues lead to [`Position::Finished`], as do ids that are
    /// not in play. A completed clue flagged final also ends the hunt.
    #[instrument(skip(self, completed))]
    pub fn advance(&self, current: ClueId, completed: &BTreeSet<ClueId>) -> Position {
        let Some(index) = self.index_of(current) else {
            debug!(current, "Advancing from a clue not in play");
            return Position::Finished;
        };
        if self.slots[index].is_final {
            return Position::Finished;
        }
        let mut next = Position::Finished;
        for slot in &self.slots[index + 1..] {
            if !completed.contains(&slot.id) {
                next = Position::AtClue(slot.id);
                break;
            }
            debug!(clue_id = slot.id, "Stepping over completed clue");
            if slot.is_final {
                break;
            }
        }
        debug!(current, ?next, "Advanced");
        next
    }

    fn index_of(&self, clue_id: ClueId) -> Option<usize> {
        self.slots.iter().position(|s| s.id == clue_id)
    }
}
