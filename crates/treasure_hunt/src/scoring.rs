//! Scoring rules.
//!
//! The engine is a pure function from (progress on the current clue, event)
//! to the new score and counters. It never touches storage; the caller
//! applies the returned [`ScoreUpdate`] atomically together with the
//! sequencer move.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::GameSettings;

/// A team's standing on the clue it is currently working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, new)]
pub struct ClueProgress {
    /// Cumulative team score.
    score: i64,
    /// Hints used on this clue.
    hints_used: i32,
    /// Skips used over the whole hunt.
    skips_used: i32,
    /// When the team arrived at this clue.
    arrived_at: NaiveDateTime,
}

/// Something a team did on its current clue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringEvent {
    /// Correct answer submitted.
    Solve {
        /// Submission time.
        at: NaiveDateTime,
    },
    /// Hint requested.
    HintUsed {
        /// Request time.
        at: NaiveDateTime,
        /// Hint count the requester last saw. A mismatch means the request
        /// duplicates one that was already applied.
        seen: Option<i32>,
    },
    /// Clue abandoned.
    Skip {
        /// Request time.
        at: NaiveDateTime,
    },
}

/// Result of applying an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct ScoreUpdate {
    /// New cumulative score.
    score: i64,
    /// New hint count on the clue.
    hints_used: i32,
    /// New skip count for the team.
    skips_used: i32,
    /// Net change applied to the score.
    delta: i64,
    /// Time penalty included in `delta`.
    time_penalty: i64,
    /// Whether the team moves on to the next clue.
    advances: bool,
}

/// Whether a hint may be taken yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HintAvailability {
    /// The hint delay has passed.
    Available,
    /// Still counting down.
    Locked {
        /// Seconds until the hint unlocks.
        remaining_seconds: i64,
    },
}

impl HintAvailability {
    /// Seconds until unlock, zero once available.
    pub fn remaining_seconds(&self) -> i64 {
        match self {
            Self::Available => 0,
            Self::Locked { remaining_seconds } => *remaining_seconds,
        }
    }
}

/// Event rejected by the scoring rules.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ScoringError {
    /// Hint requested before the delay elapsed.
    #[display("Hint not yet available ({} seconds remaining)", remaining_seconds)]
    HintNotYetAvailable {
        /// Seconds until the hint unlocks.
        remaining_seconds: i64,
    },

    /// Hint request already applied.
    #[display("Hint already taken (expected {} used, found {})", seen, hints_used)]
    DuplicateHint {
        /// Count the requester saw.
        seen: i32,
        /// Count actually recorded.
        hints_used: i32,
    },
}

impl std::error::Error for ScoringError {}

/// Applies scoring rules under a fixed set of settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoringEngine {
    settings: GameSettings,
}

impl ScoringEngine {
    /// Creates an engine for the given settings.
    #[instrument]
    pub fn new(settings: GameSettings) -> Self {
        Self { settings }
    }

    /// Returns the settings in force.
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Seconds between arrival and `at`, clamped at zero.
    pub fn elapsed_seconds(arrived_at: NaiveDateTime, at: NaiveDateTime) -> i64 {
        (at - arrived_at).num_seconds().max(0)
    }

    /// Points lost to time spent on a clue.
    ///
    /// `floor(elapsed / window) * points_per_window`, saturating.
    #[instrument(skip(self))]
    pub fn time_penalty(&self, arrived_at: NaiveDateTime, at: NaiveDateTime) -> i64 {
        let window = (*self.settings.time_penalty_window_seconds()).max(1);
        let windows = Self::elapsed_seconds(arrived_at, at) / window;
        windows.saturating_mul(*self.settings.time_penalty_points())
    }

    /// Whether the hint on a clue reached at `arrived_at` is usable at `now`.
    #[instrument(skip(self))]
    pub fn hint_availability(
        &self,
        arrived_at: NaiveDateTime,
        now: NaiveDateTime,
    ) -> HintAvailability {
        let remaining = self
            .settings
            .hint_delay_seconds()
            .saturating_sub(Self::elapsed_seconds(arrived_at, now));
        if remaining > 0 {
            HintAvailability::Locked {
                remaining_seconds: remaining,
            }
        } else {
            HintAvailability::Available
        }
    }

    /// Applies one event.
    ///
    /// Solves add the solve points minus the time penalty, hints subtract the
    /// hint penalty and bump the clue's hint counter, skips subtract the skip
    /// penalty and bump the team's skip counter. Scores may go negative and
    /// saturate at the `i64` bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError`] for a hint requested before the delay elapsed
    /// or one whose `seen` count is stale.
    #[instrument(skip(self))]
    pub fn apply(
        &self,
        progress: &ClueProgress,
        event: ScoringEvent,
    ) -> Result<ScoreUpdate, ScoringError> {
        let mut update = ScoreUpdate {
            score: progress.score,
            hints_used: progress.hints_used,
            skips_used: progress.skips_used,
            delta: 0,
            time_penalty: 0,
            advances: false,
        };

        match event {
            ScoringEvent::Solve { at } => {
                let penalty = self.time_penalty(progress.arrived_at, at);
                update.time_penalty = penalty;
                update.delta = self.settings.points_solve().saturating_sub(penalty);
                update.advances = true;
            }
            ScoringEvent::HintUsed { at, seen } => {
                if let Some(seen) = seen.filter(|seen| *seen != progress.hints_used) {
                    warn!(seen, hints_used = progress.hints_used, "Duplicate hint request");
                    return Err(ScoringError::DuplicateHint {
                        seen,
                        hints_used: progress.hints_used,
                    });
                }
                if let HintAvailability::Locked { remaining_seconds } =
                    self.hint_availability(progress.arrived_at, at)
                {
                    debug!(remaining_seconds, "Hint still locked");
                    return Err(ScoringError::HintNotYetAvailable { remaining_seconds });
                }
                update.delta = self.settings.penalty_hint().saturating_neg();
                update.hints_used += 1;
            }
            ScoringEvent::Skip { .. } => {
                update.delta = self.settings.penalty_skip().saturating_neg();
                update.skips_used += 1;
                update.advances = true;
            }
        }

        update.score = update.score.saturating_add(update.delta);
        info!(
            delta = update.delta,
            score = update.score,
            advances = update.advances,
            "Score updated"
        );
        Ok(update)
    }
}
