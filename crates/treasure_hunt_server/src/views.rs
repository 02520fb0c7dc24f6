//! Page state handed to the HTTP layer.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use treasure_hunt::{AnswerType, ClueId, Position, Variant};

/// Severity of an advisory message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    /// Neutral.
    Info,
    /// Something went right.
    Success,
    /// Worth noticing.
    Warning,
    /// Something went wrong.
    Danger,
}

/// One-shot advisory message shown on the next page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    /// Severity.
    pub level: FlashLevel,
    /// Text.
    pub message: String,
}

impl Flash {
    /// Creates a message.
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Where a player request sends the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "page", content = "clue_id", rename_all = "snake_case")]
pub enum RedirectTarget {
    /// Team-name entry page.
    Identity,
    /// A clue page.
    Clue(ClueId),
    /// The finished page.
    Finished,
}

impl RedirectTarget {
    /// URL path of the target page.
    pub fn path(&self) -> String {
        match self {
            Self::Identity => "/".to_string(),
            Self::Clue(id) => format!("/clue/{id}"),
            Self::Finished => "/finish".to_string(),
        }
    }
}

impl From<Position> for RedirectTarget {
    fn from(position: Position) -> Self {
        match position {
            Position::AtClue(id) => Self::Clue(id),
            Position::Finished => Self::Finished,
        }
    }
}

/// Result of a player request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerOutcome {
    /// Render the clue page.
    Show(Box<ClueView>),
    /// Send the browser elsewhere with advisory messages.
    Redirect {
        /// Destination.
        target: RedirectTarget,
        /// Messages for the destination page.
        flashes: Vec<Flash>,
    },
}

impl PlayerOutcome {
    /// Redirect carrying a single message.
    pub fn redirect(target: RedirectTarget, level: FlashLevel, message: impl Into<String>) -> Self {
        Self::Redirect {
            target,
            flashes: vec![Flash::new(level, message)],
        }
    }

    /// Redirect without messages.
    pub fn redirect_silently(target: RedirectTarget) -> Self {
        Self::Redirect {
            target,
            flashes: Vec::new(),
        }
    }

    /// Redirect destination, `None` when rendering.
    pub fn target(&self) -> Option<RedirectTarget> {
        match self {
            Self::Show(_) => None,
            Self::Redirect { target, .. } => Some(*target),
        }
    }
}

/// State of the clue page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClueView {
    /// Team viewing the clue.
    pub team: String,
    /// Clue id.
    pub clue_id: ClueId,
    /// Clue title.
    pub title: String,
    /// Variant shown to this team.
    pub variant: Variant,
    /// Body text of that variant.
    pub body: String,
    /// How to answer.
    pub answer_type: AnswerType,
    /// Choices for multiple-choice clues.
    pub choices: Vec<String>,
    /// Hint text, once a hint has been taken.
    pub hint_text: Option<String>,
    /// Hints taken on this clue.
    pub hints_used: i32,
    /// Seconds until the hint unlocks, zero when available.
    pub hint_available_in: i64,
    /// Seconds since arriving at the clue.
    pub elapsed_seconds: i64,
    /// Team score.
    pub score: i64,
    /// One-based place of the clue in play order.
    pub position: usize,
    /// Number of clues in play.
    pub total: usize,
    /// Advisory messages carried over from the previous request.
    pub messages: Vec<Flash>,
}

/// One leaderboard line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    /// One-based rank.
    pub rank: usize,
    /// Team name.
    pub team: String,
    /// Score.
    pub score: i64,
    /// Finish time, or progress for teams still playing.
    pub time: String,
    /// Whether the team has finished.
    pub finished: bool,
    /// Seconds from start to finish.
    pub elapsed_seconds: Option<i64>,
}

/// Admin view of one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSummary {
    /// Team name.
    pub name: String,
    /// "k/N" or "Finished".
    pub current: String,
    /// Hints taken over the whole hunt.
    pub hints: i64,
    /// Skips used.
    pub skips: i32,
    /// Score.
    pub score: i64,
    /// Start time.
    pub started_at: NaiveDateTime,
    /// Finish time.
    pub finished_at: Option<NaiveDateTime>,
}

/// Admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminDashboard {
    /// Number of teams.
    pub active_teams: usize,
    /// Number of clues in play.
    pub total_clues: usize,
    /// Per-team summaries in start order.
    pub teams: Vec<TeamSummary>,
}

/// Finished page state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FinishSummary {
    /// Team, when known.
    pub team: Option<String>,
    /// Final score.
    pub score: Option<i64>,
    /// Hints taken.
    pub hints: Option<i64>,
    /// Skips used.
    pub skips: Option<i32>,
    /// Total time.
    pub time: Option<String>,
    /// Advisory messages carried over from the previous request.
    pub messages: Vec<Flash>,
}

/// Which variant a team would see, for admin preview links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantPreview {
    /// Team name.
    pub team: String,
    /// Clue id.
    pub clue_id: ClueId,
    /// Selected variant.
    pub variant: Variant,
    /// Clue title.
    pub title: String,
    /// Body text of that variant.
    pub body: String,
}

/// Formats seconds as `MM:SS`, or `HH:MM:SS` from one hour.
pub fn format_duration(total_seconds: i64) -> String {
    let total = total_seconds.max(0);
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(305), "05:05");
        assert_eq!(format_duration(3_725), "01:02:05");
        assert_eq!(format_duration(-4), "00:00");
    }

    #[test]
    fn test_redirect_paths() {
        assert_eq!(RedirectTarget::Identity.path(), "/");
        assert_eq!(RedirectTarget::Clue(4).path(), "/clue/4");
        assert_eq!(RedirectTarget::Finished.path(), "/finish");
    }
}
