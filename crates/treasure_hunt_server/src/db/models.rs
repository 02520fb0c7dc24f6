//! Database models and domain conversions.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use tracing::instrument;
use treasure_hunt::{AnswerType, Clue, ClueId, Position, Variant, select_variant};

use crate::db::{DbError, schema};

/// Clue table row.
#[derive(
    Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Insertable, AsChangeset, Getters,
)]
#[diesel(table_name = schema::clues)]
pub struct ClueRow {
    id: i32,
    title: String,
    body_variant_a: String,
    body_variant_b: String,
    answer_type: String,
    answer_payload: String,
    hint_text: String,
    order_index: i32,
    is_final: bool,
}

impl ClueRow {
    /// Converts the stored row into a domain clue.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the stored answer type is not recognised.
    #[instrument(skip(self), fields(clue_id = self.id, answer_type = %self.answer_type))]
    pub fn into_clue(self) -> Result<Clue, DbError> {
        let answer_type = self.answer_type.parse::<AnswerType>().map_err(|_| {
            DbError::new(format!(
                "Invalid answer type '{}' on clue {}",
                self.answer_type, self.id
            ))
        })?;
        Ok(Clue::new(
            self.id,
            self.title,
            self.body_variant_a,
            self.body_variant_b,
            answer_type,
            self.answer_payload,
            self.hint_text,
            self.order_index,
            self.is_final,
        ))
    }
}

impl From<&Clue> for ClueRow {
    fn from(clue: &Clue) -> Self {
        Self {
            id: *clue.id(),
            title: clue.title().clone(),
            body_variant_a: clue.body_variant_a().clone(),
            body_variant_b: clue.body_variant_b().clone(),
            answer_type: clue.answer_type().to_string(),
            answer_payload: clue.answer_payload().clone(),
            hint_text: clue.hint_text().clone(),
            order_index: *clue.order_index(),
            is_final: *clue.is_final(),
        }
    }
}

/// Team progress row.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Getters)]
#[diesel(table_name = schema::teams, primary_key(name))]
pub struct Team {
    name: String,
    current_clue_id: Option<i32>,
    score: i64,
    skips_used: i32,
    started_at: NaiveDateTime,
    finished_at: Option<NaiveDateTime>,
}

impl Team {
    /// Where the team stands.
    pub fn position(&self) -> Position {
        match (self.finished_at, self.current_clue_id) {
            (None, Some(id)) => Position::AtClue(id),
            _ => Position::Finished,
        }
    }

    /// Seconds from start to finish, `None` while still playing.
    pub fn elapsed_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds().max(0))
    }
}

/// Insertable team row.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::teams)]
pub struct NewTeam {
    name: String,
    current_clue_id: Option<i32>,
    score: i64,
    skips_used: i32,
    started_at: NaiveDateTime,
}

/// Per-team, per-clue record: variant shown, arrival, hints and outcome.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Getters)]
#[diesel(table_name = schema::clue_visits)]
pub struct ClueVisit {
    team_name: String,
    clue_id: i32,
    variant: String,
    arrived_at: NaiveDateTime,
    solved_at: Option<NaiveDateTime>,
    hints_used: i32,
    skipped: bool,
}

impl ClueVisit {
    /// Parses the stored variant.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the stored value is not `A` or `B`.
    pub fn parse_variant(&self) -> Result<Variant, DbError> {
        self.variant
            .parse::<Variant>()
            .map_err(|_| DbError::new(format!("Invalid variant '{}'", self.variant)))
    }
}

/// Insertable visit row, written when a team arrives at a clue.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::clue_visits)]
pub struct NewClueVisit {
    team_name: String,
    clue_id: i32,
    variant: String,
    arrived_at: NaiveDateTime,
}

impl NewClueVisit {
    /// A team arriving at a clue; the variant is fixed here.
    #[instrument]
    pub fn arrive(team_name: &str, clue_id: ClueId, arrived_at: NaiveDateTime) -> Self {
        Self {
            team_name: team_name.to_string(),
            clue_id,
            variant: select_variant(team_name, clue_id).to_string(),
            arrived_at,
        }
    }
}

/// Persisted setting.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable, Getters, new)]
#[diesel(table_name = schema::game_settings)]
pub struct SettingRow {
    key: String,
    value: i64,
}
