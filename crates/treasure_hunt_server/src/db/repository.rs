//! Database repository for clues, team progress and settings.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument, warn};
use treasure_hunt::{AnswerType, Clue, ClueId, GameSettings, Position};

use crate::db::{ClueRow, ClueVisit, DbError, NewClueVisit, NewTeam, SettingRow, Team, schema};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// A team leaving its current clue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamMove {
    /// Where the team goes.
    pub to: Position,
    /// When it leaves.
    pub at: NaiveDateTime,
}

/// Values written back after a scoring event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressChange {
    /// New team score.
    pub score: i64,
    /// New team skip count.
    pub skips_used: i32,
    /// New hint count on the clue.
    pub hints_used: i32,
    /// When the clue was solved or skipped.
    pub solved_at: Option<NaiveDateTime>,
    /// Whether the clue was skipped.
    pub skipped: bool,
    /// Sequencer move, if the event advances the team.
    pub next: Option<TeamMove>,
}

/// Database repository for hunt operations.
///
/// Each call opens its own connection; every multi-row write runs inside a
/// single `BEGIN IMMEDIATE` transaction so concurrent writers serialize.
#[derive(Debug, Clone)]
pub struct HuntRepository {
    db_path: String,
}

impl HuntRepository {
    /// Creates a repository for the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        if db_path.trim().is_empty() {
            return Err(DbError::new("Database path is empty"));
        }
        info!(path = %db_path, "Creating HuntRepository");
        Ok(Self { db_path })
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        let mut conn = SqliteConnection::establish(&self.db_path).map_err(|e| {
            DbError::new(format!("Failed to connect to '{}': {}", self.db_path, e))
        })?;
        diesel::sql_query(format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}")).execute(&mut conn)?;
        diesel::sql_query("PRAGMA foreign_keys = ON").execute(&mut conn)?;
        Ok(conn)
    }

    /// Applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a migration fails.
    #[instrument(skip(self))]
    pub fn run_migrations(&self) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(format!("Migration failed: {}", e)))?;
        info!(count = applied.len(), "Migrations applied");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    //  Clues
    // ─────────────────────────────────────────────────────────────

    /// Lists all clues in play order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_clues(&self) -> Result<Vec<Clue>, DbError> {
        let mut conn = self.connection()?;
        let rows = schema::clues::table
            .order((schema::clues::order_index.asc(), schema::clues::id.asc()))
            .select(ClueRow::as_select())
            .load(&mut conn)?;
        debug!(count = rows.len(), "Clues loaded");
        rows.into_iter().map(ClueRow::into_clue).collect()
    }

    /// Gets a clue by id. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_clue(&self, clue_id: ClueId) -> Result<Option<Clue>, DbError> {
        let mut conn = self.connection()?;
        schema::clues::table
            .find(clue_id)
            .select(ClueRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(ClueRow::into_clue)
            .transpose()
    }

    /// Next free clue id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn next_clue_id(&self) -> Result<ClueId, DbError> {
        let mut conn = self.connection()?;
        let max: Option<i32> = schema::clues::table
            .select(diesel::dsl::max(schema::clues::id))
            .first(&mut conn)?;
        Ok(max.unwrap_or(0) + 1)
    }

    /// Inserts a clue with its own id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the id is taken or a database error occurs.
    #[instrument(skip(self, clue), fields(clue_id = clue.id()))]
    pub fn insert_clue(&self, clue: &Clue) -> Result<Clue, DbError> {
        let mut conn = self.connection()?;
        let row = diesel::insert_into(schema::clues::table)
            .values(ClueRow::from(clue))
            .returning(ClueRow::as_returning())
            .get_result(&mut conn)?;
        info!(clue_id = row.id(), "Clue created");
        row.into_clue()
    }

    /// Overwrites a clue. Returns `None` if no clue has that id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, clue), fields(clue_id = clue.id()))]
    pub fn update_clue(&self, clue: &Clue) -> Result<Option<Clue>, DbError> {
        let mut conn = self.connection()?;
        let row = ClueRow::from(clue);
        let updated = diesel::update(schema::clues::table.find(*clue.id()))
            .set(&row)
            .returning(ClueRow::as_returning())
            .get_result(&mut conn)
            .optional()?;
        if updated.is_some() {
            info!("Clue updated");
        } else {
            warn!("Clue to update not found");
        }
        updated.map(ClueRow::into_clue).transpose()
    }

    /// Deletes a clue. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn delete_clue(&self, clue_id: ClueId) -> Result<bool, DbError> {
        let mut conn = self.connection()?;
        let deleted = diesel::delete(schema::clues::table.find(clue_id)).execute(&mut conn)?;
        info!(deleted, "Clue delete executed");
        Ok(deleted > 0)
    }

    /// Rewrites order indices so `ids[i]` gets `i + 1`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs; nothing is changed then.
    #[instrument(skip(self))]
    pub fn reorder_clues(&self, ids: &[ClueId]) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            for (index, id) in ids.iter().enumerate() {
                let order_index = i32::try_from(index + 1)
                    .map_err(|_| DbError::new("Too many clues to reorder"))?;
                diesel::update(schema::clues::table.find(*id))
                    .set(schema::clues::order_index.eq(order_index))
                    .execute(conn)?;
            }
            Ok(())
        })?;
        info!(count = ids.len(), "Clues reordered");
        Ok(())
    }

    /// Inserts six placeholder clues when the clue table is empty.
    ///
    /// Returns the number of clues inserted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn seed_default_clues(&self) -> Result<usize, DbError> {
        let mut conn = self.connection()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            let existing: i64 = schema::clues::table.count().get_result(conn)?;
            if existing > 0 {
                debug!(existing, "Clues present, skipping seed");
                return Ok(0);
            }
            let rows: Vec<ClueRow> = (1..=6)
                .map(|i| {
                    ClueRow::from(&Clue::new(
                        i,
                        format!("Clue {i}"),
                        format!("This is Clue {i} (A)"),
                        format!("This is Clue {i} (B)"),
                        AnswerType::Tap,
                        String::new(),
                        format!("Hint for Clue {i}"),
                        i,
                        i == 6,
                    ))
                })
                .collect();
            let inserted = diesel::insert_into(schema::clues::table)
                .values(&rows)
                .execute(conn)?;
            info!(inserted, "Default clues seeded");
            Ok(inserted)
        })
    }

    // ─────────────────────────────────────────────────────────────
    //  Settings and import
    // ─────────────────────────────────────────────────────────────

    /// Loads persisted settings.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn load_settings(&self) -> Result<BTreeMap<String, i64>, DbError> {
        let mut conn = self.connection()?;
        let rows = schema::game_settings::table
            .select(SettingRow::as_select())
            .load(&mut conn)?;
        debug!(count = rows.len(), "Settings loaded");
        Ok(rows
            .into_iter()
            .map(|row| (row.key().clone(), *row.value()))
            .collect())
    }

    /// Upserts the given settings.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs; nothing is changed then.
    #[instrument(skip(self))]
    pub fn save_settings(&self, values: &BTreeMap<String, i64>) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            for (key, value) in values {
                diesel::replace_into(schema::game_settings::table)
                    .values(SettingRow::new(key.clone(), *value))
                    .execute(conn)?;
            }
            Ok(())
        })?;
        info!(count = values.len(), "Settings saved");
        Ok(())
    }

    /// Replaces every clue and setting in one transaction.
    ///
    /// Team progress is left in place.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs; nothing is changed then.
    #[instrument(skip(self, clues, settings), fields(clues = clues.len()))]
    pub fn replace_hunt(&self, clues: &[Clue], settings: &GameSettings) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let rows: Vec<ClueRow> = clues.iter().map(ClueRow::from).collect();
        let values: Vec<SettingRow> = settings
            .to_map()
            .into_iter()
            .map(|(key, value)| SettingRow::new(key, value))
            .collect();
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            diesel::delete(schema::clues::table).execute(conn)?;
            diesel::delete(schema::game_settings::table).execute(conn)?;
            diesel::insert_into(schema::clues::table)
                .values(&rows)
                .execute(conn)?;
            diesel::insert_into(schema::game_settings::table)
                .values(&values)
                .execute(conn)?;
            Ok(())
        })?;
        info!(clues = rows.len(), "Hunt replaced");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    //  Teams
    // ─────────────────────────────────────────────────────────────

    /// Gets a team by name. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_team(&self, name: &str) -> Result<Option<Team>, DbError> {
        let mut conn = self.connection()?;
        let team = schema::teams::table
            .find(name)
            .select(Team::as_select())
            .first(&mut conn)
            .optional()?;
        debug!(found = team.is_some(), "Team lookup");
        Ok(team)
    }

    /// Lists teams in the order they started.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_teams(&self) -> Result<Vec<Team>, DbError> {
        let mut conn = self.connection()?;
        let teams = schema::teams::table
            .order((schema::teams::started_at.asc(), schema::teams::name.asc()))
            .select(Team::as_select())
            .load(&mut conn)?;
        debug!(count = teams.len(), "Teams loaded");
        Ok(teams)
    }

    /// Lists all clue visits.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_visits(&self) -> Result<Vec<ClueVisit>, DbError> {
        let mut conn = self.connection()?;
        Ok(schema::clue_visits::table
            .select(ClueVisit::as_select())
            .load(&mut conn)?)
    }

    /// Lists one team's visits.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn team_visits(&self, name: &str) -> Result<Vec<ClueVisit>, DbError> {
        let mut conn = self.connection()?;
        Ok(schema::clue_visits::table
            .filter(schema::clue_visits::team_name.eq(name))
            .select(ClueVisit::as_select())
            .load(&mut conn)?)
    }

    /// Returns the team, creating it at `start` if the name is new.
    ///
    /// The boolean is `true` when the team was created by this call.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_or_create_team(
        &self,
        name: &str,
        start: Position,
        now: NaiveDateTime,
    ) -> Result<(Team, bool), DbError> {
        let mut conn = self.connection()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| {
            if let Some(team) = schema::teams::table
                .find(name)
                .select(Team::as_select())
                .first(conn)
                .optional()?
            {
                debug!("Existing team found");
                return Ok((team, false));
            }

            let team = diesel::insert_into(schema::teams::table)
                .values(NewTeam::new(name.to_string(), start.clue_id(), 0, 0, now))
                .returning(Team::as_returning())
                .get_result(conn)?;
            if let Some(clue_id) = start.clue_id() {
                diesel::insert_into(schema::clue_visits::table)
                    .values(NewClueVisit::arrive(name, clue_id, now))
                    .execute(conn)?;
            }
            info!(team = %name, ?start, "Team created");
            Ok((team, true))
        })
    }

    /// Returns the team's visit to a clue, recording arrival now if missing.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn ensure_visit(
        &self,
        name: &str,
        clue_id: ClueId,
        now: NaiveDateTime,
    ) -> Result<ClueVisit, DbError> {
        let mut conn = self.connection()?;
        conn.immediate_transaction::<_, DbError, _>(|conn| load_or_insert_visit(conn, name, clue_id, now))
    }

    /// Marks a team finished if it is still at `clue_id`.
    ///
    /// Returns whether the row changed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn finish_team(
        &self,
        name: &str,
        clue_id: ClueId,
        now: NaiveDateTime,
    ) -> Result<bool, DbError> {
        let mut conn = self.connection()?;
        let changed = diesel::update(
            schema::teams::table
                .find(name)
                .filter(schema::teams::current_clue_id.eq(clue_id))
                .filter(schema::teams::finished_at.is_null()),
        )
        .set((
            schema::teams::current_clue_id.eq(None::<i32>),
            schema::teams::finished_at.eq(Some(now)),
        ))
        .execute(&mut conn)?;
        if changed > 0 {
            info!(team = %name, "Team finished");
        }
        Ok(changed > 0)
    }

    /// Applies a scoring decision atomically.
    ///
    /// Inside one immediate transaction: loads the team, its visit to
    /// `clue_id` (recording arrival at `now` if missing) and the ids of the
    /// clues it already completed, hands them to `decide`, and writes the
    /// returned change back: score and skip counter on the team, hints and
    /// outcome on the visit, and the sequencer move. If `decide` fails,
    /// nothing is written.
    ///
    /// # Errors
    ///
    /// Returns the error from `decide`, or a [`DbError`] if the team does not
    /// exist or a database error occurs.
    #[instrument(skip(self, decide))]
    pub fn apply_progress<E, F>(
        &self,
        name: &str,
        clue_id: ClueId,
        now: NaiveDateTime,
        decide: F,
    ) -> Result<ProgressChange, E>
    where
        E: From<DbError> + From<diesel::result::Error>,
        F: FnOnce(&Team, &ClueVisit, &BTreeSet<ClueId>) -> Result<ProgressChange, E>,
    {
        let mut conn = self.connection()?;
        conn.immediate_transaction::<_, E, _>(|conn| {
            let team = schema::teams::table
                .find(name)
                .select(Team::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(|| DbError::new(format!("Team '{}' not found", name)))?;
            let visit = load_or_insert_visit(conn, name, clue_id, now)?;
            let completed: BTreeSet<ClueId> = schema::clue_visits::table
                .filter(schema::clue_visits::team_name.eq(name))
                .filter(schema::clue_visits::solved_at.is_not_null())
                .select(schema::clue_visits::clue_id)
                .load::<ClueId>(conn)?
                .into_iter()
                .collect();

            let change = decide(&team, &visit, &completed)?;

            diesel::update(schema::teams::table.find(name))
                .set((
                    schema::teams::score.eq(change.score),
                    schema::teams::skips_used.eq(change.skips_used),
                ))
                .execute(conn)?;
            diesel::update(
                schema::clue_visits::table
                    .filter(schema::clue_visits::team_name.eq(name))
                    .filter(schema::clue_visits::clue_id.eq(clue_id)),
            )
            .set((
                schema::clue_visits::hints_used.eq(change.hints_used),
                schema::clue_visits::solved_at.eq(change.solved_at),
                schema::clue_visits::skipped.eq(change.skipped),
            ))
            .execute(conn)?;

            if let Some(TeamMove { to, at }) = change.next {
                match to {
                    Position::AtClue(next_id) => {
                        diesel::update(schema::teams::table.find(name))
                            .set(schema::teams::current_clue_id.eq(Some(next_id)))
                            .execute(conn)?;
                        diesel::insert_or_ignore_into(schema::clue_visits::table)
                            .values(NewClueVisit::arrive(name, next_id, at))
                            .execute(conn)?;
                    }
                    Position::Finished => {
                        diesel::update(schema::teams::table.find(name))
                            .set((
                                schema::teams::current_clue_id.eq(None::<i32>),
                                schema::teams::finished_at.eq(Some(at)),
                            ))
                            .execute(conn)?;
                    }
                }
            }

            info!(team = %name, clue_id, score = change.score, next = ?change.next, "Progress applied");
            Ok(change)
        })
    }

    /// Deletes every team and visit. Clues and settings stay.
    ///
    /// Returns the number of teams removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn reset_progress(&self) -> Result<usize, DbError> {
        let mut conn = self.connection()?;
        let removed = conn.immediate_transaction::<_, DbError, _>(|conn| {
            diesel::delete(schema::clue_visits::table).execute(conn)?;
            Ok(diesel::delete(schema::teams::table).execute(conn)?)
        })?;
        warn!(removed, "All team progress cleared");
        Ok(removed)
    }
}

/// Loads a visit inside an open transaction, inserting it if missing.
fn load_or_insert_visit(
    conn: &mut SqliteConnection,
    name: &str,
    clue_id: ClueId,
    now: NaiveDateTime,
) -> Result<ClueVisit, DbError> {
    let existing = schema::clue_visits::table
        .filter(schema::clue_visits::team_name.eq(name))
        .filter(schema::clue_visits::clue_id.eq(clue_id))
        .select(ClueVisit::as_select())
        .first(conn)
        .optional()?;
    if let Some(visit) = existing {
        return Ok(visit);
    }
    debug!(team = %name, clue_id, "Recording arrival");
    Ok(diesel::insert_into(schema::clue_visits::table)
        .values(NewClueVisit::arrive(name, clue_id, now))
        .returning(ClueVisit::as_returning())
        .get_result(conn)?)
}
