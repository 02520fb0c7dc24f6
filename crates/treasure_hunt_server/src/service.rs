//! Game service: player flow and admin operations over the repository.
//!
//! Every mutation goes through [`HuntRepository::apply_progress`], whose
//! closure re-checks the team's position inside the write transaction. A
//! request for a clue the team already left fails with
//! [`HuntError::Stale`] and writes nothing, so solves, hints and skips are
//! applied at most once however many copies of a request arrive.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use treasure_hunt::{
    AnswerType, Clue, ClueId, ClueProgress, ClueSequence, GameSettings, HuntDocument, Position,
    SETTING_KEYS, ScoreUpdate, ScoringEngine, ScoringError, ScoringEvent, SettingsError,
    select_variant,
};

use crate::views::{
    AdminDashboard, ClueView, FinishSummary, Flash, FlashLevel, LeaderboardRow, PlayerOutcome,
    RedirectTarget, TeamSummary, VariantPreview, format_duration,
};
use crate::{Clock, HuntError, HuntRepository, ProgressChange, SystemClock, Team, TeamMove};

/// Clue fields as submitted by the admin editor.
///
/// `id` and `order_index` may be left out on create; the next free id and
/// the end of the play order are used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClueDraft {
    /// Explicit id for a new clue.
    #[serde(default)]
    pub id: Option<ClueId>,
    /// Title.
    pub title: String,
    /// Body shown to variant A.
    pub body_variant_a: String,
    /// Body shown to variant B.
    pub body_variant_b: String,
    /// How the clue is answered.
    pub answer_type: AnswerType,
    /// Accepted answers or choices.
    #[serde(default)]
    pub answer_payload: String,
    /// Hint text.
    #[serde(default)]
    pub hint_text: String,
    /// Place in play order.
    #[serde(default)]
    pub order_index: Option<i32>,
    /// Whether this clue ends the hunt.
    #[serde(default)]
    pub is_final: bool,
}

impl ClueDraft {
    fn into_clue(self, id: ClueId, order_index: i32) -> Clue {
        Clue::new(
            id,
            self.title.trim().to_string(),
            self.body_variant_a,
            self.body_variant_b,
            self.answer_type,
            self.answer_payload.trim().to_string(),
            self.hint_text,
            order_index,
            self.is_final,
        )
    }
}

/// Trims a submitted team name. `None` when nothing is left.
pub fn normalize_team_name(raw: &str) -> Option<String> {
    let name = raw.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Player request that passed the position checks.
enum Turn {
    Playing {
        team: Team,
        clue: Box<Clue>,
        sequence: ClueSequence,
    },
    Done(PlayerOutcome),
}

/// Business logic for the hunt.
#[derive(Debug, Clone)]
pub struct HuntService {
    repository: HuntRepository,
    settings: Arc<RwLock<GameSettings>>,
    env_overrides: Arc<BTreeMap<String, String>>,
    clock: Arc<dyn Clock>,
}

impl HuntService {
    /// Prepares the database and resolves the settings in force.
    ///
    /// Runs migrations, seeds placeholder clues into an empty hunt, then
    /// resolves settings from defaults, persisted values and `env_overrides`.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError`] if the database cannot be prepared or an
    /// override is invalid.
    #[instrument(skip(repository, env_overrides))]
    pub fn open(
        repository: HuntRepository,
        env_overrides: BTreeMap<String, String>,
    ) -> Result<Self, HuntError> {
        info!("Opening HuntService");
        repository.run_migrations()?;
        let seeded = repository.seed_default_clues()?;
        if seeded > 0 {
            info!(seeded, "Seeded placeholder clues");
        }
        let settings = GameSettings::resolve(&repository.load_settings()?, &env_overrides)?;
        debug!(?settings, "Settings resolved");
        Ok(Self {
            repository,
            settings: Arc::new(RwLock::new(settings)),
            env_overrides: Arc::new(env_overrides),
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Returns the underlying repository.
    pub fn repository(&self) -> &HuntRepository {
        &self.repository
    }

    /// Settings currently in force.
    pub fn settings(&self) -> GameSettings {
        *self
            .settings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn engine(&self) -> ScoringEngine {
        ScoringEngine::new(self.settings())
    }

    fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    // ─────────────────────────────────────────────────────────────
    //  Player flow
    // ─────────────────────────────────────────────────────────────

    /// Starts a team, or resumes it if the name is taken.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn start(&self, raw_name: &str) -> Result<PlayerOutcome, HuntError> {
        let Some(name) = normalize_team_name(raw_name) else {
            return Ok(PlayerOutcome::redirect(
                RedirectTarget::Identity,
                FlashLevel::Danger,
                "Please enter a team name.",
            ));
        };

        let sequence = ClueSequence::from_clues(&self.repository.list_clues()?);
        if let Some(team) = self.repository.get_team(&name)? {
            let position = self.reconcile(&team, &sequence)?;
            info!(team = %name, ?position, "Team resumed");
            return Ok(PlayerOutcome::redirect(
                position.into(),
                FlashLevel::Info,
                format!("Welcome back, {name}."),
            ));
        }

        if sequence.is_empty() {
            warn!("Start requested with no clues configured");
            return Ok(PlayerOutcome::redirect(
                RedirectTarget::Identity,
                FlashLevel::Warning,
                "No clues configured.",
            ));
        }

        let (team, created) =
            self.repository
                .get_or_create_team(&name, sequence.start(), self.now())?;
        let message = if created {
            format!("Good luck, {name}!")
        } else {
            format!("Welcome back, {name}.")
        };
        Ok(PlayerOutcome::redirect(
            team.position().into(),
            FlashLevel::Success,
            message,
        ))
    }

    /// Shows a clue to the team that is on it.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn view_clue(
        &self,
        team_name: Option<&str>,
        clue_id: ClueId,
    ) -> Result<PlayerOutcome, HuntError> {
        let (team, clue, sequence) = match self.turn(team_name, clue_id)? {
            Turn::Done(outcome) => return Ok(outcome),
            Turn::Playing {
                team,
                clue,
                sequence,
            } => (team, clue, sequence),
        };

        let now = self.now();
        let visit = self.repository.ensure_visit(team.name(), clue_id, now)?;
        let variant = visit.parse_variant()?;
        let engine = self.engine();
        let hints_used = *visit.hints_used();

        let view = ClueView {
            team: team.name().clone(),
            clue_id,
            title: clue.title().clone(),
            variant,
            body: clue.body(variant).to_string(),
            answer_type: *clue.answer_type(),
            choices: clue.choices(),
            hint_text: (hints_used > 0).then(|| clue.hint_text().clone()),
            hints_used,
            hint_available_in: engine
                .hint_availability(*visit.arrived_at(), now)
                .remaining_seconds(),
            elapsed_seconds: ScoringEngine::elapsed_seconds(*visit.arrived_at(), now),
            score: *team.score(),
            position: sequence.ordinal(clue_id).unwrap_or(sequence.len()),
            total: sequence.len(),
            messages: Vec::new(),
        };
        debug!(team = %view.team, clue_id, variant = %variant, "Clue shown");
        Ok(PlayerOutcome::Show(Box::new(view)))
    }

    /// Checks an answer and, if correct, awards points and advances the team.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError`] if a database error occurs.
    #[instrument(skip(self, answer))]
    pub fn submit(
        &self,
        team_name: Option<&str>,
        clue_id: ClueId,
        answer: &str,
    ) -> Result<PlayerOutcome, HuntError> {
        let (team, clue, sequence) = match self.turn(team_name, clue_id)? {
            Turn::Done(outcome) => return Ok(outcome),
            Turn::Playing {
                team,
                clue,
                sequence,
            } => (team, clue, sequence),
        };

        if !clue.accepts(answer) {
            debug!(team = %team.name(), clue_id, "Wrong answer");
            return Ok(PlayerOutcome::redirect(
                RedirectTarget::Clue(clue_id),
                FlashLevel::Danger,
                "Try again.",
            ));
        }

        let now = self.now();
        match self.record(team.name(), clue_id, &sequence, ScoringEvent::Solve { at: now }, now) {
            Ok((update, next)) => {
                let message = if *update.time_penalty() > 0 {
                    format!(
                        "Solved! {:+} points ({} lost to time).",
                        update.delta(),
                        update.time_penalty()
                    )
                } else {
                    format!("Solved! {:+} points.", update.delta())
                };
                Ok(PlayerOutcome::redirect(next.into(), FlashLevel::Success, message))
            }
            Err(HuntError::Stale { .. }) => self.already_recorded(team.name(), &sequence),
            Err(e) => Err(e),
        }
    }

    /// Takes a hint on the team's current clue.
    ///
    /// `seen` is the hint count the page showed; a request carrying an
    /// outdated count is treated as a duplicate and changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn hint(
        &self,
        team_name: Option<&str>,
        clue_id: ClueId,
        seen: Option<i32>,
    ) -> Result<PlayerOutcome, HuntError> {
        let (team, clue, sequence) = match self.turn(team_name, clue_id)? {
            Turn::Done(outcome) => return Ok(outcome),
            Turn::Playing {
                team,
                clue,
                sequence,
            } => (team, clue, sequence),
        };

        let now = self.now();
        let event = ScoringEvent::HintUsed { at: now, seen };
        let here = RedirectTarget::Clue(clue_id);
        match self.record(team.name(), clue_id, &sequence, event, now) {
            Ok((update, _)) => Ok(PlayerOutcome::Redirect {
                target: here,
                flashes: vec![
                    Flash::new(FlashLevel::Warning, format!("Hint: {}", clue.hint_text())),
                    Flash::new(
                        FlashLevel::Info,
                        format!("Hint used ({:+} points).", update.delta()),
                    ),
                ],
            }),
            Err(HuntError::Scoring(ScoringError::HintNotYetAvailable { remaining_seconds })) => {
                Ok(PlayerOutcome::redirect(
                    here,
                    FlashLevel::Warning,
                    format!("Hint available in {remaining_seconds}s."),
                ))
            }
            Err(HuntError::Scoring(ScoringError::DuplicateHint { .. })) => Ok(
                PlayerOutcome::redirect(here, FlashLevel::Info, "Hint already shown."),
            ),
            Err(HuntError::Stale { .. }) => self.already_recorded(team.name(), &sequence),
            Err(e) => Err(e),
        }
    }

    /// Abandons the team's current clue for a penalty.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn skip(
        &self,
        team_name: Option<&str>,
        clue_id: ClueId,
    ) -> Result<PlayerOutcome, HuntError> {
        let (team, _, sequence) = match self.turn(team_name, clue_id)? {
            Turn::Done(outcome) => return Ok(outcome),
            Turn::Playing {
                team,
                clue,
                sequence,
            } => (team, clue, sequence),
        };

        let now = self.now();
        match self.record(team.name(), clue_id, &sequence, ScoringEvent::Skip { at: now }, now) {
            Ok((update, next)) => Ok(PlayerOutcome::redirect(
                next.into(),
                FlashLevel::Warning,
                format!("Skipped ({:+} points).", update.delta()),
            )),
            Err(HuntError::Stale { .. }) => self.already_recorded(team.name(), &sequence),
            Err(e) => Err(e),
        }
    }

    /// Ranked standings.
    ///
    /// Ordered by score, then finished teams first, then shorter time,
    /// then name.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn leaderboard(&self) -> Result<Vec<LeaderboardRow>, HuntError> {
        let sequence = ClueSequence::from_clues(&self.repository.list_clues()?);
        let mut teams = self.repository.list_teams()?;
        teams.sort_by(|a, b| {
            b.score()
                .cmp(a.score())
                .then_with(|| b.finished_at().is_some().cmp(&a.finished_at().is_some()))
                .then_with(|| {
                    a.elapsed_seconds()
                        .unwrap_or(i64::MAX)
                        .cmp(&b.elapsed_seconds().unwrap_or(i64::MAX))
                })
                .then_with(|| a.name().cmp(b.name()))
        });

        let rows: Vec<LeaderboardRow> = teams
            .iter()
            .enumerate()
            .map(|(index, team)| {
                let elapsed = team.elapsed_seconds();
                let time = match (elapsed, team.current_clue_id()) {
                    (Some(seconds), _) => format_duration(seconds),
                    (None, current) => format!(
                        "Clue {} of {}",
                        progress_ordinal(&sequence, *current),
                        sequence.len()
                    ),
                };
                LeaderboardRow {
                    rank: index + 1,
                    team: team.name().clone(),
                    score: *team.score(),
                    time,
                    finished: elapsed.is_some(),
                    elapsed_seconds: elapsed,
                }
            })
            .collect();
        debug!(count = rows.len(), "Leaderboard built");
        Ok(rows)
    }

    /// Summary for the finished page.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn finish_summary(&self, team_name: Option<&str>) -> Result<FinishSummary, HuntError> {
        let Some(team) = self.session_team(team_name)? else {
            return Ok(FinishSummary::default());
        };
        let hints: i64 = self
            .repository
            .team_visits(team.name())?
            .iter()
            .map(|visit| i64::from(*visit.hints_used()))
            .sum();
        let seconds = team
            .elapsed_seconds()
            .unwrap_or_else(|| ScoringEngine::elapsed_seconds(*team.started_at(), self.now()));
        Ok(FinishSummary {
            team: Some(team.name().clone()),
            score: Some(*team.score()),
            hints: Some(hints),
            skips: Some(*team.skips_used()),
            time: Some(format_duration(seconds)),
            messages: Vec::new(),
        })
    }

    // ─────────────────────────────────────────────────────────────
    //  Admin
    // ─────────────────────────────────────────────────────────────

    /// Teams and their progress.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn dashboard(&self) -> Result<AdminDashboard, HuntError> {
        let sequence = ClueSequence::from_clues(&self.repository.list_clues()?);
        let mut hints: HashMap<String, i64> = HashMap::new();
        for visit in self.repository.list_visits()? {
            *hints.entry(visit.team_name().clone()).or_default() +=
                i64::from(*visit.hints_used());
        }

        let teams: Vec<TeamSummary> = self
            .repository
            .list_teams()?
            .into_iter()
            .map(|team| {
                let current = match team.position() {
                    Position::Finished => "Finished".to_string(),
                    Position::AtClue(id) => format!(
                        "{}/{}",
                        progress_ordinal(&sequence, Some(id)),
                        sequence.len()
                    ),
                };
                TeamSummary {
                    hints: hints.get(team.name()).copied().unwrap_or(0),
                    current,
                    skips: *team.skips_used(),
                    score: *team.score(),
                    started_at: *team.started_at(),
                    finished_at: *team.finished_at(),
                    name: team.name().clone(),
                }
            })
            .collect();

        Ok(AdminDashboard {
            active_teams: teams.len(),
            total_clues: sequence.len(),
            teams,
        })
    }

    /// Deletes all team progress. Returns the number of teams removed.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn reset(&self) -> Result<usize, HuntError> {
        Ok(self.repository.reset_progress()?)
    }

    /// All clues in play order.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_clues(&self) -> Result<Vec<Clue>, HuntError> {
        Ok(self.repository.list_clues()?)
    }

    /// One clue.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError::ClueNotFound`] for an unknown id.
    #[instrument(skip(self))]
    pub fn get_clue(&self, clue_id: ClueId) -> Result<Clue, HuntError> {
        self.repository
            .get_clue(clue_id)?
            .ok_or(HuntError::ClueNotFound(clue_id))
    }

    /// Creates a clue.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError`] if the id is taken, the clue is invalid or a
    /// database error occurs.
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub fn create_clue(&self, draft: ClueDraft) -> Result<Clue, HuntError> {
        let id = match draft.id {
            Some(id) => {
                if self.repository.get_clue(id)?.is_some() {
                    return Err(HuntError::Invalid(format!("Clue {id} already exists")));
                }
                id
            }
            None => self.repository.next_clue_id()?,
        };
        let order_index = match draft.order_index {
            Some(order_index) => order_index,
            None => {
                let last = self
                    .repository
                    .list_clues()?
                    .iter()
                    .map(|c| *c.order_index())
                    .max()
                    .unwrap_or(0);
                last + 1
            }
        };
        let clue = draft.into_clue(id, order_index);
        clue.validate()?;
        let created = self.repository.insert_clue(&clue)?;
        info!(clue_id = created.id(), "Clue created");
        Ok(created)
    }

    /// Overwrites a clue.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError`] if the clue does not exist or is invalid, or a
    /// database error occurs.
    #[instrument(skip(self, draft))]
    pub fn update_clue(&self, clue_id: ClueId, draft: ClueDraft) -> Result<Clue, HuntError> {
        let existing = self.get_clue(clue_id)?;
        let order_index = draft.order_index.unwrap_or(*existing.order_index());
        let clue = draft.into_clue(clue_id, order_index);
        clue.validate()?;
        self.repository
            .update_clue(&clue)?
            .ok_or(HuntError::ClueNotFound(clue_id))
    }

    /// Deletes a clue.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError::ClueNotFound`] for an unknown id.
    #[instrument(skip(self))]
    pub fn delete_clue(&self, clue_id: ClueId) -> Result<(), HuntError> {
        if self.repository.delete_clue(clue_id)? {
            Ok(())
        } else {
            Err(HuntError::ClueNotFound(clue_id))
        }
    }

    /// Sets the play order. `ids` must list every clue exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError::Invalid`] if `ids` is not a permutation of the
    /// clue ids.
    #[instrument(skip(self))]
    pub fn reorder_clues(&self, ids: &[ClueId]) -> Result<Vec<Clue>, HuntError> {
        let existing: BTreeSet<ClueId> = self
            .repository
            .list_clues()?
            .iter()
            .map(|c| *c.id())
            .collect();
        let requested: BTreeSet<ClueId> = ids.iter().copied().collect();
        if requested.len() != ids.len() || requested != existing {
            warn!(?ids, "Rejected reorder");
            return Err(HuntError::Invalid(
                "Reorder must list every clue exactly once".to_string(),
            ));
        }
        self.repository.reorder_clues(ids)?;
        self.list_clues()
    }

    /// Updates persisted settings and re-resolves the settings in force.
    ///
    /// Environment overrides keep precedence over the stored values.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError::Settings`] for an unknown key or an out-of-range
    /// value; nothing is stored then.
    #[instrument(skip(self))]
    pub fn update_settings(&self, values: &BTreeMap<String, i64>) -> Result<GameSettings, HuntError> {
        if let Some(key) = values.keys().find(|k| !SETTING_KEYS.contains(&k.as_str())) {
            return Err(SettingsError::new(format!("Unknown setting '{key}'")).into());
        }
        let mut persisted = self.repository.load_settings()?;
        persisted.extend(values.iter().map(|(k, v)| (k.clone(), *v)));
        GameSettings::resolve(&persisted, &BTreeMap::new())?;
        let resolved = GameSettings::resolve(&persisted, &self.env_overrides)?;

        self.repository.save_settings(values)?;
        self.replace_settings(resolved);
        info!(?resolved, "Settings updated");
        Ok(resolved)
    }

    /// The whole hunt as a document, with the settings in force.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn export(&self) -> Result<HuntDocument, HuntError> {
        Ok(HuntDocument::new(self.repository.list_clues()?, self.settings()))
    }

    /// Replaces all clues and settings from a JSON document.
    ///
    /// The document is validated in full first; a rejected document leaves
    /// clues and settings unchanged. Returns the number of clues imported.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError::Document`] for a rejected document.
    #[instrument(skip(self, json), fields(bytes = json.len()))]
    pub fn import_json(&self, json: &str) -> Result<usize, HuntError> {
        let (clues, config) = HuntDocument::from_json(json)?.into_parts();
        self.repository.replace_hunt(&clues, &config)?;
        let resolved = GameSettings::resolve(&self.repository.load_settings()?, &self.env_overrides)?;
        self.replace_settings(resolved);
        info!(clues = clues.len(), "Hunt imported");
        Ok(clues.len())
    }

    /// Which variant a team would see on a clue.
    ///
    /// # Errors
    ///
    /// Returns [`HuntError`] for an empty team name or unknown clue.
    #[instrument(skip(self))]
    pub fn preview_variant(&self, team_name: &str, clue_id: ClueId) -> Result<VariantPreview, HuntError> {
        let team = normalize_team_name(team_name)
            .ok_or_else(|| HuntError::Invalid("Team name is required".to_string()))?;
        let clue = self.get_clue(clue_id)?;
        let variant = select_variant(&team, clue_id);
        Ok(VariantPreview {
            body: clue.body(variant).to_string(),
            title: clue.title().clone(),
            team,
            clue_id,
            variant,
        })
    }

    // ─────────────────────────────────────────────────────────────
    //  Internals
    // ─────────────────────────────────────────────────────────────

    fn replace_settings(&self, settings: GameSettings) {
        *self
            .settings
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = settings;
    }

    fn session_team(&self, team_name: Option<&str>) -> Result<Option<Team>, HuntError> {
        match team_name.and_then(normalize_team_name) {
            Some(name) => Ok(self.repository.get_team(&name)?),
            None => Ok(None),
        }
    }

    /// Finishes a team whose current clue is no longer in play.
    fn reconcile(&self, team: &Team, sequence: &ClueSequence) -> Result<Position, HuntError> {
        match team.position() {
            Position::AtClue(id) if sequence.resolve(id).is_finished() => {
                warn!(team = %team.name(), clue_id = id, "Current clue no longer in play");
                self.repository.finish_team(team.name(), id, self.now())?;
                Ok(Position::Finished)
            }
            position => Ok(position),
        }
    }

    /// Resolves the session and checks the team is on `clue_id`.
    fn turn(&self, team_name: Option<&str>, clue_id: ClueId) -> Result<Turn, HuntError> {
        let Some(team) = self.session_team(team_name)? else {
            return Ok(Turn::Done(PlayerOutcome::redirect(
                RedirectTarget::Identity,
                FlashLevel::Info,
                "Pick a team name to start.",
            )));
        };

        let clues = self.repository.list_clues()?;
        let sequence = ClueSequence::from_clues(&clues);
        if sequence.resolve(clue_id).is_finished() {
            debug!(clue_id, "Clue out of range");
            return Ok(Turn::Done(PlayerOutcome::redirect_silently(
                RedirectTarget::Finished,
            )));
        }

        match self.reconcile(&team, &sequence)? {
            Position::Finished => Ok(Turn::Done(PlayerOutcome::redirect_silently(
                RedirectTarget::Finished,
            ))),
            Position::AtClue(current) if current != clue_id => {
                debug!(current, requested = clue_id, "Redirecting to current clue");
                Ok(Turn::Done(PlayerOutcome::redirect(
                    RedirectTarget::Clue(current),
                    FlashLevel::Info,
                    "Continue with your current clue.",
                )))
            }
            Position::AtClue(_) => {
                let clue = clues
                    .into_iter()
                    .find(|c| *c.id() == clue_id)
                    .ok_or(HuntError::ClueNotFound(clue_id))?;
                Ok(Turn::Playing {
                    team,
                    clue: Box::new(clue),
                    sequence,
                })
            }
        }
    }

    /// Applies one scoring event with the position check inside the write.
    ///
    /// Returns the score update and where the team now stands.
    fn record(
        &self,
        team_name: &str,
        clue_id: ClueId,
        sequence: &ClueSequence,
        event: ScoringEvent,
        now: NaiveDateTime,
    ) -> Result<(ScoreUpdate, Position), HuntError> {
        let engine = self.engine();
        let mut applied = None;
        let change = self
            .repository
            .apply_progress(team_name, clue_id, now, |team, visit, completed| {
                if team.position() != Position::AtClue(clue_id) || visit.solved_at().is_some() {
                    return Err(HuntError::Stale {
                        team: team_name.to_string(),
                        clue_id,
                    });
                }
                let progress = ClueProgress::new(
                    *team.score(),
                    *visit.hints_used(),
                    *team.skips_used(),
                    *visit.arrived_at(),
                );
                let update = engine.apply(&progress, event)?;
                applied = Some(update);

                let (solved_at, skipped) = match event {
                    ScoringEvent::Solve { .. } => (Some(now), false),
                    ScoringEvent::Skip { .. } => (Some(now), true),
                    ScoringEvent::HintUsed { .. } => (*visit.solved_at(), *visit.skipped()),
                };
                Ok(ProgressChange {
                    score: *update.score(),
                    skips_used: *update.skips_used(),
                    hints_used: *update.hints_used(),
                    solved_at,
                    skipped,
                    next: update.advances().then(|| TeamMove {
                        to: sequence.advance(clue_id, completed),
                        at: now,
                    }),
                })
            })?;

        let update = applied.ok_or_else(|| HuntError::Invalid("No score update".to_string()))?;
        let position = change
            .next
            .map(|step| step.to)
            .unwrap_or(Position::AtClue(clue_id));
        Ok((update, position))
    }

    /// Response for a request that lost the race: send the team to wherever
    /// it is now.
    fn already_recorded(
        &self,
        team_name: &str,
        sequence: &ClueSequence,
    ) -> Result<PlayerOutcome, HuntError> {
        let position = match self.repository.get_team(team_name)? {
            Some(team) => self.reconcile(&team, sequence)?,
            None => return Ok(PlayerOutcome::redirect_silently(RedirectTarget::Identity)),
        };
        info!(team = %team_name, ?position, "Duplicate request ignored");
        Ok(PlayerOutcome::redirect(
            position.into(),
            FlashLevel::Info,
            "Already recorded.",
        ))
    }
}

/// One-based place of the team's current clue, or the total when unknown.
fn progress_ordinal(sequence: &ClueSequence, current: Option<ClueId>) -> usize {
    current
        .and_then(|id| sequence.ordinal(id))
        .unwrap_or(sequence.len())
}
