//! Game settings.
//!
//! Six integer knobs, each stored under a fixed key. Effective values are
//! resolved in layers: compiled-in defaults, then values persisted by the
//! admin, then environment overrides.

use std::collections::BTreeMap;

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Seconds before a hint unlocks on a clue.
pub const HINT_DELAY_SECONDS: &str = "HINT_DELAY_SECONDS";
/// Points awarded for a solve.
pub const POINTS_SOLVE: &str = "POINTS_SOLVE";
/// Points deducted per hint.
pub const PENALTY_HINT: &str = "PENALTY_HINT";
/// Points deducted per skip.
pub const PENALTY_SKIP: &str = "PENALTY_SKIP";
/// Length of one time-penalty window.
pub const TIME_PENALTY_WINDOW_SECONDS: &str = "TIME_PENALTY_WINDOW_SECONDS";
/// Points deducted per elapsed window.
pub const TIME_PENALTY_POINTS: &str = "TIME_PENALTY_POINTS";

/// Every settings key, in display order.
pub const SETTING_KEYS: [&str; 6] = [
    HINT_DELAY_SECONDS,
    POINTS_SOLVE,
    PENALTY_HINT,
    PENALTY_SKIP,
    TIME_PENALTY_WINDOW_SECONDS,
    TIME_PENALTY_POINTS,
];

/// Largest magnitude any setting may take.
pub const SETTING_LIMIT: i64 = 1_000_000;

/// Invalid settings value or key.
#[derive(Debug, Clone, Display, Error)]
#[display("Settings error: {} at {}:{}", message, file, line)]
pub struct SettingsError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl SettingsError {
    /// Creates a new settings error with caller location tracking.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Effective game settings.
///
/// Penalties are stored as positive magnitudes and subtracted when applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct GameSettings {
    #[serde(rename = "HINT_DELAY_SECONDS")]
    hint_delay_seconds: i64,
    #[serde(rename = "POINTS_SOLVE")]
    points_solve: i64,
    #[serde(rename = "PENALTY_HINT")]
    penalty_hint: i64,
    #[serde(rename = "PENALTY_SKIP")]
    penalty_skip: i64,
    #[serde(rename = "TIME_PENALTY_WINDOW_SECONDS")]
    time_penalty_window_seconds: i64,
    #[serde(rename = "TIME_PENALTY_POINTS")]
    time_penalty_points: i64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            hint_delay_seconds: 20,
            points_solve: 10,
            penalty_hint: 3,
            penalty_skip: 8,
            time_penalty_window_seconds: 120,
            time_penalty_points: 1,
        }
    }
}

impl GameSettings {
    /// Resolves settings from persisted values and environment overrides.
    ///
    /// `env` holds raw strings as read from the process environment; only
    /// known keys are consulted.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if an override is not an integer or the
    /// resulting settings are invalid.
    #[instrument(skip(persisted, env))]
    pub fn resolve(
        persisted: &BTreeMap<String, i64>,
        env: &BTreeMap<String, String>,
    ) -> Result<Self, SettingsError> {
        let mut settings = Self::default();
        for (key, value) in persisted {
            if !settings.set(key, *value) {
                warn!(key = %key, "Ignoring unknown persisted setting");
            }
        }
        for key in SETTING_KEYS {
            if let Some(raw) = env.get(key) {
                let value = raw.trim().parse::<i64>().map_err(|e| {
                    SettingsError::new(format!("{key} override '{raw}' is not an integer: {e}"))
                })?;
                debug!(key, value, "Environment override");
                settings.set(key, value);
            }
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Checks value ranges.
    ///
    /// Every value must lie within [`SETTING_LIMIT`] of zero. The hint delay
    /// may not be negative and a window lasts at least one second.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] naming the first value out of range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for key in SETTING_KEYS {
            let value = self.get(key).unwrap_or_default();
            let min = match key {
                HINT_DELAY_SECONDS => 0,
                TIME_PENALTY_WINDOW_SECONDS => 1,
                _ => -SETTING_LIMIT,
            };
            if !(min..=SETTING_LIMIT).contains(&value) {
                return Err(SettingsError::new(format!(
                    "{key} must be between {min} and {SETTING_LIMIT}, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Looks a value up by key.
    pub fn get(&self, key: &str) -> Option<i64> {
        match key {
            HINT_DELAY_SECONDS => Some(self.hint_delay_seconds),
            POINTS_SOLVE => Some(self.points_solve),
            PENALTY_HINT => Some(self.penalty_hint),
            PENALTY_SKIP => Some(self.penalty_skip),
            TIME_PENALTY_WINDOW_SECONDS => Some(self.time_penalty_window_seconds),
            TIME_PENALTY_POINTS => Some(self.time_penalty_points),
            _ => None,
        }
    }

    /// Sets a value by key. Returns `false` for unknown keys.
    pub fn set(&mut self, key: &str, value: i64) -> bool {
        let slot = match key {
            HINT_DELAY_SECONDS => &mut self.hint_delay_seconds,
            POINTS_SOLVE => &mut self.points_solve,
            PENALTY_HINT => &mut self.penalty_hint,
            PENALTY_SKIP => &mut self.penalty_skip,
            TIME_PENALTY_WINDOW_SECONDS => &mut self.time_penalty_window_seconds,
            TIME_PENALTY_POINTS => &mut self.time_penalty_points,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// All values keyed by name.
    pub fn to_map(&self) -> BTreeMap<String, i64> {
        SETTING_KEYS
            .iter()
            .filter_map(|k| self.get(k).map(|v| ((*k).to_string(), v)))
            .collect()
    }
}
