//! Treasure hunt server.
//!
//! SQLite-backed progress store, the game service that drives the rules in
//! [`treasure_hunt`], and an axum HTTP surface for players and admins.
//!
//! # Architecture
//!
//! - **db**: diesel models, embedded migrations and [`HuntRepository`]
//! - **service**: [`HuntService`], the player flow and admin operations
//! - **http**: router, signed team cookie, Basic Auth admin gate
//! - **config**: [`ServerConfig`] layered from TOML, environment and flags

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod clock;
mod config;
mod db;
mod error;
pub mod http;
mod service;
pub mod views;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, ServerConfig, settings_overrides};
pub use db::{
    ClueRow, ClueVisit, DbError, HuntRepository, NewClueVisit, NewTeam, ProgressChange,
    SettingRow, Team, TeamMove,
};
pub use error::HuntError;
pub use http::{AppState, router};
pub use service::{ClueDraft, HuntService, normalize_team_name};
