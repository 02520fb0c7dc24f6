//! Progress store: clues, team progress and persisted settings in SQLite.

mod error;
mod models;
mod repository;
mod schema;

pub use error::DbError;
pub use models::{ClueRow, ClueVisit, NewClueVisit, NewTeam, SettingRow, Team};
pub use repository::{HuntRepository, ProgressChange, TeamMove};
