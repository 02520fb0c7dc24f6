//! Error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use crate::{DbError, HuntError, HuntService};

impl HuntError {
    /// Status code reported to HTTP clients.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Scoring(_) | Self::Stale { .. } => StatusCode::CONFLICT,
            Self::ClueNotFound(_) => StatusCode::NOT_FOUND,
            Self::Document(_) | Self::Settings(_) | Self::InvalidClue(_) | Self::Invalid(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl IntoResponse for HuntError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            warn!(error = %self, %status, "Request rejected");
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Runs a service call on the blocking pool.
pub async fn blocking<T, F>(service: &HuntService, call: F) -> Result<T, HuntError>
where
    T: Send + 'static,
    F: FnOnce(&HuntService) -> Result<T, HuntError> + Send + 'static,
{
    let service = service.clone();
    tokio::task::spawn_blocking(move || call(&service))
        .await
        .map_err(|e| HuntError::Db(DbError::new(format!("Worker task failed: {}", e))))?
}
