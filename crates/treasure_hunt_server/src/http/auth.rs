//! HTTP Basic Auth gate for the admin routes.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, warn};

use crate::http::AppState;

/// Whether the request carries the admin password.
///
/// Any user name is accepted. An empty configured password locks the admin
/// area entirely.
pub fn is_authorized(headers: &HeaderMap, password: &str) -> bool {
    if password.is_empty() {
        return false;
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
        .and_then(|encoded| STANDARD.decode(encoded.trim()).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok())
        .and_then(|credentials| {
            credentials
                .split_once(':')
                .map(|(_, given)| given == password)
        })
        .unwrap_or(false)
}

/// Middleware rejecting requests without the admin password.
pub async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if is_authorized(request.headers(), state.admin_password()) {
        debug!(uri = %request.uri(), "Admin request authorized");
        return next.run(request).await;
    }
    warn!(uri = %request.uri(), "Admin request rejected");
    unauthorized()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static("Basic realm=\"Admin\""),
        )],
        "Authentication required",
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(credentials: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let value = format!("Basic {}", STANDARD.encode(credentials));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
        headers
    }

    #[test]
    fn test_password_must_match() {
        assert!(is_authorized(&basic("admin:hunter2"), "hunter2"));
        assert!(is_authorized(&basic("anyone:hunter2"), "hunter2"));
        assert!(!is_authorized(&basic("admin:wrong"), "hunter2"));
        assert!(!is_authorized(&HeaderMap::new(), "hunter2"));
    }

    #[test]
    fn test_empty_password_locks_admin() {
        assert!(!is_authorized(&basic("admin:"), ""));
    }
}
