//! HTTP surface: player pages, leaderboard, admin API.
//!
//! Page rendering is left to the client; rendered states are returned as
//! JSON and page transitions as `303 See Other` redirects.

mod admin;
mod auth;
mod error;
mod player;
mod session;

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use axum::{Router, middleware};
use tower::ServiceBuilder;
use tracing::{info, instrument};

use crate::{ConfigError, HuntService, ServerConfig};

pub use auth::is_authorized;
pub use error::blocking;
pub use session::{
    FLASH_COOKIE, SessionSigner, TEAM_COOKIE, clear_flash_cookie, cookie, flash_cookie,
    take_flashes,
};

/// Shared state for all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    service: HuntService,
    signer: SessionSigner,
    admin_password: Arc<str>,
}

impl AppState {
    /// Builds handler state from the service and server configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the secret key is rejected.
    #[instrument(skip(service, config))]
    pub fn new(service: HuntService, config: &ServerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            service,
            signer: SessionSigner::new(config.secret_key())?,
            admin_password: Arc::from(config.admin_password().as_str()),
        })
    }

    /// The game service.
    pub fn service(&self) -> &HuntService {
        &self.service
    }

    /// The session signer.
    pub fn signer(&self) -> &SessionSigner {
        &self.signer
    }

    /// The shared admin password.
    pub fn admin_password(&self) -> &str {
        &self.admin_password
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/admin", get(admin::dashboard))
        .route("/admin/reset", post(admin::reset))
        .route("/admin/clues", get(admin::list_clues).post(admin::create_clue))
        .route("/admin/clues/reorder", post(admin::reorder_clues))
        .route(
            "/admin/clues/{id}",
            get(admin::get_clue)
                .put(admin::update_clue)
                .delete(admin::delete_clue),
        )
        .route(
            "/admin/config",
            get(admin::get_config).put(admin::update_config),
        )
        .route("/admin/export", get(admin::export))
        .route("/admin/import", post(admin::import))
        .route("/admin/preview", get(admin::preview))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    Router::new()
        .route("/healthz", get(player::health))
        .route("/", get(player::identity))
        .route("/start", post(player::start))
        .route("/clue/{id}", get(player::view_clue))
        .route("/submit/{id}", post(player::submit))
        .route("/hint/{id}", post(player::hint))
        .route("/skip/{id}", post(player::skip))
        .route("/leaderboard", get(player::leaderboard))
        .route("/finish", get(player::finish))
        .merge(admin)
        .layer(ServiceBuilder::new().map_request(|req: Request<Body>| {
            info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
            req
        }))
        .with_state(state)
}
