//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session endpoint and health check sit next to the page shells, which
//! are served as static files from `public_dir`. The gatekeeper wraps the
//! whole router so every page request is classified before it is served;
//! API paths bypass it.

pub mod session;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::access::gatekeeper::gatekeeper;
use crate::state::AppState;

#[must_use]
pub fn app(state: AppState) -> Router {
    let pages = ServeDir::new(&state.config.public_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/api/session", post(session::issue).delete(session::clear))
        .route("/healthz", get(healthz))
        .fallback_service(pages)
        .with_state(state)
        .layer(axum::middleware::from_fn(gatekeeper))
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
