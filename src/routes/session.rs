//! Session-cookie endpoint.
//!
//! `POST /api/session` exchanges a freshly issued id token for the
//! `__session` cookie the gatekeeper looks for. `DELETE /api/session` clears
//! it on sign-out.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use time::Duration;

use crate::access::policy::SESSION_COOKIE_NAME;
use crate::identity::AuthError;
use crate::state::AppState;

pub const SESSION_MAX_AGE: Duration = Duration::days(5);

/// Cookie value issued when no verifier is configured.
pub const LEGACY_SESSION_VALUE: &str = "authenticated";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    #[serde(default)]
    id_token: String,
}

#[must_use]
pub fn session_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(SESSION_MAX_AGE)
        .build()
}

#[must_use]
pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

/// `POST /api/session` — set the session cookie.
pub async fn issue(State(state): State<AppState>, Json(body): Json<SessionRequest>) -> Response {
    let id_token = body.id_token.trim();
    if id_token.is_empty() {
        return (StatusCode::BAD_REQUEST, "idToken is required").into_response();
    }

    let value = match &state.verifier {
        Some(verifier) => match verifier.verify(id_token).await {
            Ok(uid) => {
                tracing::info!(%uid, "session issued");
                uid
            }
            Err(AuthError::InvalidToken) => {
                tracing::warn!("session rejected: invalid id token");
                return StatusCode::UNAUTHORIZED.into_response();
            }
            Err(e) => {
                tracing::error!(error = %e, "id token verification failed");
                return StatusCode::BAD_GATEWAY.into_response();
            }
        },
        None => {
            tracing::debug!("session issued without verification");
            LEGACY_SESSION_VALUE.to_owned()
        }
    };

    let jar = CookieJar::new().add(session_cookie(value, state.config.cookie_secure));
    (jar, StatusCode::NO_CONTENT).into_response()
}

/// `DELETE /api/session` — clear the session cookie.
pub async fn clear(State(state): State<AppState>) -> impl IntoResponse {
    let jar = CookieJar::new().add(clear_session_cookie(state.config.cookie_secure));
    (jar, StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
