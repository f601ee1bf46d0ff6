//! Edge gatekeeper middleware.
//!
//! Runs before every handler and only looks at the request path and the
//! presence of the session cookie. It never contacts the identity provider
//! or the document store, and it never fails: anything it cannot classify is
//! passed through to the layout guard.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use super::policy::{self, Decision, SESSION_COOKIE_NAME};

/// A non-empty session cookie is present. The value is not validated here.
#[must_use]
pub fn has_session(jar: &CookieJar) -> bool {
    jar.get(SESSION_COOKIE_NAME)
        .map(Cookie::value)
        .is_some_and(|value| !value.is_empty())
}

/// `axum::middleware::from_fn` entry point.
pub async fn gatekeeper(req: Request, next: Next) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    let session = has_session(&jar);
    let path = req.uri().path().to_owned();

    match policy::decide(&path, session) {
        Decision::Pass => {
            tracing::trace!(%path, session, "gatekeeper pass");
            next.run(req).await
        }
        Decision::Redirect(target) => {
            tracing::debug!(%path, %target, session, "gatekeeper redirect");
            Redirect::temporary(&target).into_response()
        }
    }
}

#[cfg(test)]
#[path = "gatekeeper_test.rs"]
mod tests;
