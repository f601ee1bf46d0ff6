//! Route classification tables and the redirect decision.

use std::borrow::Cow;

/// Cookie carrying the session marker.
pub const SESSION_COOKIE_NAME: &str = "__session";

pub const ROOT_PATH: &str = "/";
pub const LANDING_PATH: &str = "/landing";
pub const FEED_PATH: &str = "/feed";

/// Query parameter used to return the user to their destination after login.
pub const REDIRECT_PARAM: &str = "redirect";

/// Pages that require a session.
pub const PROTECTED_ROUTES: &[&str] = &[
    "/feed",
    "/fridge",
    "/profile",
    "/community",
    "/communities",
    "/notifications",
    "/settings",
    "/explore",
    "/search",
    "/meetups",
    "/challenges",
    "/log-meal",
    "/map",
];

/// Pages that must not be shown to a signed-in user.
pub const AUTH_ROUTES: &[&str] = &["/landing", "/login"];

/// API, framework-internal and static-asset prefixes.
pub const BYPASS_PREFIXES: &[&str] = &["/api", "/_next", "/static"];

// =============================================================================
// CLASSIFICATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    /// Excluded from access control entirely.
    Bypass,
    /// `/`, which always redirects.
    Root,
    Protected,
    AuthOnly,
    Public,
}

/// Exact match, or a sub-path of `route` (prefix followed by `/`).
fn matches_route(path: &str, route: &str) -> bool {
    path.strip_prefix(route)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// A path under one of the bypass prefixes, or one that looks like a file.
#[must_use]
pub fn is_bypass(path: &str) -> bool {
    BYPASS_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) || path.contains('.')
}

#[must_use]
pub fn is_protected(path: &str) -> bool {
    PROTECTED_ROUTES.iter().any(|route| matches_route(path, route))
}

#[must_use]
pub fn is_auth_only(path: &str) -> bool {
    AUTH_ROUTES.iter().any(|route| matches_route(path, route))
}

/// Classify a request path. Rules are evaluated in a fixed order: bypass,
/// root, protected, auth-only. Paths that are not absolute are public.
#[must_use]
pub fn classify(path: &str) -> RouteClass {
    if !path.starts_with('/') {
        return RouteClass::Public;
    }
    if is_bypass(path) {
        RouteClass::Bypass
    } else if path == ROOT_PATH {
        RouteClass::Root
    } else if is_protected(path) {
        RouteClass::Protected
    } else if is_auth_only(path) {
        RouteClass::AuthOnly
    } else {
        RouteClass::Public
    }
}

/// The path a file server would resolve: percent-decoded once, with empty
/// and `.` segments dropped and `..` applied. A trailing `/` is kept. Paths
/// that do not decode to UTF-8 are returned unchanged.
#[must_use]
pub fn canonical_path(raw: &str) -> String {
    let Ok(decoded) = urlencoding::decode(raw) else {
        return raw.to_owned();
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut path = format!("/{}", segments.join("/"));
    if !segments.is_empty() && decoded.ends_with('/') {
        path.push('/');
    }
    path
}

// =============================================================================
// DECISION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Pass,
    Redirect(String),
}

/// Decide what to do with the raw request path `path` given whether a
/// session is present. Classification and the return path both use
/// [`canonical_path`].
#[must_use]
pub fn decide(path: &str, has_session: bool) -> Decision {
    if !path.starts_with('/') {
        return Decision::Pass;
    }
    let path = canonical_path(path);
    let path = path.as_str();
    match classify(path) {
        RouteClass::Bypass | RouteClass::Public => Decision::Pass,
        RouteClass::Root => Decision::Redirect(if has_session { FEED_PATH } else { LANDING_PATH }.to_owned()),
        RouteClass::Protected if !has_session => Decision::Redirect(landing_with_return(path)),
        RouteClass::AuthOnly if has_session => Decision::Redirect(FEED_PATH.to_owned()),
        RouteClass::Protected | RouteClass::AuthOnly => Decision::Pass,
    }
}

/// `/landing?redirect=<path>` with the path URL-encoded.
#[must_use]
pub fn landing_with_return(path: &str) -> String {
    let encoded: Cow<'_, str> = urlencoding::encode(path);
    format!("{LANDING_PATH}?{REDIRECT_PARAM}={encoded}")
}

#[cfg(test)]
#[path = "policy_test.rs"]
mod tests;
