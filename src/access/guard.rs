//! Layout guard.
//!
//! Mounted by every page shell. While the session store is still loading the
//! guard holds the page in `Checking` and renders a loading indicator. Once
//! the store settles it applies the same decision as the gatekeeper, using
//! the resolved identity instead of the cookie, so a stale or forged cookie
//! still ends in a redirect.

use tokio::sync::watch;

use super::policy::{self, Decision};
use crate::session::{SessionState, SessionStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Checking,
    /// Terminal. The page navigates to the target.
    Redirecting(String),
    Authorized,
}

impl GuardState {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Checking)
    }
}

/// What the page shell should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView {
    Loading,
    /// Full-screen overlay blocking interaction during sign-out.
    SigningOut,
    Redirect(String),
    Content,
}

/// Guard state for a fresh mount at `path`.
#[must_use]
pub fn evaluate(session: &SessionState, path: &str) -> GuardState {
    if session.loading {
        return GuardState::Checking;
    }
    match policy::decide(path, session.identity.is_some()) {
        Decision::Pass => GuardState::Authorized,
        Decision::Redirect(target) => GuardState::Redirecting(target),
    }
}

fn advance(current: GuardState, session: &SessionState, path: &str) -> GuardState {
    match current {
        GuardState::Redirecting(_) => current,
        _ if session.signing_out => current,
        GuardState::Authorized if session.loading => current,
        GuardState::Checking | GuardState::Authorized => evaluate(session, path),
    }
}

// =============================================================================
// MOUNTED GUARD
// =============================================================================

pub struct LayoutGuard {
    path: String,
    session: watch::Receiver<SessionState>,
    state: GuardState,
}

impl LayoutGuard {
    #[must_use]
    pub fn mount(store: &SessionStore, path: impl Into<String>) -> Self {
        let path = path.into();
        let mut session = store.watch();
        let state = evaluate(&session.borrow_and_update(), &path);
        tracing::trace!(%path, ?state, "layout guard mounted");
        Self { path, session, state }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn state(&self) -> &GuardState {
        &self.state
    }

    /// Apply the latest session snapshot.
    pub fn refresh(&mut self) -> &GuardState {
        let session = self.session.borrow_and_update().clone();
        let current = std::mem::replace(&mut self.state, GuardState::Checking);
        self.state = advance(current, &session, &self.path);
        if let GuardState::Redirecting(target) = &self.state {
            tracing::debug!(path = %self.path, %target, "layout guard redirect");
        }
        &self.state
    }

    #[must_use]
    pub fn view(&self) -> GuardView {
        if self.session.borrow().signing_out {
            return GuardView::SigningOut;
        }
        match &self.state {
            GuardState::Checking => GuardView::Loading,
            GuardState::Redirecting(target) => GuardView::Redirect(target.clone()),
            GuardState::Authorized => GuardView::Content,
        }
    }

    /// Wait until the guard leaves `Checking`.
    pub async fn resolve(&mut self) -> &GuardState {
        self.refresh();
        while !self.state.is_resolved() {
            if self.session.changed().await.is_err() {
                break;
            }
            self.refresh();
        }
        &self.state
    }

    /// Wait until the guard redirects. Returns `None` if the session store
    /// goes away first.
    pub async fn redirected(&mut self) -> Option<String> {
        loop {
            if let GuardState::Redirecting(target) = self.refresh() {
                return Some(target.clone());
            }
            if self.session.changed().await.is_err() {
                return None;
            }
        }
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
