//! Client session store.
//!
//! ARCHITECTURE
//! ============
//! One `SessionStore` is built at the application root and cloned into
//! whatever needs it. State lives in a `watch` channel so the layout guard
//! and pages observe every transition. `init()` subscribes to the identity
//! provider once and spawns a listener that handles auth-state
//! notifications one at a time, hydrating the profile before moving on.
//!
//! ORDERING
//! ========
//! A hydration is only applied if the identity it was started for is still
//! the current identity, so a slow read for a previous user can never
//! overwrite the profile of the user who signed in after them.

use std::future::Future;
use std::sync::{Arc, Mutex, Weak};

use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::identity::{AuthError, Identity, IdentityProvider};
use crate::marker::SessionMarker;
use crate::profile::{USERS_COLLECTION, UserProfile, normalize_photo_url};
use crate::store::{DocumentStore, SetOptions, StoreError};

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub profile: Option<UserProfile>,
    pub is_authenticated: bool,
    /// `true` until the first auth-state notification has been processed.
    pub loading: bool,
    pub action_in_progress: bool,
    /// A user-initiated sign-out is in flight.
    pub signing_out: bool,
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            identity: None,
            profile: None,
            is_authenticated: false,
            loading: true,
            action_in_progress: false,
            signing_out: false,
            error: None,
        }
    }
}

impl SessionState {
    fn set_identity(&mut self, identity: Option<Identity>) {
        let same_user = match (&self.profile, &identity) {
            (Some(profile), Some(next)) => profile.id == next.uid,
            _ => false,
        };
        if !same_user {
            self.profile = None;
        }
        self.is_authenticated = identity.is_some();
        self.identity = identity;
    }

    fn is_current(&self, uid: &str) -> bool {
        self.identity.as_ref().is_some_and(|identity| identity.uid == uid)
    }
}

/// Clears `action_in_progress` however the action ends, including when its
/// future is dropped.
struct ActionGuard<'a>(&'a watch::Sender<SessionState>);

impl Drop for ActionGuard<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|s| s.action_in_progress = false);
    }
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    provider: Arc<dyn IdentityProvider>,
    documents: Arc<dyn DocumentStore>,
    marker: Arc<dyn SessionMarker>,
    state: watch::Sender<SessionState>,
    listener: Mutex<Option<JoinHandle<()>>>,
    /// Serializes profile reads/creates so a document is created once.
    hydration: tokio::sync::Mutex<()>,
}

impl SessionStore {
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        documents: Arc<dyn DocumentStore>,
        marker: Arc<dyn SessionMarker>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            inner: Arc::new(Inner {
                provider,
                documents,
                marker,
                state,
                listener: Mutex::new(None),
                hydration: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Subscribe to the identity provider's auth-state stream. Calling this
    /// more than once has no effect while the listener is running.
    pub fn init(&self) {
        let mut listener = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if listener.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let mut notifications = self.inner.provider.subscribe();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        *listener = Some(tokio::spawn(async move {
            while let Some(identity) = notifications.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                SessionStore { inner }.handle_auth_change(identity).await;
            }
            tracing::debug!("auth-state stream closed");
        }));
    }

    /// Stop listening to auth-state notifications.
    pub fn dispose(&self) {
        let handle = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    async fn handle_auth_change(&self, identity: Option<Identity>) {
        tracing::debug!(uid = identity.as_ref().map(|i| i.uid.as_str()), "auth state changed");
        self.inner
            .state
            .send_modify(|s| s.set_identity(identity.clone()));
        if let Some(identity) = &identity {
            self.hydrate_profile(identity).await;
        }
        self.inner.state.send_modify(|s| s.loading = false);
    }

    // =========================================================================
    // PROFILE HYDRATION
    // =========================================================================

    /// Load the profile for `identity`, creating it on first sign-in, and
    /// adopt it if `identity` is still current. Store failures are logged and
    /// leave the profile unset.
    pub async fn hydrate_profile(&self, identity: &Identity) -> Option<UserProfile> {
        let loaded = {
            let _serialized = self.inner.hydration.lock().await;
            self.load_or_create_profile(identity).await
        };
        let profile = match loaded {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(uid = %identity.uid, error = %e, "profile hydration failed");
                return None;
            }
        };

        let applied = self.inner.state.send_if_modified(|s| {
            if !s.is_current(&identity.uid) {
                return false;
            }
            s.profile = Some(profile.clone());
            true
        });
        if !applied {
            tracing::debug!(uid = %identity.uid, "discarding stale profile hydration");
        }
        Some(profile)
    }

    async fn load_or_create_profile(&self, identity: &Identity) -> Result<UserProfile, StoreError> {
        let now = OffsetDateTime::now_utc();
        if let Some(doc) = self
            .inner
            .documents
            .get(USERS_COLLECTION, &identity.uid)
            .await?
        {
            let mut profile = UserProfile::from_document(&identity.uid, &doc, now);
            if profile.photo_url.is_none() {
                profile.photo_url = identity.photo_url.as_deref().map(normalize_photo_url);
            }
            return Ok(profile);
        }

        let profile = UserProfile::for_new_identity(identity, now);
        self.inner
            .documents
            .set(USERS_COLLECTION, &identity.uid, profile.to_legacy_document()?, SetOptions { merge: true })
            .await?;
        tracing::info!(uid = %identity.uid, "created user profile");
        Ok(profile)
    }

    // =========================================================================
    // ACTIONS
    // =========================================================================

    /// # Errors
    ///
    /// Returns the provider error, or [`AuthError::Session`] when the session
    /// cookie could not be issued, after recording it in `error`.
    pub async fn sign_in_with_google(&self) -> Result<Identity, AuthError> {
        self.run_action(self.inner.provider.sign_in_with_oauth_popup())
            .await
    }

    /// # Errors
    ///
    /// Returns the provider error, or [`AuthError::Session`] when the session
    /// cookie could not be issued, after recording it in `error`.
    pub async fn sign_in_with_email_password(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.run_action(self.inner.provider.sign_in_with_password(email, password))
            .await
    }

    /// # Errors
    ///
    /// Returns the provider error, or [`AuthError::Session`] when the session
    /// cookie could not be issued, after recording it in `error`.
    pub async fn sign_up_with_email_password(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, AuthError> {
        self.run_action(self.inner.provider.create_account(email, password, display_name))
            .await
    }

    async fn run_action<F>(&self, action: F) -> Result<Identity, AuthError>
    where
        F: Future<Output = Result<Identity, AuthError>>,
    {
        self.inner.state.send_modify(|s| {
            s.action_in_progress = true;
            s.error = None;
        });
        let _guard = ActionGuard(&self.inner.state);

        let result = match action.await {
            Ok(identity) => self.mark_session(&identity).await.map(|()| identity),
            Err(e) => Err(e),
        };

        match result {
            Ok(identity) => {
                self.inner
                    .state
                    .send_modify(|s| s.set_identity(Some(identity.clone())));
                self.hydrate_profile(&identity).await;
                Ok(identity)
            }
            Err(e) => {
                tracing::warn!(error = %e, "sign-in action failed");
                self.inner
                    .state
                    .send_modify(|s| s.error = Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Exchange the provider's id token for the session cookie. If that
    /// fails the provider is signed out again, so the identity never outlives
    /// a missing cookie.
    async fn mark_session(&self, identity: &Identity) -> Result<(), AuthError> {
        let issued = match self.inner.provider.id_token() {
            Some(token) => self.inner.marker.issue(&token).await.map_err(AuthError::from),
            None => Err(AuthError::InvalidToken),
        };
        let Err(e) = issued else {
            return Ok(());
        };

        tracing::warn!(uid = %identity.uid, error = %e, "session cookie not issued; signing out");
        self.inner.state.send_modify(|s| s.set_identity(None));
        if let Err(sign_out) = self.inner.provider.sign_out().await {
            tracing::warn!(error = %sign_out, "provider sign-out after failed cookie issue failed");
        }
        Err(e)
    }

    /// Sign out. Local state is cleared before the provider is called, so a
    /// provider failure never leaves the session looking authenticated.
    ///
    /// # Errors
    ///
    /// Returns the provider error; local state stays cleared.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.inner.state.send_modify(|s| {
            s.signing_out = true;
            s.set_identity(None);
        });

        if let Err(e) = self.inner.marker.clear().await {
            tracing::warn!(error = %e, "session cookie clear failed");
        }

        let result = self.inner.provider.sign_out().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "provider sign-out failed; local session cleared");
        }

        self.inner.state.send_modify(|s| s.signing_out = false);
        result
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
