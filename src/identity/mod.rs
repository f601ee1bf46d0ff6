//! Identity-provider boundary.
//!
//! DESIGN
//! ======
//! The session store only depends on the [`IdentityProvider`] trait so tests
//! can drive it with an in-process provider, and the session endpoint only
//! depends on [`IdTokenVerifier`]. [`toolkit::ToolkitClient`] implements both
//! against the Identity Toolkit REST API.

pub mod toolkit;

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Authenticated principal as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub phone_number: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into(), email: None, display_name: None, photo_url: None, phone_number: None }
    }
}

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The provider refused the request. `message` is safe to show to users.
    #[error("{message}")]
    Rejected { code: String, message: String },
    #[error("identity provider request failed: {0}")]
    Transport(String),
    #[error("identity provider response parse failed: {0}")]
    Parse(String),
    #[error("{0} is not supported by this identity provider")]
    Unsupported(&'static str),
    #[error("invalid id token")]
    InvalidToken,
    #[error("could not establish the session: {0}")]
    Session(#[from] crate::marker::MarkerError),
}

// =============================================================================
// PROVIDER TRAITS
// =============================================================================

/// Auth-state notifications: `Some` on sign-in, `None` on sign-out. The
/// first item is the provider's initial resolution.
pub type AuthStateStream = mpsc::UnboundedReceiver<Option<Identity>>;

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Subscribe to auth-state changes.
    fn subscribe(&self) -> AuthStateStream;

    /// Id token of the signed-in user, if the provider holds one.
    fn id_token(&self) -> Option<String>;

    /// # Errors
    ///
    /// Returns [`AuthError::Rejected`] for bad credentials.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// # Errors
    ///
    /// Returns [`AuthError::Unsupported`] where no browser popup is available.
    async fn sign_in_with_oauth_popup(&self) -> Result<Identity, AuthError>;

    /// # Errors
    ///
    /// Returns [`AuthError::Rejected`] when the account exists or the
    /// password is too weak.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, AuthError>;

    /// # Errors
    ///
    /// Returns an error if the provider could not be reached.
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Server-side id token verification.
#[async_trait::async_trait]
pub trait IdTokenVerifier: Send + Sync {
    /// Verify `id_token` and return the uid it was issued to.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] for forged, expired or foreign
    /// tokens, and transport errors when the provider is unreachable.
    async fn verify(&self, id_token: &str) -> Result<String, AuthError>;
}

// =============================================================================
// AUTH STATE CHANNEL
// =============================================================================

/// Fan-out of auth-state changes to every subscriber. New subscribers get
/// the current state immediately.
#[derive(Default)]
pub struct AuthStateChannel {
    inner: Mutex<AuthStateInner>,
}

#[derive(Default)]
struct AuthStateInner {
    current: Option<Identity>,
    subscribers: Vec<mpsc::UnboundedSender<Option<Identity>>>,
}

impl AuthStateChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> AuthStateStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let _ = tx.send(inner.current.clone());
        inner.subscribers.push(tx);
        rx
    }

    /// Record a new state and notify subscribers, dropping closed ones.
    pub fn publish(&self, identity: Option<Identity>) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        inner
            .subscribers
            .retain(|tx| tx.send(identity.clone()).is_ok());
        inner.current = identity;
    }

    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .current
            .clone()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .subscribers
            .len()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
