//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the parsed config and, when an Identity Toolkit API key is
//! configured, the id token verifier used by the session endpoint.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::identity::IdTokenVerifier;

/// Clone is required by Axum; inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// `None` means legacy mode: session tokens are not verified.
    pub verifier: Option<Arc<dyn IdTokenVerifier>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, verifier: Option<Arc<dyn IdTokenVerifier>>) -> Self {
        Self { config: Arc::new(config), verifier }
    }
}


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
