//! Client side of the session-cookie endpoint.
//!
//! After a sign-in the session store hands the provider's id token to a
//! [`SessionMarker`], which exchanges it for the `__session` cookie. On
//! logout the marker clears that cookie again. [`HttpSessionMarker`] talks
//! to `/api/session` over HTTP and keeps the cookie in its own jar, so page
//! requests made through [`HttpSessionMarker::client`] pass the gatekeeper.

use std::time::Duration;

use serde_json::json;

pub const SESSION_ENDPOINT_PATH: &str = "/api/session";
pub const DEFAULT_MARKER_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    #[error("session endpoint request failed: {0}")]
    Transport(String),
    #[error("session endpoint returned status {0}")]
    Status(u16),
}

#[async_trait::async_trait]
pub trait SessionMarker: Send + Sync {
    /// Exchange `id_token` for the session cookie.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError::Status`] when the endpoint refuses the token.
    async fn issue(&self, id_token: &str) -> Result<(), MarkerError>;

    /// Clear the session cookie.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint could not be reached.
    async fn clear(&self) -> Result<(), MarkerError>;
}

fn transport_error(e: reqwest::Error) -> MarkerError {
    MarkerError::Transport(e.without_url().to_string())
}

// =============================================================================
// HTTP
// =============================================================================

pub struct HttpSessionMarker {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpSessionMarker {
    /// Marker for the app served at `origin`, e.g. `http://localhost:3000`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(origin: &str, timeout: Duration) -> Result<Self, MarkerError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| MarkerError::Transport(e.to_string()))?;
        let endpoint = format!("{}{SESSION_ENDPOINT_PATH}", origin.trim_end_matches('/'));
        Ok(Self { http, endpoint })
    }

    /// Client holding the session cookie.
    #[must_use]
    pub fn client(&self) -> &reqwest::Client {
        &self.http
    }

    fn check(resp: &reqwest::Response) -> Result<(), MarkerError> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(MarkerError::Status(status.as_u16()))
        }
    }
}

#[async_trait::async_trait]
impl SessionMarker for HttpSessionMarker {
    async fn issue(&self, id_token: &str) -> Result<(), MarkerError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "idToken": id_token }))
            .send()
            .await
            .map_err(transport_error)?;
        Self::check(&resp)
    }

    async fn clear(&self) -> Result<(), MarkerError> {
        let resp = self
            .http
            .delete(&self.endpoint)
            .send()
            .await
            .map_err(transport_error)?;
        Self::check(&resp)
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "marker_test.rs"]
mod tests;
