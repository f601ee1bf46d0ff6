//! Identity Toolkit REST client.
//!
//! Password sign-in, account creation and id token lookup against the
//! `accounts:*` endpoints. Sign-out is local: the client forgets its id
//! token and notifies auth-state subscribers.

use std::sync::Mutex;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{AuthError, AuthStateChannel, AuthStateStream, IdTokenVerifier, Identity, IdentityProvider};

pub const DEFAULT_TOOLKIT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_TOOLKIT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolkitConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl ToolkitConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_TOOLKIT_BASE_URL.to_owned(),
            timeout_secs: DEFAULT_TOOLKIT_TIMEOUT_SECS,
        }
    }

    /// Full URL for an `accounts:<method>` call.
    #[must_use]
    pub fn endpoint(&self, method: &str) -> String {
        format!("{}/accounts:{method}?key={}", self.base_url.trim_end_matches('/'), self.api_key)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    phone_number: Option<String>,
}

impl From<LookupUser> for Identity {
    fn from(user: LookupUser) -> Self {
        Self {
            uid: user.local_id,
            email: user.email,
            display_name: user.display_name,
            photo_url: user.photo_url,
            phone_number: user.phone_number,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Build an [`AuthError`] from a non-success response body. The provider
/// reports codes like `WEAK_PASSWORD : Password should be ...`.
fn rejection_from_body(status: u16, body: &str) -> AuthError {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return AuthError::Transport(format!("status {status}: {body}"));
    };
    let code = envelope
        .error
        .message
        .split(" : ")
        .next()
        .unwrap_or_default()
        .trim()
        .to_owned();
    let message = friendly_message(&code);
    AuthError::Rejected { code, message }
}

/// User-facing text for a provider error code.
#[must_use]
pub fn friendly_message(code: &str) -> String {
    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => "Invalid email or password.".into(),
        "EMAIL_EXISTS" => "An account with this email already exists.".into(),
        "WEAK_PASSWORD" => "Password should be at least 6 characters.".into(),
        "INVALID_EMAIL" | "MISSING_EMAIL" => "Please enter a valid email address.".into(),
        "MISSING_PASSWORD" => "Please enter your password.".into(),
        "USER_DISABLED" => "This account has been disabled.".into(),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts. Please try again later.".into(),
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" => "Your session has expired. Please sign in again.".into(),
        other => format!("Authentication failed ({other})."),
    }
}

/// Request URLs carry the API key, so they are stripped from the message.
fn transport_error(e: reqwest::Error) -> AuthError {
    AuthError::Transport(e.without_url().to_string())
}

fn is_token_rejection(code: &str) -> bool {
    matches!(code, "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" | "USER_DISABLED")
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct ToolkitClient {
    http: reqwest::Client,
    config: ToolkitConfig,
    auth_state: AuthStateChannel,
    id_token: Mutex<Option<String>>,
}

impl ToolkitClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ToolkitConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        Ok(Self { http, config, auth_state: AuthStateChannel::new(), id_token: Mutex::new(None) })
    }

    fn set_id_token(&self, token: Option<String>) {
        *self
            .id_token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = token;
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: serde_json::Value) -> Result<T, AuthError> {
        let resp = self
            .http
            .post(self.config.endpoint(method))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let text = resp.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(rejection_from_body(status.as_u16(), &text));
        }
        serde_json::from_str(&text).map_err(|e| AuthError::Parse(e.to_string()))
    }

    async fn lookup(&self, id_token: &str) -> Result<Identity, AuthError> {
        let resp: LookupResponse = self
            .call("lookup", serde_json::json!({ "idToken": id_token }))
            .await?;
        resp.users
            .into_iter()
            .next()
            .map(Identity::from)
            .ok_or(AuthError::InvalidToken)
    }

    fn signed_in(&self, identity: Identity, id_token: String) -> Identity {
        self.set_id_token(Some(id_token));
        tracing::info!(uid = %identity.uid, "identity signed in");
        self.auth_state.publish(Some(identity.clone()));
        identity
    }
}

#[async_trait::async_trait]
impl IdentityProvider for ToolkitClient {
    fn subscribe(&self) -> AuthStateStream {
        self.auth_state.subscribe()
    }

    fn id_token(&self) -> Option<String> {
        self.id_token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let session: SignInResponse = self
            .call(
                "signInWithPassword",
                serde_json::json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        let identity = match self.lookup(&session.id_token).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(uid = %session.local_id, error = %e, "profile lookup after sign-in failed");
                Identity { email: Some(email.to_owned()), ..Identity::new(session.local_id) }
            }
        };
        Ok(self.signed_in(identity, session.id_token))
    }

    async fn sign_in_with_oauth_popup(&self) -> Result<Identity, AuthError> {
        Err(AuthError::Unsupported("oauth popup sign-in"))
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let session: SignInResponse = self
            .call("signUp", serde_json::json!({ "email": email, "password": password, "returnSecureToken": true }))
            .await?;

        let display_name = display_name.map(str::trim).filter(|name| !name.is_empty());
        if let Some(name) = display_name {
            // The account exists at this point; a failed rename is not fatal.
            let renamed: Result<serde_json::Value, AuthError> = self
                .call(
                    "update",
                    serde_json::json!({ "idToken": session.id_token, "displayName": name, "returnSecureToken": false }),
                )
                .await;
            if let Err(e) = renamed {
                tracing::warn!(uid = %session.local_id, error = %e, "display name update failed");
            }
        }

        let identity = Identity {
            email: Some(email.to_owned()),
            display_name: display_name.map(str::to_owned),
            ..Identity::new(session.local_id)
        };
        Ok(self.signed_in(identity, session.id_token))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.set_id_token(None);
        self.auth_state.publish(None);
        Ok(())
    }
}

#[async_trait::async_trait]
impl IdTokenVerifier for ToolkitClient {
    async fn verify(&self, id_token: &str) -> Result<String, AuthError> {
        match self.lookup(id_token).await {
            Ok(identity) => Ok(identity.uid),
            Err(AuthError::Rejected { code, .. }) if is_token_rejection(&code) => Err(AuthError::InvalidToken),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[path = "toolkit_test.rs"]
mod tests;
