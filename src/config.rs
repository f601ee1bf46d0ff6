//! Server configuration parsed from environment variables.

use std::path::PathBuf;

use crate::identity::toolkit::{DEFAULT_TOOLKIT_BASE_URL, DEFAULT_TOOLKIT_TIMEOUT_SECS, ToolkitConfig};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PUBLIC_DIR: &str = "./public";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    /// Directory holding the page shells served behind the gatekeeper.
    pub public_dir: PathBuf,
    pub cookie_secure: bool,
    /// `None` runs the session endpoint in legacy mode, without token
    /// verification.
    pub toolkit: Option<ToolkitConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT, public_dir: PathBuf::from(DEFAULT_PUBLIC_DIR), cookie_secure: false, toolkit: None }
    }
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `PUBLIC_DIR`: default `./public`
    /// - `COOKIE_SECURE`: boolean; defaults to `APP_ENV == production`
    /// - `FIREBASE_API_KEY`: enables id token verification
    /// - `IDENTITY_TOOLKIT_BASE_URL`: default Identity Toolkit v1 URL
    /// - `IDENTITY_REQUEST_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unparseable number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an explicit variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unparseable number.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let port = parse_number(&var, "PORT", DEFAULT_PORT)?;
        let public_dir = var("PUBLIC_DIR").map_or_else(|| PathBuf::from(DEFAULT_PUBLIC_DIR), PathBuf::from);

        let production = var("APP_ENV").is_some_and(|env| env.eq_ignore_ascii_case("production"));
        let cookie_secure = var("COOKIE_SECURE")
            .as_deref()
            .and_then(parse_bool)
            .unwrap_or(production);

        let toolkit = match var("FIREBASE_API_KEY") {
            Some(api_key) => Some(ToolkitConfig {
                api_key,
                base_url: var("IDENTITY_TOOLKIT_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_TOOLKIT_BASE_URL.to_owned())
                    .trim_end_matches('/')
                    .to_owned(),
                timeout_secs: parse_number(&var, "IDENTITY_REQUEST_TIMEOUT_SECS", DEFAULT_TOOLKIT_TIMEOUT_SECS)?,
            }),
            None => None,
        };

        Ok(Self { port, public_dir, cookie_secure, toolkit })
    }
}

fn parse_number<T>(var: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

/// `1/true/yes/on` and `0/false/no/off`, case-insensitive.
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
