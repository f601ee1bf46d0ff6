//! User profile documents.
//!
//! DESIGN
//! ======
//! Profile documents were written by several generations of the app, so a
//! field may be stored under its camelCase name or its legacy snake_case
//! name. [`FIELD_ALIASES`] is the single mapping between the two;
//! [`canonicalize_keys`] applies it and every read goes through the
//! canonical map afterwards. New documents are written with the legacy
//! keys so older readers keep working.
//!
//! Reads never fail: a missing, null or mistyped value falls back to the
//! field's default.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::identity::Identity;
use crate::store::{Document, StoreError};

/// Collection holding one profile document per identity uid.
pub const USERS_COLLECTION: &str = "users";

const STORAGE_HOST_WITH_PORT: &str = "firebasestorage.googleapis.com:443";
const STORAGE_HOST: &str = "firebasestorage.googleapis.com";

/// `(canonical, legacy)` key pairs. Fields without a legacy spelling
/// (`id`, `email`, `level`, `badges`, `friends`) are not listed.
pub const FIELD_ALIASES: &[(&str, &str)] = &[
    ("displayName", "display_name"),
    ("photoURL", "photo_url"),
    ("totalXP", "total_xp"),
    ("matchesCompleted", "matches_completed"),
    ("matchesWon", "matches_won"),
    ("episodeCount", "episode_count"),
    ("reactionCount", "reaction_count"),
    ("notificationsEnabled", "notifications_enabled"),
    ("pushToken", "push_token"),
    ("hasCompletedOnboarding", "has_completed_onboarding"),
    ("createdAt", "created_at"),
    ("lastActive", "last_active"),
];

// =============================================================================
// PROFILE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub email: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
    pub level: u32,
    pub badges: Vec<String>,
    pub friends: Vec<String>,
    pub matches_completed: u64,
    pub matches_won: u64,
    pub episode_count: u64,
    pub reaction_count: u64,
    pub notifications_enabled: bool,
    pub push_token: Option<String>,
    pub has_completed_onboarding: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_active: OffsetDateTime,
}

impl UserProfile {
    /// Fresh profile for a first sign-in, seeded from the identity.
    #[must_use]
    pub fn for_new_identity(identity: &Identity, now: OffsetDateTime) -> Self {
        Self {
            id: identity.uid.clone(),
            display_name: identity.display_name.clone().unwrap_or_default(),
            email: identity.email.clone().unwrap_or_default(),
            photo_url: identity.photo_url.as_deref().map(normalize_photo_url),
            total_xp: 0,
            level: 1,
            badges: Vec::new(),
            friends: Vec::new(),
            matches_completed: 0,
            matches_won: 0,
            episode_count: 0,
            reaction_count: 0,
            notifications_enabled: true,
            push_token: None,
            has_completed_onboarding: false,
            created_at: now,
            last_active: now,
        }
    }

    /// Parse a stored document. `now` fills missing timestamps.
    #[must_use]
    pub fn from_document(id: &str, doc: &Document, now: OffsetDateTime) -> Self {
        let doc = canonicalize_keys(doc);
        let field = |key: &str| doc.get(key).filter(|v| !v.is_null());

        Self {
            id: id.to_owned(),
            display_name: field("displayName").and_then(as_string).unwrap_or_default(),
            email: field("email").and_then(as_string).unwrap_or_default(),
            photo_url: field("photoURL")
                .and_then(as_string)
                .filter(|url| !url.is_empty())
                .map(|url| normalize_photo_url(&url)),
            total_xp: field("totalXP").and_then(as_count).unwrap_or(0),
            level: field("level")
                .and_then(as_count)
                .and_then(|v| u32::try_from(v).ok())
                .filter(|v| *v > 0)
                .unwrap_or(1),
            badges: field("badges").map(as_string_list).unwrap_or_default(),
            friends: field("friends").map(as_string_list).unwrap_or_default(),
            matches_completed: field("matchesCompleted").and_then(as_count).unwrap_or(0),
            matches_won: field("matchesWon").and_then(as_count).unwrap_or(0),
            episode_count: field("episodeCount").and_then(as_count).unwrap_or(0),
            reaction_count: field("reactionCount").and_then(as_count).unwrap_or(0),
            notifications_enabled: field("notificationsEnabled").and_then(Value::as_bool).unwrap_or(true),
            push_token: field("pushToken").and_then(as_string),
            has_completed_onboarding: field("hasCompletedOnboarding").and_then(Value::as_bool).unwrap_or(false),
            created_at: field("createdAt").and_then(as_timestamp).unwrap_or(now),
            last_active: field("lastActive").and_then(as_timestamp).unwrap_or(now),
        }
    }

    /// Serialize with legacy snake_case keys for persistence.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] if a timestamp cannot be formatted.
    pub fn to_legacy_document(&self) -> Result<Document, StoreError> {
        let Value::Object(canonical) = serde_json::to_value(self).map_err(|e| StoreError::Serialize(e.to_string()))?
        else {
            return Err(StoreError::Serialize("profile did not serialize to an object".into()));
        };
        Ok(canonical
            .into_iter()
            .map(|(key, value)| (legacy_key(&key).map_or_else(|| key.clone(), str::to_owned), value))
            .collect())
    }
}

// =============================================================================
// KEY NORMALIZATION
// =============================================================================

fn canonical_key(key: &str) -> Option<&'static str> {
    FIELD_ALIASES
        .iter()
        .find(|(_, legacy)| *legacy == key)
        .map(|(canonical, _)| *canonical)
}

fn legacy_key(key: &str) -> Option<&'static str> {
    FIELD_ALIASES
        .iter()
        .find(|(canonical, _)| *canonical == key)
        .map(|(_, legacy)| *legacy)
}

/// Rename legacy keys to their canonical names. When both spellings carry a
/// non-null value the canonical one wins.
#[must_use]
pub fn canonicalize_keys(doc: &Document) -> Document {
    let mut out = Document::new();
    for (key, value) in doc {
        match canonical_key(key) {
            Some(canonical) => {
                let present = doc.get(canonical).is_some_and(|v| !v.is_null());
                if !present {
                    out.insert(canonical.to_owned(), value.clone());
                }
            }
            None => {
                if !value.is_null() || !out.contains_key(key) {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
    }
    out
}

/// Drop the explicit `:443` port some storage download URLs carry.
#[must_use]
pub fn normalize_photo_url(url: &str) -> String {
    url.replace(STORAGE_HOST_WITH_PORT, STORAGE_HOST)
}

// =============================================================================
// LENIENT VALUE READERS
// =============================================================================

fn as_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_owned)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn as_count(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    (f.is_finite() && f >= 0.0).then(|| f as u64)
}

fn as_string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// RFC 3339 strings, epoch milliseconds, or `{seconds, nanoseconds}` objects
/// (with or without leading underscores).
fn as_timestamp(value: &Value) -> Option<OffsetDateTime> {
    match value {
        Value::String(s) => OffsetDateTime::parse(s, &Rfc3339).ok(),
        Value::Number(n) => {
            let millis = n.as_i64()?;
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
        }
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(seconds) * 1_000_000_000 + i128::from(nanos)).ok()
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;
