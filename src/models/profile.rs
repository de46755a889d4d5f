//! Profile record model for storage.

use crate::db::Fields;
use crate::error::SyncError;
use crate::models::Identity;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Display name given to newly created profiles.
pub const DEFAULT_DISPLAY_NAME: &str = "Username";

/// Upper bound on display name length, in characters.
pub const MAX_DISPLAY_NAME_CHARS: u64 = 64;

/// Field name of the display name in stored documents.
pub const DISPLAY_NAME_FIELD: &str = "displayName";

/// User profile stored in Firestore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    /// Identity ID (also used as document ID)
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    /// Profile picture URL. Older documents call this `profileImageUrl`.
    #[serde(default, alias = "profileImageUrl", deserialize_with = "null_as_empty")]
    pub photo_url: String,
    #[serde(default = "default_display_name", deserialize_with = "null_as_empty")]
    pub display_name: String,
}

fn default_display_name() -> String {
    DEFAULT_DISPLAY_NAME.to_string()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl ProfileRecord {
    /// Record written on first sign-in.
    pub fn new_default(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
            photo_url: identity.photo_url.clone().unwrap_or_default(),
            display_name: default_display_name(),
        }
    }

    /// Parse a stored document. The document ID is authoritative for `id`,
    /// and a blank display name reads as the default.
    pub fn from_fields(id: &str, fields: Fields) -> Result<Self, serde_json::Error> {
        let mut record: ProfileRecord = serde_json::from_value(serde_json::Value::Object(fields))?;
        record.id = id.to_string();
        if record.display_name.trim().is_empty() {
            record.display_name = default_display_name();
        }
        Ok(record)
    }

    pub fn to_fields(&self) -> Fields {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(fields)) => fields,
            // A struct of strings always serializes to an object.
            _ => Fields::new(),
        }
    }
}

#[derive(Debug, Validate)]
struct DisplayNameInput {
    #[validate(length(min = 1, max = MAX_DISPLAY_NAME_CHARS))]
    display_name: String,
}

/// Trim and validate a display name before it is written.
pub fn normalize_display_name(raw: &str) -> Result<String, SyncError> {
    let input = DisplayNameInput {
        display_name: raw.trim().to_string(),
    };
    input.validate().map_err(|_| {
        SyncError::InvalidDisplayName(format!(
            "display name must be between 1 and {MAX_DISPLAY_NAME_CHARS} characters"
        ))
    })?;
    Ok(input.display_name)
}
