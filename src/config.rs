//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honoured for local runs.

use std::env;
use std::path::PathBuf;

/// Which document store backs the profile collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// Process-local store, nothing survives a restart.
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project ID
    pub gcp_project_id: String,
    /// Google OAuth client ID; the expected `aud` of ID tokens
    pub google_client_id: String,
    /// HS256 key for session tokens issued after credential exchange
    pub session_signing_key: Vec<u8>,
    /// Firestore collection holding profile records
    pub profile_collection: String,
    /// Where the identity provider caches the last signed-in ID token
    pub session_file: PathBuf,
    pub store_backend: StoreBackend,
    /// Revert the local display name when the remote update fails.
    /// Off by default: a failed save only produces a notification.
    pub rollback_failed_edits: bool,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            google_client_id: "test-client.apps.googleusercontent.com".to_string(),
            session_signing_key: b"test_session_key_32_bytes_min!!!".to_vec(),
            profile_collection: crate::db::collections::USERS.to_string(),
            session_file: PathBuf::from(".profile-sync/test-session.jwt"),
            store_backend: StoreBackend::Memory,
            rollback_failed_edits: false,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store_backend = match env::var("PROFILE_STORE")
            .unwrap_or_else(|_| "firestore".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "firestore" => StoreBackend::Firestore,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    name: "PROFILE_STORE",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            session_signing_key: env::var("SESSION_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("SESSION_SIGNING_KEY"))?
                .into_bytes(),
            profile_collection: env::var("PROFILE_COLLECTION")
                .unwrap_or_else(|_| crate::db::collections::USERS.to_string()),
            session_file: env::var("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".profile-sync/session.jwt")),
            store_backend,
            rollback_failed_edits: parse_flag("ROLLBACK_FAILED_EDITS")?,
        })
    }
}

fn parse_flag(name: &'static str) -> Result<bool, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(false),
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "no" | "off" => Ok(false),
            "1" | "true" | "yes" | "on" => Ok(true),
            _ => Err(ConfigError::Invalid { name, value }),
        },
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
