// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error taxonomy shared by the session controller and its collaborators.

/// Errors surfaced by the identity provider, credential exchange and
/// profile store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The user dismissed the sign-in prompt. Not reported to the user.
    #[error("Sign-in cancelled")]
    ProviderCancelled,

    #[error("Identity provider error: {0}")]
    ProviderError(String),

    #[error("Credential exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("Profile store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidDisplayName(String),
}

impl SyncError {
    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SyncError::ProviderError(_) | SyncError::StoreUnavailable(_)
        )
    }

    /// Whether this failure should be hidden from the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, SyncError::ProviderCancelled)
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, SyncError>;
