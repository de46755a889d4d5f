//! Observable session state rendered by the UI layer.

use crate::models::{Identity, ProfileRecord};

/// What the UI should currently show.
///
/// A new value is published on every transition; values are never
/// mutated after publication.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    SignedOut,
    SigningIn,
    SignedIn(SignedIn),
}

/// Signed-in view: identity, profile and edit state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIn {
    pub identity: Identity,
    pub profile: ProfileRecord,
    /// Text in the edit box while editing; `None` when not editing
    pub pending_display_name: Option<String>,
    /// A display name write is outstanding
    pub saving: bool,
}

impl SignedIn {
    pub fn new(identity: Identity, profile: ProfileRecord) -> Self {
        Self {
            identity,
            profile,
            pending_display_name: None,
            saving: false,
        }
    }

    pub fn editing(&self) -> bool {
        self.pending_display_name.is_some()
    }
}

impl SessionState {
    pub fn is_signed_out(&self) -> bool {
        matches!(self, SessionState::SignedOut)
    }

    pub fn signed_in(&self) -> Option<&SignedIn> {
        match self {
            SessionState::SignedIn(signed_in) => Some(signed_in),
            _ => None,
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::SignedOut => "signed_out",
            SessionState::SigningIn => "signing_in",
            SessionState::SignedIn(s) if s.editing() => "editing",
            SessionState::SignedIn(s) if s.saving => "saving",
            SessionState::SignedIn(_) => "signed_in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// One-line message for the user (a toast, in mobile terms).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}
