// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod identity;
pub mod profile;
pub mod session;

pub use identity::{AuthenticatedPrincipal, Identity};
pub use profile::{ProfileRecord, DEFAULT_DISPLAY_NAME};
pub use session::{Notification, NotificationLevel, SessionState, SignedIn};
