// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Seams to the identity provider and the credential exchange.

use crate::error::Result;
use crate::models::{AuthenticatedPrincipal, Identity};
use async_trait::async_trait;

/// Outcome of an interactive sign-in prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    SignedIn(Identity),
    /// The user dismissed the prompt.
    Cancelled,
}

/// Federated sign-in provider (Google Sign-In).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Show the interactive sign-in and wait for the user.
    async fn begin_interactive_sign_in(&self) -> Result<SignInOutcome>;

    /// End the provider-side session so the next start does not resume it.
    async fn revoke_session(&self) -> Result<()>;

    /// An existing valid session, if any. Must not prompt the user.
    async fn current_session(&self) -> Result<Option<Identity>>;
}

/// Maps a provider identity to the store's authenticated principal.
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    async fn exchange(&self, identity: &Identity) -> Result<AuthenticatedPrincipal>;
}
