// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle: sign-in, profile edits and sign-out.
//!
//! [`SessionController`] is the only writer of [`SessionState`]. Every
//! asynchronous operation records the generation it was issued under and
//! its completion is dropped if the generation has moved on, so a slow
//! store call can never resurrect a session the user already left.
//!
//! Generations advance on sign-in, resume and sign-out. Display name
//! commits additionally advance an edit revision so that a profile
//! refresh issued before a commit cannot overwrite the committed name.

use crate::config::Config;
use crate::error::SyncError;
use crate::models::profile::normalize_display_name;
use crate::models::{AuthenticatedPrincipal, Identity, Notification, ProfileRecord};
use crate::models::{SessionState, SignedIn};
use crate::services::identity::{CredentialExchange, IdentityProvider, SignInOutcome};
use crate::services::profile::{FetchOutcome, ProfileStore};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, watch};

const NOTIFICATION_CAPACITY: usize = 32;

/// Behaviour switches for [`SessionController`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Restore the previous display name locally when saving fails.
    pub rollback_failed_edits: bool,
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self {
            rollback_failed_edits: config.rollback_failed_edits,
        }
    }
}

struct Bookkeeping {
    generation: u64,
    edit_revision: u64,
    principal: Option<AuthenticatedPrincipal>,
}

struct Inner {
    provider: Arc<dyn IdentityProvider>,
    exchange: Arc<dyn CredentialExchange>,
    profiles: ProfileStore,
    options: SessionOptions,
    state_tx: watch::Sender<SessionState>,
    notify_tx: broadcast::Sender<Notification>,
    // Never held across an await.
    book: Mutex<Bookkeeping>,
}

/// Step of the sign-in chain that failed, for the user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignInPhase {
    Provider,
    Exchange,
    CheckUser,
    Register,
}

type SignInResult = std::result::Result<SignInSuccess, (SignInPhase, SyncError)>;

struct SignInSuccess {
    identity: Identity,
    principal: AuthenticatedPrincipal,
    profile: ProfileRecord,
    outcome: FetchOutcome,
}

/// Drives the session state machine for a single user.
///
/// Cloning gives another handle to the same session.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    /// Create a signed-out controller without looking for an existing session.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        exchange: Arc<dyn CredentialExchange>,
        profiles: ProfileStore,
        options: SessionOptions,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::SignedOut);
        let (notify_tx, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                provider,
                exchange,
                profiles,
                options,
                state_tx,
                notify_tx,
                book: Mutex::new(Bookkeeping {
                    generation: 0,
                    edit_revision: 0,
                    principal: None,
                }),
            }),
        }
    }

    /// Create a controller and resume the provider's existing session, if
    /// there is one, without showing the interactive sign-in.
    pub async fn start(
        provider: Arc<dyn IdentityProvider>,
        exchange: Arc<dyn CredentialExchange>,
        profiles: ProfileStore,
        options: SessionOptions,
    ) -> Self {
        let controller = Self::new(provider, exchange, profiles, options);
        controller.resume().await;
        controller
    }

    // ─── Observation ─────────────────────────────────────────────

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.inner.state_tx.borrow().clone()
    }

    /// Receiver that observes every published state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    /// Receiver for user-facing notifications sent after this call.
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.notify_tx.subscribe()
    }

    /// Principal of the current session, if signed in.
    pub fn principal(&self) -> Option<AuthenticatedPrincipal> {
        self.lock().principal.clone()
    }

    /// Current session epoch. Advances on every sign-in attempt, resume
    /// and sign-out.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    // ─── Sign-in ─────────────────────────────────────────────────

    /// Start an interactive sign-in. Ignored unless signed out.
    pub async fn begin_sign_in(&self) {
        let generation = {
            let mut book = self.lock();
            if !self.inner.state_tx.borrow().is_signed_out() {
                tracing::debug!(
                    state = self.inner.state_tx.borrow().label(),
                    "Sign-in already in progress or signed in; ignoring"
                );
                return;
            }
            book.generation += 1;
            self.publish(SessionState::SigningIn);
            book.generation
        };

        tracing::info!(generation, "Starting interactive sign-in");

        let result = match self.inner.provider.begin_interactive_sign_in().await {
            Ok(SignInOutcome::SignedIn(identity)) => self.authenticate(identity).await,
            Ok(SignInOutcome::Cancelled) => {
                Err((SignInPhase::Provider, SyncError::ProviderCancelled))
            }
            Err(e) => Err((SignInPhase::Provider, e)),
        };

        self.complete_sign_in(generation, result).await;
    }

    /// Pick up the provider's existing session, skipping `SigningIn`.
    /// [`start`](Self::start) calls this; it is a no-op unless signed out.
    pub async fn resume(&self) {
        let generation = {
            let mut book = self.lock();
            if !self.inner.state_tx.borrow().is_signed_out() {
                return;
            }
            book.generation += 1;
            book.generation
        };

        let identity = match self.inner.provider.current_session().await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                tracing::debug!("No existing provider session to resume");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not check for an existing session");
                self.complete_sign_in(generation, Err((SignInPhase::Provider, e)))
                    .await;
                return;
            }
        };

        tracing::info!(generation, user_id = %identity.id, "Resuming existing session");
        let result = self.authenticate(identity).await;
        self.complete_sign_in(generation, result).await;
    }

    async fn authenticate(&self, identity: Identity) -> SignInResult {
        let principal = self
            .inner
            .exchange
            .exchange(&identity)
            .await
            .map_err(|e| (SignInPhase::Exchange, e))?;

        let profiles = &self.inner.profiles;
        let existing = profiles
            .fetch(&identity.id)
            .await
            .map_err(|e| (SignInPhase::CheckUser, e))?;
        let (profile, outcome) = match existing {
            Some(profile) => (profile, FetchOutcome::Existing),
            None => profiles
                .create_default(&identity)
                .await
                .map_err(|e| (SignInPhase::Register, e))?,
        };

        Ok(SignInSuccess {
            identity,
            principal,
            profile,
            outcome,
        })
    }

    /// Publish the outcome of a sign-in attempt, or, if the user signed
    /// out while it was running, undo the provider session it left behind.
    async fn complete_sign_in(&self, generation: u64, result: SignInResult) {
        if !self.finish_sign_in(generation, result) {
            return;
        }

        tracing::info!(generation, "Revoking provider session of abandoned sign-in");
        if let Err(e) = self.inner.provider.revoke_session().await {
            tracing::warn!(generation, error = %e, "Failed to revoke abandoned sign-in");
        }
    }

    /// Returns true when a stale attempt succeeded at the provider while
    /// the controller is signed out, so its provider session must go.
    fn finish_sign_in(&self, generation: u64, result: SignInResult) -> bool {
        let mut book = self.lock();
        if book.generation != generation {
            tracing::debug!(
                generation,
                current = book.generation,
                "Discarding stale sign-in completion"
            );
            // A newer attempt may own the provider session now; leave it be.
            return result.is_ok() && self.inner.state_tx.borrow().is_signed_out();
        }

        match result {
            Ok(success) => {
                tracing::info!(
                    generation,
                    user_id = %success.identity.id,
                    created = success.outcome == FetchOutcome::Created,
                    "Signed in"
                );
                book.principal = Some(success.principal);
                self.publish(SessionState::SignedIn(SignedIn::new(
                    success.identity,
                    success.profile,
                )));
                self.notify(Notification::info(match success.outcome {
                    FetchOutcome::Created => "Successfully registered",
                    FetchOutcome::Existing => "Successfully logged in!",
                }));
            }
            Err((phase, e)) => {
                book.principal = None;
                self.publish(SessionState::SignedOut);
                if e.is_silent() {
                    tracing::info!(generation, "Sign-in cancelled by user");
                } else {
                    tracing::warn!(
                        generation,
                        ?phase,
                        transient = e.is_transient(),
                        error = %e,
                        "Sign-in failed"
                    );
                    self.notify(Notification::error(sign_in_failure_message(phase, &e)));
                }
            }
        }
        false
    }

    // ─── Editing ─────────────────────────────────────────────────

    /// Enter edit mode with the current display name as the pending text.
    pub fn begin_edit(&self) {
        let _book = self.lock();
        let started = self.update_signed_in(|s| {
            if s.editing() || s.saving {
                return false;
            }
            s.pending_display_name = Some(s.profile.display_name.clone());
            true
        });
        if !started {
            tracing::debug!("Edit not available in current state; ignoring");
        }
    }

    /// Leave edit mode without writing anything.
    pub fn cancel_edit(&self) {
        let _book = self.lock();
        self.update_signed_in(|s| s.pending_display_name.take().is_some());
    }

    /// Save `new_name` as the display name.
    ///
    /// The local state shows the new name immediately; the store write
    /// follows. A failed write is reported but, unless rollback is
    /// enabled, the local name is kept.
    pub async fn commit_edit(&self, new_name: &str) {
        let (generation, revision, user_id, name, previous) = {
            let mut book = self.lock();
            let Some(current) = self.editable_session() else {
                tracing::debug!("Not editing; ignoring commit");
                return;
            };

            let name = match normalize_display_name(new_name) {
                Ok(name) => name,
                Err(e) => {
                    self.notify(Notification::error(format!("Invalid display name: {e}")));
                    return;
                }
            };

            book.edit_revision += 1;
            let previous = current.profile.display_name.clone();
            let mut next = current.clone();
            next.profile.display_name = name.clone();
            next.pending_display_name = None;
            next.saving = true;
            self.publish(SessionState::SignedIn(next));

            (
                book.generation,
                book.edit_revision,
                current.identity.id,
                name,
                previous,
            )
        };

        tracing::debug!(generation, user_id = %user_id, "Saving display name");
        let result = self
            .inner
            .profiles
            .update_display_name(&user_id, &name)
            .await;

        let book = self.lock();
        if book.generation != generation {
            tracing::debug!(
                generation,
                current = book.generation,
                "Discarding stale display name completion"
            );
            return;
        }

        let rollback = self.inner.options.rollback_failed_edits
            && result.is_err()
            && book.edit_revision == revision;
        self.update_signed_in(|s| {
            s.saving = false;
            if rollback {
                s.profile.display_name = previous;
            }
            true
        });

        match result {
            Ok(_) => self.notify(Notification::info("Name updated")),
            Err(e) => {
                tracing::warn!(
                    generation,
                    user_id = %user_id,
                    transient = e.is_transient(),
                    error = %e,
                    "Display name update failed"
                );
                self.notify(Notification::error(format!("Failed to update name: {e}")));
            }
        }
    }

    /// Re-read the display name from the store.
    pub async fn refresh_profile(&self) {
        let (generation, revision, user_id) = {
            let book = self.lock();
            let Some(current) = self.signed_in() else {
                return;
            };
            if current.editing() || current.saving {
                tracing::debug!("Edit in progress; skipping profile refresh");
                return;
            }
            (book.generation, book.edit_revision, current.identity.id)
        };

        let result = self.inner.profiles.fetch_display_name(&user_id).await;

        let _book = {
            let book = self.lock();
            if book.generation != generation || book.edit_revision != revision {
                tracing::debug!(generation, "Discarding stale profile refresh");
                return;
            }
            book
        };

        match result {
            Ok(name) => {
                self.update_signed_in(|s| {
                    if s.editing() || s.saving || s.profile.display_name == name {
                        return false;
                    }
                    s.profile.display_name = name;
                    true
                });
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Profile refresh failed");
                self.notify(Notification::error(format!(
                    "Failed to fetch display name: {e}"
                )));
            }
        }
    }

    // ─── Sign-out ────────────────────────────────────────────────

    /// End the session. Also abandons an in-flight sign-in.
    ///
    /// The local session ends even if the provider cannot be reached.
    pub async fn sign_out(&self) {
        let generation = {
            let mut book = self.lock();
            if self.inner.state_tx.borrow().is_signed_out() {
                tracing::debug!("Already signed out");
                return;
            }
            book.generation += 1;
            book.principal = None;
            self.publish(SessionState::SignedOut);
            book.generation
        };

        if let Err(e) = self.inner.provider.revoke_session().await {
            tracing::warn!(generation, error = %e, "Provider sign-out failed; local session ended");
        }

        tracing::info!(generation, "Signed out");
    }

    // ─── Helpers ─────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, Bookkeeping> {
        self.inner.book.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: SessionState) {
        tracing::debug!(state = state.label(), "Session state changed");
        self.inner.state_tx.send_replace(state);
    }

    fn notify(&self, notification: Notification) {
        // No subscribers is fine.
        let _ = self.inner.notify_tx.send(notification);
    }

    fn signed_in(&self) -> Option<SignedIn> {
        self.inner.state_tx.borrow().signed_in().cloned()
    }

    fn editable_session(&self) -> Option<SignedIn> {
        self.signed_in().filter(|s| s.editing() && !s.saving)
    }

    /// Apply `change` to a copy of the signed-in state and publish it if
    /// `change` returns true. Callers hold the bookkeeping lock.
    fn update_signed_in(&self, change: impl FnOnce(&mut SignedIn) -> bool) -> bool {
        let Some(mut next) = self.signed_in() else {
            return false;
        };
        if !change(&mut next) {
            return false;
        }
        self.publish(SessionState::SignedIn(next));
        true
    }
}

fn sign_in_failure_message(phase: SignInPhase, e: &SyncError) -> String {
    match phase {
        SignInPhase::Provider => format!("Google sign in failed: {e}"),
        SignInPhase::Exchange => format!("Authentication failed: {e}"),
        SignInPhase::CheckUser => format!("Failed to check user: {e}"),
        SignInPhase::Register => format!("Registration failed: {e}"),
    }
}
