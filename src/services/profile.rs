// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile record access: load-or-create on sign-in, single-field edits.

use crate::db::{CreateOutcome, DocumentStore, Fields};
use crate::error::{Result, SyncError};
use crate::models::profile::{normalize_display_name, DISPLAY_NAME_FIELD};
use crate::models::{Identity, ProfileRecord, DEFAULT_DISPLAY_NAME};
use std::sync::Arc;

/// Whether `fetch_or_create` found or wrote the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Existing,
    Created,
}

/// Profile records keyed by identity ID.
#[derive(Clone)]
pub struct ProfileStore {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Load the record for `identity`, creating the default one if absent.
    ///
    /// An existing record is returned as stored, even if the identity's
    /// email or photo changed since it was written.
    pub async fn fetch_or_create(
        &self,
        identity: &Identity,
    ) -> Result<(ProfileRecord, FetchOutcome)> {
        match self.fetch(&identity.id).await? {
            Some(record) => Ok((record, FetchOutcome::Existing)),
            None => self.create_default(identity).await,
        }
    }

    /// The stored record for `id`, if any.
    pub async fn fetch(&self, id: &str) -> Result<Option<ProfileRecord>> {
        let Some(fields) = self.store.get(&self.collection, id).await? else {
            return Ok(None);
        };

        ProfileRecord::from_fields(id, fields).map(Some).map_err(|e| {
            SyncError::StoreUnavailable(format!("malformed profile document {id}: {e}"))
        })
    }

    /// Write the default record for `identity` unless one already exists.
    ///
    /// If another client created the record first, theirs is returned
    /// with [`FetchOutcome::Existing`].
    pub async fn create_default(
        &self,
        identity: &Identity,
    ) -> Result<(ProfileRecord, FetchOutcome)> {
        let record = ProfileRecord::new_default(identity);
        match self
            .store
            .create(&self.collection, &identity.id, record.to_fields())
            .await?
        {
            CreateOutcome::Created => {
                tracing::info!(user_id = %identity.id, "Created profile record");
                Ok((record, FetchOutcome::Created))
            }
            CreateOutcome::AlreadyExists => {
                // Lost a creation race; whatever the winner stored is authoritative.
                tracing::debug!(user_id = %identity.id, "Profile created concurrently, re-reading");
                let stored = self.fetch(&identity.id).await?.ok_or_else(|| {
                    SyncError::StoreUnavailable(format!(
                        "profile {} reported as existing but could not be read",
                        identity.id
                    ))
                })?;
                Ok((stored, FetchOutcome::Existing))
            }
        }
    }

    /// Overwrite only `displayName` on an existing record.
    ///
    /// Returns the normalized name that was written.
    pub async fn update_display_name(&self, id: &str, new_name: &str) -> Result<String> {
        let name = normalize_display_name(new_name)?;

        let mut patch = Fields::new();
        patch.insert(
            DISPLAY_NAME_FIELD.to_string(),
            serde_json::Value::String(name.clone()),
        );

        self.store.update(&self.collection, id, patch).await?;
        tracing::info!(user_id = %id, "Display name updated");
        Ok(name)
    }

    /// Current display name, with missing records or fields reading as
    /// the default.
    pub async fn fetch_display_name(&self, id: &str) -> Result<String> {
        match self.fetch(id).await? {
            Some(record) => Ok(record.display_name),
            None => {
                tracing::debug!(user_id = %id, "No profile record, using default display name");
                Ok(DEFAULT_DISPLAY_NAME.to_string())
            }
        }
    }
}
