// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed document store.
//!
//! Create-if-absent maps to a Firestore insert (which fails with
//! `ALREADY_EXISTS` when the document is present) and partial updates use
//! a field mask plus an `exists` precondition, so per-key atomicity comes
//! from Firestore itself.

use super::{CreateOutcome, DocumentStore, Fields};
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::FirestoreWritePrecondition;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self> {
        // The emulator rejects nothing, so skip credential discovery entirely.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            SyncError::StoreUnavailable(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            SyncError::StoreUnavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb> {
        self.client.as_ref().ok_or_else(|| {
            SyncError::StoreUnavailable("Database not connected (offline mode)".to_string())
        })
    }
}

fn unavailable(e: FirestoreError) -> SyncError {
    SyncError::StoreUnavailable(e.to_string())
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Fields>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj::<Fields>()
            .one(id)
            .await
            .map_err(unavailable)
    }

    async fn create(&self, collection: &str, id: &str, fields: Fields) -> Result<CreateOutcome> {
        let result: std::result::Result<Fields, FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collection)
            .document_id(id)
            .object(&fields)
            .execute()
            .await;

        match result {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(FirestoreError::DataConflictError(_)) => {
                tracing::debug!(collection, id, "Document already exists, insert skipped");
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(e) => Err(unavailable(e)),
        }
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<()> {
        let mask: Vec<String> = patch.keys().cloned().collect();

        let result: std::result::Result<Fields, FirestoreError> = self
            .get_client()?
            .fluent()
            .update()
            .fields(mask)
            .in_col(collection)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(id)
            .object(&patch)
            .execute()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(FirestoreError::DataNotFoundError(_)) => {
                Err(SyncError::NotFound(format!("{collection}/{id}")))
            }
            Err(e) => Err(unavailable(e)),
        }
    }
}
