// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Used for offline runs (`PROFILE_STORE=memory`) and as the store behind
//! the controller tests. Write counters and failure injection let tests
//! observe exactly what reached the store.

use super::{CreateOutcome, DocumentStore, Fields};
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Write counts observed by a [`MemoryStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCounts {
    pub creates: usize,
    pub updates: usize,
}

#[derive(Default)]
struct Inner {
    docs: DashMap<(String, String), Fields>,
    creates: AtomicUsize,
    updates: AtomicUsize,
    unavailable: AtomicBool,
}

/// `DashMap`-backed document store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or overwrite a document without counting it as a write.
    pub fn insert(&self, collection: &str, id: &str, fields: Fields) {
        self.inner
            .docs
            .insert((collection.to_string(), id.to_string()), fields);
    }

    /// Drop a document, as if another client deleted it.
    pub fn remove(&self, collection: &str, id: &str) -> Option<Fields> {
        self.inner
            .docs
            .remove(&(collection.to_string(), id.to_string()))
            .map(|(_, fields)| fields)
    }

    /// Current contents of a document, bypassing failure injection.
    pub fn snapshot(&self, collection: &str, id: &str) -> Option<Fields> {
        self.inner
            .docs
            .get(&(collection.to_string(), id.to_string()))
            .map(|doc| doc.value().clone())
    }

    pub fn write_counts(&self) -> WriteCounts {
        WriteCounts {
            creates: self.inner.creates.load(Ordering::SeqCst),
            updates: self.inner.updates.load(Ordering::SeqCst),
        }
    }

    /// While set, every operation fails with `StoreUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(SyncError::StoreUnavailable(
                "memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Fields>> {
        self.check_available()?;
        Ok(self.snapshot(collection, id))
    }

    async fn create(&self, collection: &str, id: &str, fields: Fields) -> Result<CreateOutcome> {
        self.check_available()?;
        match self
            .inner
            .docs
            .entry((collection.to_string(), id.to_string()))
        {
            Entry::Occupied(_) => Ok(CreateOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(fields);
                self.inner.creates.fetch_add(1, Ordering::SeqCst);
                Ok(CreateOutcome::Created)
            }
        }
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<()> {
        self.check_available()?;
        let mut doc = self
            .inner
            .docs
            .get_mut(&(collection.to_string(), id.to_string()))
            .ok_or_else(|| SyncError::NotFound(format!("{collection}/{id}")))?;
        doc.extend(patch);
        self.inner.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
