//! In-memory [`SourceStore`] used by the simulated backend and by tests.
//!
//! Records live in a `Vec<Arc<DataSource>>` behind `std::sync::RwLock`.
//! Reads clone the `Arc`s under a short read lock; updates run their
//! transformation under the write lock and swap the `Arc`.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::{Result, ServiceError};
use crate::models::DataSource;

use super::{SourceStore, UpdateFn};

/// In-memory store for the simulated backend and tests.
pub struct InMemoryStore {
    records: RwLock<Vec<Arc<DataSource>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// A store preloaded with `sources`, in order.
    pub fn with_sources(sources: impl IntoIterator<Item = DataSource>) -> Self {
        Self {
            records: RwLock::new(sources.into_iter().map(Arc::new).collect()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Arc<DataSource>>>> {
        self.records
            .read()
            .map_err(|_| ServiceError::internal("source store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Arc<DataSource>>>> {
        self.records
            .write()
            .map_err(|_| ServiceError::internal("source store lock poisoned"))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceStore for InMemoryStore {
    async fn list(&self) -> Result<Vec<Arc<DataSource>>> {
        Ok(self.read()?.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Arc<DataSource>>> {
        Ok(self.read()?.iter().find(|s| s.id == id).cloned())
    }

    async fn insert(&self, source: DataSource) -> Result<Arc<DataSource>> {
        let mut records = self.write()?;
        if records.iter().any(|s| s.id == source.id) {
            return Err(ServiceError::validation(format!(
                "duplicate data source id: {}",
                source.id
            )));
        }
        let record = Arc::new(source);
        records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, apply: &UpdateFn<'_>) -> Result<Option<Arc<DataSource>>> {
        let mut records = self.write()?;
        let Some(slot) = records.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        let mut next = apply(slot)?;
        // The id is the record's identity; transformations cannot change it.
        next.id = slot.id.clone();
        let record = Arc::new(next);
        *slot = record.clone();
        Ok(Some(record))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}
