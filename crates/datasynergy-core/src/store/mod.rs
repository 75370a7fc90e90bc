//! Storage abstraction for registered data sources.
//!
//! The [`SourceStore`] trait is the repository the source registry writes
//! through and every other component reads from. It is injected rather
//! than referenced as ambient state, so each process (or each test) owns
//! exactly one store.
//!
//! Records are handed out as `Arc<DataSource>` snapshots. Writers never
//! mutate a record in place: they build a new [`DataSource`] and the store
//! swaps it in, so a concurrent [`list`](SourceStore::list) sees either the
//! old or the new record, never a mix.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

pub use memory::InMemoryStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::DataSource;

/// Record transformation applied atomically by [`SourceStore::update`].
pub type UpdateFn<'a> = dyn Fn(&DataSource) -> Result<DataSource> + Send + Sync + 'a;

/// Abstract repository of data sources.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`list`](SourceStore::list) | Snapshot of all records in insertion order |
/// | [`get`](SourceStore::get) | Snapshot of one record |
/// | [`insert`](SourceStore::insert) | Add a new record (id must be unused) |
/// | [`update`](SourceStore::update) | Replace one record via a transformation |
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// All records, in insertion order.
    async fn list(&self) -> Result<Vec<Arc<DataSource>>>;

    /// One record by id, `None` when unknown.
    async fn get(&self, id: &str) -> Result<Option<Arc<DataSource>>>;

    /// Inserts a record. Fails with a validation error if the id is taken.
    async fn insert(&self, source: DataSource) -> Result<Arc<DataSource>>;

    /// Replaces the record `id` with `apply(current)`.
    ///
    /// Writes to the same id are serialized: `apply` always sees the latest
    /// committed record. Returns `None` when the id is unknown; an error
    /// from `apply` leaves the record untouched.
    async fn update(&self, id: &str, apply: &UpdateFn<'_>) -> Result<Option<Arc<DataSource>>>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize> {
        Ok(self.list().await?.len())
    }
}
