//! The seam between the façade and whatever actually holds the data.
//!
//! A [`Backend`] knows how to probe a connection, pull a source's record
//! count, and run query text against it. The registry, connection tester
//! and query executor only ever talk to `Arc<dyn Backend>`, so tests can
//! swap in counting or failing implementations and a real driver-backed
//! implementation can replace [`SimulatedBackend`](crate::simulated::SimulatedBackend)
//! without touching the callers.

use async_trait::async_trait;
use datasynergy_core::models::{CellValue, ConnectionCredentials, DataSource, DataSourceKind};
use datasynergy_core::Result;

/// Outcome of a successful sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub record_count: u64,
}

/// Raw rows as produced by a backend, before timing and shape checks.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// One connection attempt. Unreachable hosts and rejected credentials
    /// are reported as [`ServiceError::Connection`](datasynergy_core::ServiceError::Connection)
    /// with the matching failure kind.
    async fn connect(
        &self,
        kind: DataSourceKind,
        credentials: &ConnectionCredentials,
    ) -> Result<()>;

    /// Pulls fresh metadata for `source`.
    async fn sync(&self, source: &DataSource) -> Result<SyncReport>;

    /// Runs query text against `source`.
    async fn run_query(&self, source: &DataSource, query: &str) -> Result<RowSet>;
}
