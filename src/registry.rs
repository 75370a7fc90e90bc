//! Source registry: the only writer of [`DataSource`] records.
//!
//! Every mutation goes through [`SourceStore::update`], which applies a
//! transformation atomically per record. The registry owns the status
//! state machine:
//!
//! | Operation | Transition |
//! |-----------|------------|
//! | [`add`](SourceRegistry::add) | new → `connected` |
//! | [`refresh_all`](SourceRegistry::refresh_all) | → `syncing` → `connected` \| `error` (maintenance skipped) |
//! | [`set_status`](SourceRegistry::set_status) | any → `maintenance` \| `disconnected` |
//! | [`reconnect`](SourceRegistry::reconnect) | `error` \| `disconnected` → `connected`, or → `error` |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use datasynergy_core::models::{ConnectionTestResult, DataSource, SourceDraft, SourceStatus};
use datasynergy_core::store::SourceStore;
use datasynergy_core::{Result, ServiceError};

use crate::backend::Backend;
use crate::tester::ConnectionTester;

/// Counts from one [`SourceRegistry::refresh_all`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub failed: usize,
    /// Sources left alone because they are under maintenance.
    pub skipped: usize,
}

enum RefreshOutcome {
    Refreshed,
    Failed,
    Skipped,
}

pub struct SourceRegistry {
    store: Arc<dyn SourceStore>,
    backend: Arc<dyn Backend>,
    tester: ConnectionTester,
}

/// A sync timestamp strictly after `previous`, normally "now".
fn next_sync_time(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if prev >= now => prev + chrono::Duration::microseconds(1),
        _ => now,
    }
}

fn illegal(from: SourceStatus, to: SourceStatus) -> ServiceError {
    ServiceError::validation(format!("cannot move a {} source to {}", from, to))
}

impl SourceRegistry {
    pub fn new(
        store: Arc<dyn SourceStore>,
        backend: Arc<dyn Backend>,
        tester: ConnectionTester,
    ) -> Self {
        Self {
            store,
            backend,
            tester,
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn tester(&self) -> &ConnectionTester {
        &self.tester
    }

    pub async fn list(&self) -> Result<Vec<Arc<DataSource>>> {
        self.store.list().await
    }

    /// Like [`get`](Self::get) but `None` for unknown ids.
    pub async fn find(&self, id: &str) -> Result<Option<Arc<DataSource>>> {
        self.store.get(id).await
    }

    pub async fn get(&self, id: &str) -> Result<Arc<DataSource>> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(id))
    }

    /// Registers a new source. The draft is validated before anything is
    /// stored; the new record is visible to `list`/`get` once this returns.
    pub async fn add(&self, draft: SourceDraft) -> Result<Arc<DataSource>> {
        draft.validate()?;

        let source = DataSource {
            id: Uuid::new_v4().to_string(),
            name: draft.name.trim().to_string(),
            kind: draft.kind,
            status: SourceStatus::Connected,
            credentials: draft.credentials,
            last_sync: Some(Utc::now()),
            record_count: Some(0),
            quality_score: Some(100),
            message: None,
            icon: Some(
                draft
                    .icon
                    .unwrap_or_else(|| draft.kind.default_icon().to_string()),
            ),
            schemas: draft.schemas,
        };

        let stored = self.store.insert(source).await?;
        info!(id = %stored.id, name = %stored.name, kind = %stored.kind, "data source added");
        Ok(stored)
    }

    /// Refreshes every source not under maintenance, concurrently.
    ///
    /// A failing source ends in `error` with the failure text as its
    /// message and never stops the others.
    pub async fn refresh_all(&self) -> Result<RefreshSummary> {
        let sources = self.store.list().await?;
        info!(sources = sources.len(), "refresh started");

        let mut summary = RefreshSummary::default();
        let mut tasks = JoinSet::new();
        for source in sources {
            if source.status == SourceStatus::Maintenance {
                summary.skipped += 1;
                continue;
            }
            let store = self.store.clone();
            let backend = self.backend.clone();
            tasks.spawn(async move { refresh_one(store, backend, &source.id).await });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(RefreshOutcome::Refreshed)) => summary.refreshed += 1,
                Ok(Ok(RefreshOutcome::Failed)) => summary.failed += 1,
                Ok(Ok(RefreshOutcome::Skipped)) => summary.skipped += 1,
                Ok(Err(e)) => {
                    error!(error = %e, "refresh could not record its outcome");
                    summary.failed += 1;
                }
                Err(e) => {
                    error!(error = %e, "refresh task aborted");
                    summary.failed += 1;
                }
            }
        }

        info!(
            refreshed = summary.refreshed,
            failed = summary.failed,
            skipped = summary.skipped,
            "refresh finished"
        );
        Ok(summary)
    }

    /// Administrative status change. Only `maintenance` and `disconnected`
    /// can be set directly.
    pub async fn set_status(
        &self,
        id: &str,
        status: SourceStatus,
        message: Option<String>,
    ) -> Result<Arc<DataSource>> {
        if !status.is_administrative() {
            return Err(ServiceError::validation(format!(
                "status '{}' cannot be set directly; use refresh or reconnect",
                status
            )));
        }
        let message = message.or_else(|| {
            (status == SourceStatus::Maintenance).then(|| "Under maintenance".to_string())
        });

        let updated = self
            .store
            .update(id, &|s| {
                if !s.status.can_transition(status) {
                    return Err(illegal(s.status, status));
                }
                Ok(DataSource {
                    status,
                    message: message.clone(),
                    ..s.clone()
                })
            })
            .await?
            .ok_or_else(|| ServiceError::not_found(id))?;

        info!(id, status = %status, "status set");
        Ok(updated)
    }

    /// Re-tests the stored credentials and moves the source accordingly.
    /// A source that is `syncing` is left to its refresh.
    pub async fn reconnect(&self, id: &str) -> Result<ConnectionTestResult> {
        let source = self.get(id).await?;
        if source.status == SourceStatus::Maintenance {
            return Err(illegal(SourceStatus::Maintenance, SourceStatus::Connected));
        }

        let credentials = source.credentials.clone().unwrap_or_default();
        let result = self.tester.test(&credentials, source.kind).await;

        self.store
            .update(id, &|s| {
                if s.status == SourceStatus::Maintenance {
                    return Err(illegal(s.status, SourceStatus::Connected));
                }
                let mut next = s.clone();
                if s.status == SourceStatus::Syncing {
                    return Ok(next);
                }
                if result.success {
                    if s.status.can_transition(SourceStatus::Connected) {
                        next.status = SourceStatus::Connected;
                    }
                    next.message = None;
                } else {
                    next.status = SourceStatus::Error;
                    next.message = Some(result.message.clone());
                }
                Ok(next)
            })
            .await?
            .ok_or_else(|| ServiceError::not_found(id))?;

        if !result.success {
            warn!(id, message = %result.message, "reconnect failed");
        }
        Ok(result)
    }
}

async fn refresh_one(
    store: Arc<dyn SourceStore>,
    backend: Arc<dyn Backend>,
    id: &str,
) -> Result<RefreshOutcome> {
    let started = store
        .update(id, &|s| {
            if !s.status.can_transition(SourceStatus::Syncing) {
                return Err(illegal(s.status, SourceStatus::Syncing));
            }
            Ok(DataSource {
                status: SourceStatus::Syncing,
                ..s.clone()
            })
        })
        .await;

    // Moved to maintenance (or removed) between listing and starting.
    let snapshot = match started {
        Ok(Some(s)) => s,
        Ok(None) | Err(ServiceError::Validation(_)) => return Ok(RefreshOutcome::Skipped),
        Err(e) => return Err(e),
    };

    let outcome = backend.sync(&snapshot).await;
    let failed = outcome.is_err();
    if let Err(e) = &outcome {
        warn!(id, error = %e, "source refresh failed");
    }

    let finished = store
        .update(id, &|s| {
            if s.status != SourceStatus::Syncing {
                return Err(illegal(s.status, SourceStatus::Connected));
            }
            let mut next = s.clone();
            match &outcome {
                Ok(report) => {
                    next.status = SourceStatus::Connected;
                    next.record_count = Some(report.record_count);
                    next.last_sync = Some(next_sync_time(s.last_sync));
                    next.message = None;
                }
                Err(e) => {
                    next.status = SourceStatus::Error;
                    next.message = Some(e.detail().to_string());
                }
            }
            Ok(next)
        })
        .await;

    match finished {
        Ok(Some(_)) if failed => Ok(RefreshOutcome::Failed),
        Ok(Some(_)) => Ok(RefreshOutcome::Refreshed),
        Ok(None) | Err(ServiceError::Validation(_)) => Ok(RefreshOutcome::Skipped),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedBackend;
    use datasynergy_core::models::{ConnectionCredentials, DataSourceKind};
    use datasynergy_core::store::memory::InMemoryStore;
    use std::time::Duration;

    fn registry(backend: SimulatedBackend) -> SourceRegistry {
        let backend: Arc<dyn Backend> = Arc::new(backend);
        SourceRegistry::new(
            Arc::new(InMemoryStore::new()),
            backend.clone(),
            ConnectionTester::new(backend, Duration::from_secs(5)),
        )
    }

    fn pg_draft(name: &str) -> SourceDraft {
        SourceDraft::new(name, DataSourceKind::Postgresql).with_credentials(
            ConnectionCredentials::relational("localhost", 5432, "test", "user", "pw"),
        )
    }

    #[tokio::test]
    async fn test_add_assigns_defaults() {
        let reg = registry(SimulatedBackend::new());
        let added = reg.add(pg_draft("  Test DB ")).await.unwrap();
        assert_eq!(added.name, "Test DB");
        assert_eq!(added.status, SourceStatus::Connected);
        assert_eq!(added.record_count, Some(0));
        assert_eq!(added.quality_score, Some(100));
        assert_eq!(added.icon.as_deref(), Some("Database"));
        assert!(added.last_sync.is_some());
        assert_eq!(*reg.get(&added.id).await.unwrap(), *added);
    }

    #[tokio::test]
    async fn test_add_rejects_missing_credentials() {
        let reg = registry(SimulatedBackend::new());
        let err = reg
            .add(SourceDraft::new("pg", DataSourceKind::Postgresql))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation");
        assert!(reg.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let reg = registry(SimulatedBackend::new());
        assert_eq!(
            reg.get("nope").await.unwrap_err(),
            ServiceError::not_found("nope")
        );
    }

    #[tokio::test]
    async fn test_set_status_only_administrative() {
        let reg = registry(SimulatedBackend::new());
        let added = reg.add(pg_draft("pg")).await.unwrap();

        let err = reg
            .set_status(&added.id, SourceStatus::Connected, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation");

        let s = reg
            .set_status(&added.id, SourceStatus::Maintenance, None)
            .await
            .unwrap();
        assert_eq!(s.status, SourceStatus::Maintenance);
        assert_eq!(s.message.as_deref(), Some("Under maintenance"));

        let s = reg
            .set_status(&added.id, SourceStatus::Disconnected, Some("retired".into()))
            .await
            .unwrap();
        assert_eq!(s.status, SourceStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_refresh_skips_maintenance() {
        let reg = registry(SimulatedBackend::new());
        let a = reg.add(pg_draft("a")).await.unwrap();
        let b = reg.add(pg_draft("b")).await.unwrap();
        reg.set_status(&b.id, SourceStatus::Maintenance, None)
            .await
            .unwrap();

        let summary = reg.refresh_all().await.unwrap();
        assert_eq!(
            summary,
            RefreshSummary {
                refreshed: 1,
                failed: 0,
                skipped: 1
            }
        );
        let a2 = reg.get(&a.id).await.unwrap();
        assert!(a2.last_sync > a.last_sync);
        assert_eq!(reg.get(&b.id).await.unwrap().status, SourceStatus::Maintenance);
    }

    #[tokio::test]
    async fn test_reconnect_recovers_and_fails() {
        let reg = registry(SimulatedBackend::new().with_unreachable_host("down.local"));
        let ok = reg.add(pg_draft("ok")).await.unwrap();
        reg.set_status(&ok.id, SourceStatus::Disconnected, None)
            .await
            .unwrap();
        let result = reg.reconnect(&ok.id).await.unwrap();
        assert!(result.success);
        let s = reg.get(&ok.id).await.unwrap();
        assert_eq!(s.status, SourceStatus::Connected);
        assert!(s.message.is_none());

        let down = reg
            .add(
                SourceDraft::new("down", DataSourceKind::Mysql).with_credentials(
                    ConnectionCredentials::relational("down.local", 3306, "d", "u", "p"),
                ),
            )
            .await
            .unwrap();
        let result = reg.reconnect(&down.id).await.unwrap();
        assert!(!result.success);
        let s = reg.get(&down.id).await.unwrap();
        assert_eq!(s.status, SourceStatus::Error);
        assert_eq!(s.message.as_deref(), Some(result.message.as_str()));
    }

    #[tokio::test]
    async fn test_reconnect_leaves_syncing_source_to_refresh() {
        let backend: Arc<dyn Backend> = Arc::new(SimulatedBackend::new());
        let reg = SourceRegistry::new(
            Arc::new(InMemoryStore::with_sources(crate::seed::demo_sources())),
            backend.clone(),
            ConnectionTester::new(backend, Duration::from_secs(5)),
        );
        let before = reg.get("2").await.unwrap();
        assert_eq!(before.status, SourceStatus::Syncing);

        let result = reg.reconnect("2").await.unwrap();
        assert!(result.success);
        let during = reg.get("2").await.unwrap();
        assert_eq!(during.status, SourceStatus::Syncing);

        let summary = reg.refresh_all().await.unwrap();
        assert_eq!(summary.skipped, 1);
        let after = reg.get("2").await.unwrap();
        assert_eq!(after.status, SourceStatus::Connected);
        assert_eq!(after.record_count, before.record_count);
        assert!(after.last_sync > before.last_sync);
    }

    #[tokio::test]
    async fn test_reconnect_refuses_maintenance() {
        let reg = registry(SimulatedBackend::new());
        let s = reg.add(pg_draft("m")).await.unwrap();
        reg.set_status(&s.id, SourceStatus::Maintenance, None)
            .await
            .unwrap();
        assert_eq!(reg.reconnect(&s.id).await.unwrap_err().code(), "validation");
    }

    #[test]
    fn test_next_sync_time_is_strictly_later() {
        let future = Utc::now() + chrono::Duration::hours(1);
        assert!(next_sync_time(Some(future)) > future);
        let past = Utc::now() - chrono::Duration::hours(1);
        assert!(next_sync_time(Some(past)) > past);
        assert!(next_sync_time(None) <= Utc::now());
    }
}
