//! Simulated backend: no network, deterministic data, configurable failures.
//!
//! Every call sleeps for the configured latency, then answers from the
//! source's recorded metadata. Failures are injected three ways:
//!
//! | Knob | Effect |
//! |------|--------|
//! | `unreachable_hosts` | `connect`/`sync` fail with an unreachable-host error |
//! | `failure_rate` | `connect` randomly rejects credentials |
//! | [`with_failing_source`](SimulatedBackend::with_failing_source) | `sync` of that id fails |
//!
//! Query text is answered by shape, not executed:
//!
//! - `COUNT(` or `countDocuments` → one `count` row with the table's row count
//! - a known table (SQL `FROM x` or `db.x.`) → synthesized rows typed from the schema
//! - anything else → three fixed `id, name, value` rows

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use regex::Regex;

use datasynergy_core::models::{
    CellValue, Column, ConnectionCredentials, DataSource, DataSourceKind, Table,
};
use datasynergy_core::optimize::referenced_table;
use datasynergy_core::{ConnectionFailure, Result, ServiceError};

use crate::backend::{Backend, RowSet, SyncReport};
use crate::config::SimulationConfig;

/// Upper bound on synthesized rows per query.
const MAX_SAMPLE_ROWS: usize = 5;

static COUNT_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcount\s*\(|\.countDocuments\s*\(").expect("valid regex")
});
static MONGO_COLLECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*db\.([A-Za-z_]\w*)\.").expect("valid regex"));
static SELECT_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\s*select\s+(.*?)\s+from\b").expect("valid regex"));
static LIMIT_N: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blimit\s*\(?\s*(\d+)").expect("valid regex"));

pub struct SimulatedBackend {
    latency: Duration,
    failure_rate: f64,
    unreachable_hosts: HashSet<String>,
    failing_sources: HashSet<String>,
}

impl SimulatedBackend {
    /// A backend with no latency and no injected failures.
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            failure_rate: 0.0,
            unreachable_hosts: HashSet::new(),
            failing_sources: HashSet::new(),
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            latency: config.latency(),
            failure_rate: config.failure_rate,
            unreachable_hosts: config
                .unreachable_hosts
                .iter()
                .map(|h| h.to_lowercase())
                .collect(),
            failing_sources: HashSet::new(),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_unreachable_host(mut self, host: &str) -> Self {
        self.unreachable_hosts.insert(host.to_lowercase());
        self
    }

    /// Makes every sync of source `id` fail with "Connection refused".
    pub fn with_failing_source(mut self, id: &str) -> Self {
        self.failing_sources.insert(id.to_string());
        self
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn is_unreachable(&self, credentials: &ConnectionCredentials) -> bool {
        if let Some(host) = credentials.host.as_deref() {
            if self.unreachable_hosts.contains(&host.trim().to_lowercase()) {
                return true;
            }
        }
        credentials.connection_string.as_deref().is_some_and(|cs| {
            let cs = cs.to_lowercase();
            self.unreachable_hosts.iter().any(|h| cs.contains(h.as_str()))
        })
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn unreachable(credentials: &ConnectionCredentials) -> ServiceError {
    ServiceError::connection(
        ConnectionFailure::Unreachable,
        format!("host unreachable ({})", credentials.endpoint()),
    )
}

fn requested_limit(query: &str) -> Option<usize> {
    LIMIT_N
        .captures(query)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn target_table<'a>(source: &'a DataSource, query: &str) -> Option<&'a Table> {
    let name = MONGO_COLLECTION
        .captures(query)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .or_else(|| referenced_table(query))?;
    source.find_table(name)
}

fn synth_cell(column: &Column, row: usize) -> CellValue {
    let n = row as i64 + 1;
    let ty = column.type_name.to_lowercase();
    if ty.contains("int") || ty == "serial" {
        CellValue::Int(n)
    } else if ["decimal", "numeric", "float", "double", "real"]
        .iter()
        .any(|t| ty.contains(t))
    {
        CellValue::Float(n as f64 * 25.5)
    } else if ty.contains("timestamp") || ty.contains("date") {
        CellValue::Text(format!("2024-01-{:02}T00:00:00Z", n))
    } else if ty.contains("bool") {
        CellValue::Bool(row % 2 == 0)
    } else {
        CellValue::Text(format!("{}_{}", column.name, n))
    }
}

/// Column expressions named in the select list, or `None` for `*`.
fn selected_columns(query: &str) -> Option<Vec<String>> {
    let list = SELECT_LIST.captures(query)?.get(1)?.as_str().trim();
    if list == "*" {
        return None;
    }
    Some(
        list.split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
    )
}

fn table_rows(table: &Table, query: &str) -> RowSet {
    let limit = requested_limit(query).unwrap_or(MAX_SAMPLE_ROWS);
    let n = limit
        .min(MAX_SAMPLE_ROWS)
        .min(usize::try_from(table.row_count).unwrap_or(usize::MAX));

    let picked: Vec<(String, Option<&Column>)> = match selected_columns(query) {
        Some(names) => names
            .into_iter()
            .map(|name| {
                let col = table.column(&name);
                (name, col)
            })
            .collect(),
        None => table
            .columns
            .iter()
            .map(|c| (c.name.clone(), Some(c)))
            .collect(),
    };

    let rows = (0..n)
        .map(|i| {
            picked
                .iter()
                .map(|(_, col)| col.map_or(CellValue::Null, |c| synth_cell(c, i)))
                .collect()
        })
        .collect();

    RowSet {
        columns: picked.into_iter().map(|(name, _)| name).collect(),
        rows,
    }
}

fn default_rows() -> RowSet {
    RowSet {
        columns: vec!["id".into(), "name".into(), "value".into()],
        rows: vec![
            vec![CellValue::Int(1), "A".into(), CellValue::Int(100)],
            vec![CellValue::Int(2), "B".into(), CellValue::Int(200)],
            vec![CellValue::Int(3), "C".into(), CellValue::Int(300)],
        ],
    }
}

/// Total rows recorded for a source: the recorded count, else the sum of
/// its tables' row counts.
fn recorded_records(source: &DataSource) -> u64 {
    match source.record_count {
        Some(n) if n > 0 => n,
        _ => source
            .schemas
            .iter()
            .flatten()
            .flat_map(|s| &s.tables)
            .map(|t| t.row_count)
            .sum(),
    }
}

#[async_trait]
impl Backend for SimulatedBackend {
    async fn connect(
        &self,
        kind: DataSourceKind,
        credentials: &ConnectionCredentials,
    ) -> Result<()> {
        self.pause().await;
        if self.is_unreachable(credentials) {
            return Err(unreachable(credentials));
        }
        let rejected = self.failure_rate > 0.0 && rand::thread_rng().gen_bool(self.failure_rate);
        if rejected {
            return Err(ServiceError::connection(
                ConnectionFailure::AuthenticationRejected,
                "Authentication failed",
            ));
        }
        tracing::debug!(kind = %kind, endpoint = %credentials.endpoint(), "simulated connect ok");
        Ok(())
    }

    async fn sync(&self, source: &DataSource) -> Result<SyncReport> {
        self.pause().await;
        if self.failing_sources.contains(&source.id) {
            return Err(ServiceError::connection(
                ConnectionFailure::Unreachable,
                "Connection refused",
            ));
        }
        if let Some(creds) = &source.credentials {
            if self.is_unreachable(creds) {
                return Err(unreachable(creds));
            }
        }
        Ok(SyncReport {
            record_count: recorded_records(source),
        })
    }

    async fn run_query(&self, source: &DataSource, query: &str) -> Result<RowSet> {
        self.pause().await;
        let table = target_table(source, query);

        if COUNT_CALL.is_match(query) {
            let count = table.map_or_else(|| recorded_records(source), |t| t.row_count);
            return Ok(RowSet {
                columns: vec!["count".into()],
                rows: vec![vec![CellValue::Int(
                    i64::try_from(count).unwrap_or(i64::MAX),
                )]],
            });
        }

        Ok(match table {
            Some(t) => table_rows(t, query),
            None => default_rows(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datasynergy_core::models::{Schema, SourceStatus};

    fn warehouse() -> DataSource {
        DataSource {
            id: "2".into(),
            name: "Warehouse".into(),
            kind: DataSourceKind::Postgresql,
            status: SourceStatus::Connected,
            credentials: Some(ConnectionCredentials::relational(
                "localhost", 5432, "warehouse", "admin", "pw",
            )),
            last_sync: None,
            record_count: None,
            quality_score: None,
            message: None,
            icon: None,
            schemas: Some(vec![Schema {
                name: "public".into(),
                tables: vec![Table {
                    name: "products".into(),
                    row_count: 3,
                    columns: vec![
                        Column::new("product_id", "int").primary(),
                        Column::new("product_name", "varchar"),
                        Column::new("price", "decimal"),
                    ],
                }],
            }]),
        }
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let backend = SimulatedBackend::new().with_unreachable_host("DB.Offline");
        let creds = ConnectionCredentials::relational("db.offline", 5432, "d", "u", "p");
        let err = backend
            .connect(DataSourceKind::Postgresql, &creds)
            .await
            .unwrap_err();
        match err {
            ServiceError::Connection { failure, message } => {
                assert_eq!(failure, ConnectionFailure::Unreachable);
                assert!(message.contains("db.offline:5432"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failure_rate_one_always_rejects() {
        let backend = SimulatedBackend::new().with_failure_rate(1.0);
        let creds = ConnectionCredentials::relational("h", 1, "d", "u", "p");
        let err = backend.connect(DataSourceKind::Mysql, &creds).await.unwrap_err();
        assert_eq!(err.detail(), "Authentication failed");
    }

    #[tokio::test]
    async fn test_select_star_rows_follow_schema() {
        let rows = SimulatedBackend::new()
            .run_query(&warehouse(), "SELECT * FROM products LIMIT 10")
            .await
            .unwrap();
        assert_eq!(rows.columns, vec!["product_id", "product_name", "price"]);
        assert_eq!(rows.rows.len(), 3);
        assert_eq!(rows.rows[1][0], CellValue::Int(2));
        assert_eq!(rows.rows[1][1], CellValue::Text("product_name_2".into()));
        assert!(rows.rows.iter().all(|r| r.len() == 3));
    }

    #[tokio::test]
    async fn test_selected_columns_and_unknown_names() {
        let rows = SimulatedBackend::new()
            .run_query(&warehouse(), "select price, colour from public.products limit 1")
            .await
            .unwrap();
        assert_eq!(rows.columns, vec!["price", "colour"]);
        assert_eq!(rows.rows, vec![vec![CellValue::Float(25.5), CellValue::Null]]);
    }

    #[tokio::test]
    async fn test_count_query() {
        let rows = SimulatedBackend::new()
            .run_query(&warehouse(), "SELECT COUNT(*) FROM products;")
            .await
            .unwrap();
        assert_eq!(rows.columns, vec!["count"]);
        assert_eq!(rows.rows, vec![vec![CellValue::Int(3)]]);
    }

    #[tokio::test]
    async fn test_unknown_table_gets_default_rows() {
        let rows = SimulatedBackend::new()
            .run_query(&warehouse(), "db.customers.find().limit(10)")
            .await
            .unwrap();
        assert_eq!(rows, default_rows());
    }

    #[tokio::test]
    async fn test_sync_reports_records_and_failures() {
        let backend = SimulatedBackend::new().with_failing_source("9");
        let report = backend.sync(&warehouse()).await.unwrap();
        assert_eq!(report.record_count, 3);

        let mut broken = warehouse();
        broken.id = "9".into();
        let err = backend.sync(&broken).await.unwrap_err();
        assert_eq!(err.detail(), "Connection refused");
    }

    #[test]
    fn test_requested_limit_forms() {
        assert_eq!(requested_limit("select 1 LIMIT 7"), Some(7));
        assert_eq!(requested_limit("db.x.find().limit( 3 )"), Some(3));
        assert_eq!(requested_limit("select 1"), None);
    }
}
