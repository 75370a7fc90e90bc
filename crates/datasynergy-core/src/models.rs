//! Core data models for DataSynergy.
//!
//! These types describe data sources, their schemas, and every request and
//! response shape the façade exposes. They are serialized as JSON by the
//! HTTP server and printed by the CLI.
//!
//! # Source lifecycle
//!
//! ```text
//! SourceDraft ──add──▶ DataSource(connected)
//!                          │ refresh_all
//!                          ▼
//!                       syncing ──▶ connected | error
//! ```
//!
//! Administrative actions move a source to `maintenance` or
//! `disconnected`; `reconnect` brings an `error`/`disconnected` source back.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ServiceError};

// ═══════════════════════════════════════════════════════════════════════
// Kinds and statuses
// ═══════════════════════════════════════════════════════════════════════

/// Storage family of a [`DataSourceKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFamily {
    Relational,
    Document,
    FlatFile,
    HttpApi,
    Columnar,
}

/// The kind of backing store a data source points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    Mysql,
    Postgresql,
    Mongodb,
    Oracle,
    Sqlserver,
    Sqlite,
    Csv,
    Api,
    Snowflake,
}

impl DataSourceKind {
    pub const ALL: [DataSourceKind; 9] = [
        Self::Mysql,
        Self::Postgresql,
        Self::Mongodb,
        Self::Oracle,
        Self::Sqlserver,
        Self::Sqlite,
        Self::Csv,
        Self::Api,
        Self::Snowflake,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Postgresql => "postgresql",
            Self::Mongodb => "mongodb",
            Self::Oracle => "oracle",
            Self::Sqlserver => "sqlserver",
            Self::Sqlite => "sqlite",
            Self::Csv => "csv",
            Self::Api => "api",
            Self::Snowflake => "snowflake",
        }
    }

    pub fn family(&self) -> SourceFamily {
        match self {
            Self::Mysql | Self::Postgresql | Self::Oracle | Self::Sqlserver | Self::Sqlite => {
                SourceFamily::Relational
            }
            Self::Mongodb => SourceFamily::Document,
            Self::Csv => SourceFamily::FlatFile,
            Self::Api => SourceFamily::HttpApi,
            Self::Snowflake => SourceFamily::Columnar,
        }
    }

    /// Port pre-filled for new connections of this kind.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::Mysql => Some(3306),
            Self::Postgresql => Some(5432),
            Self::Mongodb => Some(27017),
            Self::Oracle => Some(1521),
            Self::Sqlserver => Some(1433),
            Self::Snowflake => Some(443),
            Self::Sqlite | Self::Csv | Self::Api => None,
        }
    }

    /// Whether host, port, username, password and database must all be
    /// present (absent a connection string) before the source can connect.
    pub fn requires_credentials(&self) -> bool {
        matches!(
            self,
            Self::Mysql | Self::Postgresql | Self::Mongodb | Self::Oracle | Self::Sqlserver
        )
    }

    /// Whether the kind talks to a remote host at all.
    pub fn is_networked(&self) -> bool {
        !matches!(self, Self::Sqlite | Self::Csv)
    }

    /// Whether the kind exposes relational schemas that can be introspected.
    pub fn has_relational_schema(&self) -> bool {
        matches!(
            self.family(),
            SourceFamily::Relational | SourceFamily::Columnar
        )
    }

    /// Icon hint used when a source carries none of its own.
    pub fn default_icon(&self) -> &'static str {
        match self {
            Self::Csv => "FileText",
            Self::Api => "TrendingUp",
            Self::Snowflake => "Snowflake",
            _ => "Database",
        }
    }

    /// Human-readable category label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Snowflake => "Data Warehouse",
            Self::Csv => "Flat File",
            Self::Api => "External API",
            Self::Mongodb => "Document Store",
            _ => "Relational Database",
        }
    }
}

impl fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSourceKind {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mysql" => Ok(Self::Mysql),
            "postgresql" | "postgres" => Ok(Self::Postgresql),
            "mongodb" | "mongo" => Ok(Self::Mongodb),
            "oracle" => Ok(Self::Oracle),
            "sqlserver" | "mssql" => Ok(Self::Sqlserver),
            "sqlite" => Ok(Self::Sqlite),
            "csv" => Ok(Self::Csv),
            "api" => Ok(Self::Api),
            "snowflake" => Ok(Self::Snowflake),
            other => Err(ServiceError::validation(format!(
                "unknown data source kind: '{}'",
                other
            ))),
        }
    }
}

/// Connection status of a registered data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Connected,
    Syncing,
    Error,
    Maintenance,
    Disconnected,
}

impl SourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Syncing => "syncing",
            Self::Error => "error",
            Self::Maintenance => "maintenance",
            Self::Disconnected => "disconnected",
        }
    }

    /// Transition table for the source state machine.
    ///
    /// | from | allowed targets |
    /// |------|-----------------|
    /// | any | `maintenance`, `disconnected` (administrative) |
    /// | connected, error, disconnected, syncing | `syncing` (refresh start) |
    /// | syncing | `connected`, `error` (refresh outcome) |
    /// | error, disconnected | `connected` (reconnect) |
    /// | any but maintenance | `error` (failed reconnect) |
    pub fn can_transition(self, to: SourceStatus) -> bool {
        use SourceStatus::*;
        match (self, to) {
            (_, Maintenance) | (_, Disconnected) => true,
            (Maintenance, _) => false,
            (_, Syncing) => true,
            (Syncing, Connected) | (Error, Connected) | (Disconnected, Connected) => true,
            (_, Error) => true,
            (Connected, Connected) => false,
        }
    }

    /// Statuses an operator may set directly.
    pub fn is_administrative(self) -> bool {
        matches!(self, Self::Maintenance | Self::Disconnected)
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "connected" => Ok(Self::Connected),
            "syncing" => Ok(Self::Syncing),
            "error" => Ok(Self::Error),
            "maintenance" => Ok(Self::Maintenance),
            "disconnected" => Ok(Self::Disconnected),
            other => Err(ServiceError::validation(format!(
                "unknown source status: '{}'",
                other
            ))),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Credentials
// ═══════════════════════════════════════════════════════════════════════

const REDACTED: &str = "********";

/// How to reach a backing store.
///
/// `Debug` output and [`redacted`](ConnectionCredentials::redacted) copies
/// never contain the password or API key.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_ssl: Option<bool>,
    /// Connection attempt timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

fn present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl ConnectionCredentials {
    /// Credentials for `host:port` with the usual relational fields set.
    pub fn relational(
        host: &str,
        port: u16,
        database: &str,
        username: &str,
        password: &str,
    ) -> Self {
        Self {
            host: Some(host.to_string()),
            port: Some(port),
            database: Some(database.to_string()),
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            ..Default::default()
        }
    }

    pub fn has_host(&self) -> bool {
        present(&self.host)
    }

    pub fn has_connection_string(&self) -> bool {
        present(&self.connection_string)
    }

    /// Names of the required fields that are missing for `kind`.
    ///
    /// Empty when the kind needs no credentials or a connection string is
    /// supplied.
    pub fn missing_fields(&self, kind: DataSourceKind) -> Vec<&'static str> {
        if !kind.requires_credentials() || self.has_connection_string() {
            return Vec::new();
        }
        let mut missing = Vec::new();
        if !self.has_host() {
            missing.push("host");
        }
        if self.port.is_none() {
            missing.push("port");
        }
        if !present(&self.username) {
            missing.push("username");
        }
        if !present(&self.password) {
            missing.push("password");
        }
        if !present(&self.database) {
            missing.push("database");
        }
        missing
    }

    /// Local, synchronous checks run before any connection attempt.
    pub fn validate_for(&self, kind: DataSourceKind) -> Result<()> {
        if !self.has_host() && !self.has_connection_string() {
            return Err(ServiceError::validation(
                "Host or connection string is required",
            ));
        }
        if self.port == Some(0) {
            return Err(ServiceError::validation("port must be between 1 and 65535"));
        }
        let missing = self.missing_fields(kind);
        if !missing.is_empty() {
            return Err(ServiceError::validation(format!(
                "missing required fields for {}: {}",
                kind,
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// `host:port` label for log lines and messages.
    pub fn endpoint(&self) -> String {
        match (&self.host, self.port) {
            (Some(h), Some(p)) => format!("{}:{}", h, p),
            (Some(h), None) => h.clone(),
            _ if self.has_connection_string() => "<connection string>".to_string(),
            _ => "<none>".to_string(),
        }
    }

    /// A copy safe to hand to callers: secrets replaced by a mask.
    pub fn redacted(&self) -> Self {
        let mask = |v: &Option<String>| v.as_ref().map(|_| REDACTED.to_string());
        Self {
            password: mask(&self.password),
            api_key: mask(&self.api_key),
            connection_string: mask(&self.connection_string),
            ..self.clone()
        }
    }
}

impl fmt::Debug for ConnectionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked = |v: &Option<String>| v.as_ref().map(|_| REDACTED);
        f.debug_struct("ConnectionCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &masked(&self.password))
            .field("connection_string", &masked(&self.connection_string))
            .field("api_key", &masked(&self.api_key))
            .field("use_ssl", &self.use_ssl)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Schemas
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Backend-specific type name (`int`, `varchar`, `timestamp`, ...).
    #[serde(rename = "type")]
    pub type_name: String,
    pub is_primary: bool,
    pub is_foreign: bool,
    pub is_nullable: bool,
}

impl Column {
    pub fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            is_primary: false,
            is_foreign: false,
            is_nullable: false,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn foreign(mut self) -> Self {
        self.is_foreign = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub row_count: u64,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_primary)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub tables: Vec<Table>,
}

impl Schema {
    /// Rejects primary-key columns flagged nullable.
    pub fn validate(&self) -> Result<()> {
        for table in &self.tables {
            if let Some(col) = table.columns.iter().find(|c| c.is_primary && c.is_nullable) {
                return Err(ServiceError::validation(format!(
                    "primary key column {}.{}.{} cannot be nullable",
                    self.name, table.name, col.name
                )));
            }
        }
        Ok(())
    }

    /// Looks a table up by bare (`orders`) or qualified (`public.orders`) name.
    pub fn find_table(&self, name: &str) -> Option<&Table> {
        let bare = match name.split_once('.') {
            Some((schema, table)) if schema.eq_ignore_ascii_case(&self.name) => table,
            Some(_) => return None,
            None => name,
        };
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(bare))
    }
}

/// Placeholder returned by schema export when a source has no recorded
/// structure.
pub fn placeholder_schema() -> Vec<Schema> {
    vec![Schema {
        name: "default".to_string(),
        tables: vec![Table {
            name: "sample_table".to_string(),
            row_count: 1000,
            columns: vec![
                Column::new("id", "int").primary(),
                Column::new("name", "varchar"),
                Column::new("created_at", "timestamp").nullable(),
            ],
        }],
    }]
}

// ═══════════════════════════════════════════════════════════════════════
// Data sources
// ═══════════════════════════════════════════════════════════════════════

/// A registered data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: String,
    pub name: String,
    pub kind: DataSourceKind,
    pub status: SourceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<ConnectionCredentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_count: Option<u64>,
    /// Heuristic quality score, 0–100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schemas: Option<Vec<Schema>>,
}

impl DataSource {
    /// Copy with credential secrets masked.
    pub fn redacted(&self) -> Self {
        Self {
            credentials: self.credentials.as_ref().map(|c| c.redacted()),
            ..self.clone()
        }
    }

    /// Icon hint, falling back to the kind's default.
    pub fn icon_hint(&self) -> &str {
        self.icon.as_deref().unwrap_or_else(|| self.kind.default_icon())
    }

    pub fn find_table(&self, name: &str) -> Option<&Table> {
        self.schemas
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find_map(|s| s.find_table(name))
    }
}

/// Input to registration: everything but the registry-assigned fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDraft {
    pub name: String,
    pub kind: DataSourceKind,
    #[serde(default)]
    pub credentials: Option<ConnectionCredentials>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub schemas: Option<Vec<Schema>>,
}

impl SourceDraft {
    pub fn new(name: &str, kind: DataSourceKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            credentials: None,
            icon: None,
            schemas: None,
        }
    }

    pub fn with_credentials(mut self, credentials: ConnectionCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_schemas(mut self, schemas: Vec<Schema>) -> Self {
        self.schemas = Some(schemas);
        self
    }

    /// Checks run by the registry before a draft is accepted.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::validation("name must not be empty"));
        }
        if self.kind.requires_credentials() {
            let creds = self.credentials.clone().unwrap_or_default();
            creds.validate_for(self.kind)?;
        }
        for schema in self.schemas.iter().flatten() {
            schema.validate()?;
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Operation results
// ═══════════════════════════════════════════════════════════════════════

/// Outcome of a connection test. Advisory: never mutates a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
}

impl ConnectionTestResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Transportable schema document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaExport {
    pub success: bool,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SchemaExport {
    /// Parses `data` back into schema structures.
    pub fn schemas(&self) -> Result<Vec<Schema>> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| ServiceError::internal(format!("malformed schema export: {}", e)))
    }
}

/// A single result cell: heterogeneous scalar or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Tabular result of a direct query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    pub row_count: usize,
    /// Elapsed wall-clock seconds, millisecond resolution.
    pub query_time: f64,
}

impl QueryResult {
    /// Builds a result, rejecting rows whose width differs from the header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>, elapsed: Duration) -> Result<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != columns.len())
        {
            return Err(ServiceError::internal(format!(
                "row {} has {} cells, expected {}",
                i,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self {
            row_count: rows.len(),
            columns,
            rows,
            query_time: round_millis(elapsed),
        })
    }
}

/// Seconds rounded to the nearest millisecond.
pub fn round_millis(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0).round() / 1000.0
}

/// Output of the advisory optimizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizedQuery {
    pub success: bool,
    pub optimized_query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvement_notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub severity: Severity,
    pub issue: String,
    pub recommendation: String,
}

/// Quality analysis; issues appear in detection order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    pub quality_score: u8,
    pub summary: String,
    pub issues: Vec<QualityIssue>,
}

// ═══════════════════════════════════════════════════════════════════════
// Natural-language results
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCitation {
    pub name: String,
    /// 0–100.
    pub confidence: u8,
}

/// Answer in the structured shape: text, citations, insights, metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredAnswer {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<SourceCitation>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, Value>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Upstream JSON passed through with a derived summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAnalysis {
    pub raw_json: Value,
    pub natural_language: String,
}

/// Result of a natural-language query.
///
/// The two shapes are rendered differently; match on the variant rather
/// than probing fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NlResult {
    Structured(StructuredAnswer),
    Raw(RawAnalysis),
}

impl NlResult {
    /// Text rendered by default.
    pub fn natural_language(&self) -> &str {
        match self {
            Self::Structured(s) => &s.answer,
            Self::Raw(r) => &r.natural_language,
        }
    }

    /// JSON rendered on demand.
    pub fn raw_json(&self) -> Value {
        match self {
            Self::Structured(s) => serde_json::to_value(s).unwrap_or(Value::Null),
            Self::Raw(r) => r.raw_json.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Insights and dashboard
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub date: DateTime<Utc>,
    pub sources: Vec<SourceCitation>,
}

/// Headline numbers computed from the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_records: u64,
    pub active_sources: usize,
    pub total_sources: usize,
    /// Mean of the recorded quality scores, `None` when no source has one.
    pub average_quality: Option<f64>,
    pub last_sync: Option<DateTime<Utc>>,
    pub insights: Vec<Insight>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing_accepts_aliases() {
        assert_eq!(
            "Postgres".parse::<DataSourceKind>().unwrap(),
            DataSourceKind::Postgresql
        );
        assert_eq!(
            "mssql".parse::<DataSourceKind>().unwrap(),
            DataSourceKind::Sqlserver
        );
        let err = "excel".parse::<DataSourceKind>().unwrap_err();
        assert_eq!(err.code(), "validation");
    }

    #[test]
    fn test_kind_defaults() {
        assert_eq!(DataSourceKind::Postgresql.default_port(), Some(5432));
        assert_eq!(DataSourceKind::Oracle.default_port(), Some(1521));
        assert_eq!(DataSourceKind::Csv.default_port(), None);
        assert!(DataSourceKind::Mongodb.requires_credentials());
        assert!(!DataSourceKind::Api.requires_credentials());
        assert_eq!(DataSourceKind::Csv.default_icon(), "FileText");
        assert_eq!(DataSourceKind::Snowflake.label(), "Data Warehouse");
    }

    #[test]
    fn test_kind_serde_names() {
        let json = serde_json::to_string(&DataSourceKind::Sqlserver).unwrap();
        assert_eq!(json, "\"sqlserver\"");
        for kind in DataSourceKind::ALL {
            assert_eq!(kind.as_str().parse::<DataSourceKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_status_transitions() {
        use SourceStatus::*;
        assert!(Connected.can_transition(Syncing));
        assert!(Syncing.can_transition(Connected));
        assert!(Syncing.can_transition(Error));
        assert!(Error.can_transition(Syncing));
        assert!(Error.can_transition(Connected));
        assert!(Connected.can_transition(Maintenance));
        assert!(Maintenance.can_transition(Disconnected));
        assert!(!Maintenance.can_transition(Connected));
        assert!(!Maintenance.can_transition(Syncing));
        assert!(!Connected.can_transition(Connected));
        assert!(Maintenance.is_administrative());
        assert!(!Error.is_administrative());
    }

    #[test]
    fn test_credentials_require_host_or_connection_string() {
        let creds = ConnectionCredentials::default();
        let err = creds.validate_for(DataSourceKind::Api).unwrap_err();
        assert_eq!(
            err,
            ServiceError::validation("Host or connection string is required")
        );

        let creds = ConnectionCredentials {
            connection_string: Some("postgres://u:p@db/app".into()),
            ..Default::default()
        };
        assert!(creds.validate_for(DataSourceKind::Postgresql).is_ok());
    }

    #[test]
    fn test_credentials_missing_fields_listed() {
        let creds = ConnectionCredentials {
            host: Some("db.local".into()),
            username: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(
            creds.missing_fields(DataSourceKind::Mysql),
            vec!["port", "username", "password", "database"]
        );
        let err = creds.validate_for(DataSourceKind::Mysql).unwrap_err();
        assert!(err.to_string().contains("port, username, password, database"));
        assert!(creds.missing_fields(DataSourceKind::Api).is_empty());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = ConnectionCredentials::relational("h", 5432, "db", "admin", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("admin"));
        let redacted = creds.redacted();
        assert_eq!(redacted.password.as_deref(), Some(REDACTED));
        assert_eq!(redacted.username.as_deref(), Some("admin"));
    }

    #[test]
    fn test_schema_rejects_nullable_primary_key() {
        let schema = Schema {
            name: "public".into(),
            tables: vec![Table {
                name: "t".into(),
                row_count: 0,
                columns: vec![Column::new("id", "int").primary().nullable()],
            }],
        };
        let err = schema.validate().unwrap_err();
        assert!(err.to_string().contains("public.t.id"));
        assert!(placeholder_schema()[0].validate().is_ok());
    }

    #[test]
    fn test_find_table_qualified_and_bare() {
        let schema = placeholder_schema().remove(0);
        assert!(schema.find_table("sample_table").is_some());
        assert!(schema.find_table("DEFAULT.SAMPLE_TABLE").is_some());
        assert!(schema.find_table("other.sample_table").is_none());
    }

    #[test]
    fn test_draft_requires_name() {
        let draft = SourceDraft::new("   ", DataSourceKind::Csv);
        assert_eq!(draft.validate().unwrap_err().code(), "validation");
        assert!(SourceDraft::new("sales.csv", DataSourceKind::Csv)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_query_result_rejects_ragged_rows() {
        let cols = vec!["a".to_string(), "b".to_string()];
        let rows = vec![vec![CellValue::Int(1), CellValue::Null], vec![CellValue::Int(2)]];
        let err = QueryResult::new(cols, rows, Duration::ZERO).unwrap_err();
        assert_eq!(err.code(), "internal");
    }

    #[test]
    fn test_query_time_rounds_to_millis() {
        let r = QueryResult::new(vec![], vec![], Duration::from_micros(123_456)).unwrap();
        assert!((r.query_time - 0.123).abs() < 1e-9);
        assert_eq!(r.row_count, 0);
    }

    #[test]
    fn test_cell_values_serialize_as_scalars() {
        let row = vec![
            CellValue::Int(1),
            CellValue::from("A"),
            CellValue::Float(1.5),
            CellValue::Null,
            CellValue::Bool(true),
        ];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[1,"A",1.5,null,true]"#);
        let back: Vec<CellValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_nl_result_is_tagged() {
        let raw = NlResult::Raw(RawAnalysis {
            raw_json: serde_json::json!({"Final_Answer": "hi"}),
            natural_language: "hi".into(),
        });
        let json = serde_json::to_value(&raw).unwrap();
        assert_eq!(json["kind"], "raw");
        assert_eq!(raw.natural_language(), "hi");
        assert_eq!(raw.raw_json()["Final_Answer"], "hi");
    }
}
