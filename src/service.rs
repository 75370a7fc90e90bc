//! The `DataService` façade.
//!
//! One value wiring the registry, tester, introspector, executor,
//! analyzer and NL bridge together. The CLI and the HTTP server both talk
//! to it; tests build it with [`DataService::builder`] and inject their
//! own store and backend.
//!
//! Every operation returns [`datasynergy_core::Result`] and nothing panics
//! across this boundary.

use std::sync::Arc;
use std::time::Duration;

use datasynergy_core::models::{
    ConnectionCredentials, ConnectionTestResult, DashboardSummary, DataSource, DataSourceKind,
    Insight, OptimizedQuery, QualityReport, QueryResult, Schema, SchemaExport, SourceDraft,
    SourceStatus,
};
use datasynergy_core::store::{InMemoryStore, SourceStore};
use datasynergy_core::Result;

use crate::backend::Backend;
use crate::config::Config;
use crate::insights::{dashboard_summary, sort_feed};
use crate::nl::{NlAnswer, NlBridge};
use crate::quality::QualityAnalyzer;
use crate::query::{sample_queries, QueryExecutor};
use crate::registry::{RefreshSummary, SourceRegistry};
use crate::schema::SchemaIntrospector;
use crate::seed::{demo_insights, demo_sources};
use crate::simulated::SimulatedBackend;
use crate::tester::ConnectionTester;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DataService {
    registry: Arc<SourceRegistry>,
    schema: SchemaIntrospector,
    query: QueryExecutor,
    quality: QualityAnalyzer,
    nl: NlBridge,
    insights: Vec<Insight>,
}

/// Builder for [`DataService`]. Unset parts default to an empty in-memory
/// store, a latency-free simulated backend and a local-only NL bridge.
#[derive(Default)]
pub struct DataServiceBuilder {
    store: Option<Arc<dyn SourceStore>>,
    backend: Option<Arc<dyn Backend>>,
    nl: Option<NlBridge>,
    connect_timeout: Option<Duration>,
    insights: Vec<Insight>,
}

impl DataServiceBuilder {
    pub fn store(mut self, store: Arc<dyn SourceStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn nl_bridge(mut self, nl: NlBridge) -> Self {
        self.nl = Some(nl);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn insights(mut self, insights: Vec<Insight>) -> Self {
        self.insights = insights;
        self
    }

    pub fn build(self) -> DataService {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryStore::new()));
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(SimulatedBackend::new()));
        let tester = ConnectionTester::new(
            backend.clone(),
            self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
        );
        let registry = Arc::new(SourceRegistry::new(store, backend, tester));

        let mut insights = self.insights;
        sort_feed(&mut insights);

        DataService {
            schema: SchemaIntrospector::new(registry.clone()),
            query: QueryExecutor::new(registry.clone()),
            quality: QualityAnalyzer::new(registry.clone()),
            registry,
            nl: self.nl.unwrap_or_else(NlBridge::local_only),
            insights,
        }
    }
}

impl DataService {
    pub fn builder() -> DataServiceBuilder {
        DataServiceBuilder::default()
    }

    /// Wires the service described by `config`: simulated backend with the
    /// configured latency and failures, the demo data when enabled, and
    /// the AI backend when enabled and its credentials are present.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let sim = &config.simulation;
        let (store, insights) = if sim.seed_demo_data {
            (InMemoryStore::with_sources(demo_sources()), demo_insights())
        } else {
            (InMemoryStore::new(), Vec::new())
        };
        let nl = NlBridge::from_config(config)?;
        if nl.has_ai_backend() {
            tracing::info!("AI backend configured");
        }

        Ok(Self::builder()
            .store(Arc::new(store))
            .backend(Arc::new(SimulatedBackend::from_config(sim)))
            .connect_timeout(Duration::from_secs(sim.connect_timeout_secs))
            .nl_bridge(nl)
            .insights(insights)
            .build())
    }

    // ============ Registry ============

    pub async fn list_sources(&self) -> Result<Vec<Arc<DataSource>>> {
        self.registry.list().await
    }

    pub async fn get_source(&self, id: &str) -> Result<Arc<DataSource>> {
        self.registry.get(id).await
    }

    pub async fn add_source(&self, draft: SourceDraft) -> Result<Arc<DataSource>> {
        self.registry.add(draft).await
    }

    pub async fn refresh_all(&self) -> Result<RefreshSummary> {
        self.registry.refresh_all().await
    }

    pub async fn set_status(
        &self,
        id: &str,
        status: SourceStatus,
        message: Option<String>,
    ) -> Result<Arc<DataSource>> {
        self.registry.set_status(id, status, message).await
    }

    pub async fn reconnect(&self, id: &str) -> Result<ConnectionTestResult> {
        self.registry.reconnect(id).await
    }

    // ============ Connections & schemas ============

    pub async fn test_connection(
        &self,
        credentials: &ConnectionCredentials,
        kind: DataSourceKind,
    ) -> ConnectionTestResult {
        self.registry.tester().test(credentials, kind).await
    }

    pub async fn get_schemas(&self, id: &str) -> Result<Vec<Schema>> {
        self.schema.get_schemas(id).await
    }

    pub async fn export_schema(&self, id: &str) -> Result<SchemaExport> {
        self.schema.export_schema(id).await
    }

    // ============ Queries ============

    pub async fn execute_query(&self, id: &str, query: &str) -> Result<QueryResult> {
        self.query.execute(id, query).await
    }

    pub async fn optimize_query(&self, query: &str, source_id: Option<&str>) -> OptimizedQuery {
        self.query.optimize(query, source_id).await
    }

    pub fn sample_queries(&self, kind: DataSourceKind) -> Vec<&'static str> {
        sample_queries(kind)
    }

    pub async fn analyze_quality(&self, id: &str) -> Result<QualityReport> {
        self.quality.analyze(id).await
    }

    pub async fn ask(&self, query: &str) -> Result<NlAnswer> {
        self.nl.ask(query).await
    }

    pub fn has_ai_backend(&self) -> bool {
        self.nl.has_ai_backend()
    }

    // ============ Insights ============

    /// Insight feed, newest first.
    pub fn insights(&self) -> &[Insight] {
        &self.insights
    }

    pub async fn dashboard(&self) -> Result<DashboardSummary> {
        let sources = self.registry.list().await?;
        Ok(dashboard_summary(&sources, &self.insights))
    }
}
