//! Direct query execution, advisory optimization and canned sample queries.

use std::sync::Arc;
use std::time::Instant;

use datasynergy_core::models::{DataSourceKind, OptimizedQuery, QueryResult};
use datasynergy_core::optimize::optimize_query;
use datasynergy_core::{Result, ServiceError};
use tracing::{debug, error};

use crate::registry::SourceRegistry;

pub struct QueryExecutor {
    registry: Arc<SourceRegistry>,
}

impl QueryExecutor {
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self { registry }
    }

    /// Runs `query` against source `id` and times the backend call.
    ///
    /// Unknown ids fail with `NotFound` and blank text with `InvalidQuery`,
    /// both before the backend is called.
    pub async fn execute(&self, id: &str, query: &str) -> Result<QueryResult> {
        let source = self.registry.get(id).await?;
        if query.trim().is_empty() {
            return Err(ServiceError::InvalidQuery(
                "query must not be empty".to_string(),
            ));
        }

        let started = Instant::now();
        let rows = self.registry.backend().run_query(&source, query).await?;
        let elapsed = started.elapsed();

        let result = QueryResult::new(rows.columns, rows.rows, elapsed).inspect_err(|e| {
            error!(id, error = %e, "backend returned a malformed result set");
        })?;
        debug!(id, rows = result.row_count, secs = result.query_time, "query executed");
        Ok(result)
    }

    /// Advisory rewrite of `query`. An unknown or absent source id means
    /// the schema is unknown; it is never an error.
    pub async fn optimize(&self, query: &str, source_id: Option<&str>) -> OptimizedQuery {
        let source = match source_id {
            Some(id) => self.registry.find(id).await.ok().flatten(),
            None => None,
        };
        optimize_query(query, source.as_deref())
    }
}

/// Example queries offered for a kind; empty for kinds without any.
pub fn sample_queries(kind: DataSourceKind) -> Vec<&'static str> {
    match kind {
        DataSourceKind::Mysql => vec![
            "SELECT * FROM users LIMIT 10;",
            "SELECT COUNT(*) FROM orders;",
            "SELECT product_id, SUM(total_amount) FROM orders GROUP BY product_id;",
        ],
        DataSourceKind::Postgresql => vec![
            "SELECT * FROM customers LIMIT 10;",
            "SELECT COUNT(*) FROM sales;",
            "SELECT product_id, AVG(price) FROM products GROUP BY product_id;",
        ],
        DataSourceKind::Mongodb => vec![
            "db.customers.find().limit(10)",
            "db.sales.countDocuments()",
            "db.products.aggregate([{$group: {_id: '$product_id', avgPrice: {$avg: '$price'}}}])",
        ],
        _ => Vec::new(),
    }
}
