//! Quality analysis over registered sources.
//!
//! Scoring itself lives in [`datasynergy_core::quality`]; this layer only
//! resolves the source and supplies the clock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use datasynergy_core::models::QualityReport;
use datasynergy_core::quality::analyze_source;
use datasynergy_core::Result;

use crate::registry::SourceRegistry;

pub struct QualityAnalyzer {
    registry: Arc<SourceRegistry>,
}

impl QualityAnalyzer {
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self { registry }
    }

    pub async fn analyze(&self, id: &str) -> Result<QualityReport> {
        self.analyze_as_of(id, Utc::now()).await
    }

    /// Analysis pinned to `as_of`, for reproducible reports.
    pub async fn analyze_as_of(&self, id: &str, as_of: DateTime<Utc>) -> Result<QualityReport> {
        let source = self.registry.get(id).await?;
        let report = analyze_source(&source, as_of);
        tracing::debug!(
            id,
            score = report.quality_score,
            issues = report.issues.len(),
            "quality analyzed"
        );
        Ok(report)
    }
}
