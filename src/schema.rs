//! Schema introspection and export.

use std::sync::Arc;

use datasynergy_core::models::{placeholder_schema, Schema, SchemaExport};
use datasynergy_core::{Result, ServiceError};

use crate::registry::SourceRegistry;

pub struct SchemaIntrospector {
    registry: Arc<SourceRegistry>,
}

impl SchemaIntrospector {
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self { registry }
    }

    /// Recorded schemas; empty when none are recorded.
    pub async fn get_schemas(&self, id: &str) -> Result<Vec<Schema>> {
        let source = self.registry.get(id).await?;
        Ok(source.schemas.clone().unwrap_or_default())
    }

    /// Transportable JSON document of the recorded schemas, or of the
    /// placeholder schema when none are recorded.
    pub async fn export_schema(&self, id: &str) -> Result<SchemaExport> {
        let schemas = self.get_schemas(id).await?;
        let (schemas, message) = if schemas.is_empty() {
            (placeholder_schema(), Some("Default schema exported".to_string()))
        } else {
            (schemas, None)
        };
        let data = serde_json::to_value(&schemas).map_err(|e| {
            tracing::error!(id, error = %e, "schema export failed");
            ServiceError::internal(format!("schema serialization failed: {}", e))
        })?;
        Ok(SchemaExport {
            success: true,
            data,
            message,
        })
    }
}
