//! Connection tester.
//!
//! Checks credentials locally first and only then makes exactly one
//! connection attempt through the [`Backend`], bounded by a timeout.
//! The result is advisory: no data source is touched.

use std::sync::Arc;
use std::time::Duration;

use datasynergy_core::models::{ConnectionCredentials, ConnectionTestResult, DataSourceKind};
use datasynergy_core::{ConnectionFailure, ServiceError};
use tracing::{debug, info};

use crate::backend::Backend;

#[derive(Clone)]
pub struct ConnectionTester {
    backend: Arc<dyn Backend>,
    default_timeout: Duration,
}

fn describe(bound: Duration) -> String {
    if bound.subsec_millis() == 0 {
        format!("{}s", bound.as_secs())
    } else {
        format!("{}ms", bound.as_millis())
    }
}

impl ConnectionTester {
    /// `default_timeout` applies when the credentials carry no timeout.
    pub fn new(backend: Arc<dyn Backend>, default_timeout: Duration) -> Self {
        Self {
            backend,
            default_timeout,
        }
    }

    fn bound_for(&self, credentials: &ConnectionCredentials) -> Duration {
        credentials
            .timeout
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout)
    }

    pub async fn test(
        &self,
        credentials: &ConnectionCredentials,
        kind: DataSourceKind,
    ) -> ConnectionTestResult {
        if let Err(e) = credentials.validate_for(kind) {
            debug!(kind = %kind, reason = e.detail(), "connection test rejected locally");
            return ConnectionTestResult::failed(e.detail());
        }

        let bound = self.bound_for(credentials);
        let attempt = tokio::time::timeout(bound, self.backend.connect(kind, credentials)).await;

        let result = match attempt {
            Ok(Ok(())) => ConnectionTestResult::ok("Connection successful"),
            Ok(Err(ServiceError::Connection {
                failure: ConnectionFailure::Unreachable,
                ..
            })) => ConnectionTestResult::failed(format!(
                "Failed to connect: host unreachable ({})",
                credentials.endpoint()
            )),
            Ok(Err(ServiceError::Connection {
                failure: ConnectionFailure::AuthenticationRejected,
                ..
            })) => ConnectionTestResult::failed("Failed to connect: Authentication failed"),
            Ok(Err(e)) => {
                ConnectionTestResult::failed(format!("Failed to connect: {}", e.detail()))
            }
            Err(_) => ConnectionTestResult::failed(format!(
                "Failed to connect: connection attempt timed out after {}",
                describe(bound)
            )),
        };

        info!(
            kind = %kind,
            endpoint = %credentials.endpoint(),
            success = result.success,
            "connection test finished"
        );
        result
    }
}
