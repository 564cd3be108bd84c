//! Query execution against the telemetry backend
//!
//! [`QueryBackend`] is the seam to the network; [`QueryExecutor`] is the only
//! caller of it.

mod logfire;

pub use logfire::{region_base_url, LogfireClient};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{Record, TimeWindow};
use crate::query::{FilterValue, QueryText};

/// Organization and project a read token belongs to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenInfo {
    /// Organization name
    pub organization_name: String,
    /// Project name
    pub project_name: String,
}

/// A queryable telemetry store
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Run `sql` with `min_timestamp` as an out-of-band lower time bound
    async fn query_rows(&self, sql: &str, min_timestamp: DateTime<Utc>) -> Result<Vec<Record>>;

    /// Describe the organization and project behind the credential
    async fn token_info(&self) -> Result<TokenInfo>;

    /// Base URL of the backend's web UI
    fn base_url(&self) -> &str;
}

/// Executes built queries; never retries
pub struct QueryExecutor<B> {
    backend: B,
    timeout: Duration,
}

impl<B: QueryBackend> QueryExecutor<B> {
    /// Create an executor with a per-query timeout
    pub fn new(backend: B, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Get the underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Send a query with the window's lower bound and return the raw rows.
    ///
    /// Zero rows is a successful, empty result.
    pub async fn execute(&self, query: &QueryText, window: &TimeWindow) -> Result<Vec<Record>> {
        let started = Instant::now();
        debug!(
            min_timestamp = %window.min_timestamp(),
            sql = %query,
            "Executing query"
        );

        let rows = tokio::time::timeout(
            self.timeout,
            self.backend.query_rows(query.as_str(), window.min_timestamp()),
        )
        .await
        .map_err(|_| {
            Error::transport(format!(
                "query timed out after {}",
                humantime::format_duration(self.timeout)
            ))
        })??;

        info!(
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query completed"
        );
        Ok(rows)
    }

    /// UI link showing every record of a trace
    pub async fn trace_link(&self, filter: &FilterValue, trace_id: &str) -> Result<String> {
        let trace_id = filter.identifier("trace_id", trace_id)?;

        let info = tokio::time::timeout(self.timeout, self.backend.token_info())
            .await
            .map_err(|_| Error::transport("token info request timed out"))??;

        Ok(format!(
            "{}/{}/{}?q=trace_id={}",
            self.backend.base_url().trim_end_matches('/'),
            info.organization_name,
            info.project_name,
            trace_id
        ))
    }
}
