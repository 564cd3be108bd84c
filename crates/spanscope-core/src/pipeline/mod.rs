//! End-to-end query pipeline
//!
//! Build, execute, normalize. Parameters are validated before anything is
//! sent, and several intents can share one time window and run concurrently.

mod normalizer;

pub use normalizer::{normalize, normalize_row};

use std::collections::HashSet;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, instrument};

use crate::backend::{QueryBackend, QueryExecutor};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{QueryIntent, QueryResult, TimeWindow};
use crate::query::QueryBuilder;

/// Runs intents against a backend
pub struct Pipeline<B> {
    builder: QueryBuilder,
    executor: QueryExecutor<B>,
}

impl<B: QueryBackend> Pipeline<B> {
    /// Create a pipeline with configured limits and timeout
    pub fn new(config: &Config, backend: B) -> Self {
        Self::from_parts(
            QueryBuilder::new(&config.query),
            QueryExecutor::new(backend, config.backend.timeout),
        )
    }

    /// Assemble a pipeline from an existing builder and executor
    pub fn from_parts(builder: QueryBuilder, executor: QueryExecutor<B>) -> Self {
        Self { builder, executor }
    }

    /// Get the query builder
    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    /// Get the underlying backend
    pub fn backend(&self) -> &B {
        self.executor.backend()
    }

    /// Run one intent over `window`
    #[instrument(skip(self, window), fields(pattern = intent.pattern()))]
    pub async fn run(&self, intent: QueryIntent, window: &TimeWindow) -> Result<QueryResult> {
        let query = self.builder.build(&intent, window)?;
        let rows = self.executor.execute(&query, window).await?;
        let rows = normalize(&intent, rows);
        Ok(QueryResult::new(intent, rows))
    }

    /// Run several intents over one shared window.
    ///
    /// Every intent is validated before the first query is sent. Queries for
    /// distinct patterns run concurrently; results keep the input order and
    /// the first failure aborts the batch.
    pub async fn run_all(
        &self,
        intents: Vec<QueryIntent>,
        window: &TimeWindow,
    ) -> Result<Vec<QueryResult>> {
        let queries = intents
            .iter()
            .map(|intent| self.builder.build(intent, window))
            .collect::<Result<Vec<_>>>()?;

        let concurrency = intents
            .iter()
            .map(QueryIntent::pattern)
            .collect::<HashSet<_>>()
            .len()
            .max(1);
        debug!(queries = queries.len(), concurrency, "Running query batch");

        let executor = &self.executor;
        stream::iter(intents.into_iter().zip(queries))
            .map(|(intent, query)| async move {
                let rows = executor.execute(&query, window).await?;
                let rows = normalize(&intent, rows);
                Ok::<_, Error>(QueryResult::new(intent, rows))
            })
            .buffered(concurrency)
            .try_collect()
            .await
    }

    /// UI link for every record of a trace
    pub async fn trace_link(&self, trace_id: &str) -> Result<String> {
        self.executor
            .trace_link(self.builder.filter(), trace_id)
            .await
    }
}
