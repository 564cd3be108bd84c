//! Query construction for the supported analytical patterns.
//!
//! Every synthesized query targets the `records` table, carries the window's
//! lower time bound in its `WHERE` clause and interpolates caller input only
//! through [`FilterValue`].

use chrono::SecondsFormat;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::QueryConfig;
use crate::error::{Error, Result};
use crate::models::{QueryIntent, TimeWindow};

use super::filter::{FilterValue, SafeFragment};

const TABLE: &str = "records";
const ERROR_COUNT: &str = "SUM(CASE WHEN is_exception THEN 1 ELSE 0 END)";

/// Final query text, ready to send alongside the window's time bound
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryText(String);

impl QueryText {
    /// The SQL text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueryText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds query text from intents
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    filter: FilterValue,
    max_limit: u32,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(&QueryConfig::default())
    }
}

impl QueryBuilder {
    /// Create a builder with the configured limits
    pub fn new(config: &QueryConfig) -> Self {
        Self {
            filter: FilterValue::new(config.max_filter_len),
            max_limit: config.max_limit,
        }
    }

    /// The filter validator used for interpolated values
    pub fn filter(&self) -> &FilterValue {
        &self.filter
    }

    /// Build the query text for an intent.
    ///
    /// All parameters are validated before any text is produced.
    pub fn build(&self, intent: &QueryIntent, window: &TimeWindow) -> Result<QueryText> {
        let limit = self.resolve_limit(intent)?;

        let sql = match intent {
            QueryIntent::RawSql { sql } => {
                if sql.trim().is_empty() {
                    return Err(Error::invalid_parameter("sql", "must not be empty"));
                }
                sql.clone()
            }

            QueryIntent::RecentActivity { .. } => Select::new(
                window,
                "start_timestamp, span_name, message, trace_id, is_exception",
            )
            .order_by("start_timestamp DESC")
            .limit(limit)
            .render(),

            QueryIntent::TextSearch { term, field, .. } => {
                let term = self.filter.contains("query", term)?;
                Select::new(
                    window,
                    "start_timestamp, span_name, message, trace_id, is_exception",
                )
                .filter(like(field.column(), "ILIKE", &term))
                .order_by("start_timestamp DESC")
                .limit(limit)
                .render()
            }

            QueryIntent::SlowRequests {
                min_duration_ms,
                endpoint,
                ..
            } => {
                let endpoint = endpoint
                    .as_deref()
                    .map(|e| self.filter.contains("endpoint", e))
                    .transpose()?;

                let mut select = Select::new(
                    window,
                    "start_timestamp, span_name, duration * 1000 AS duration_ms, trace_id",
                )
                .filter(format!("duration > {}", millis_as_seconds(*min_duration_ms)));
                if let Some(endpoint) = endpoint {
                    select = select.filter(like("span_name", "ILIKE", &endpoint));
                }
                select.order_by("duration DESC").limit(limit).render()
            }

            QueryIntent::Exceptions { file, .. } => {
                let file = file
                    .as_deref()
                    .map(|f| self.filter.contains("file", f))
                    .transpose()?;

                let mut select = Select::new(
                    window,
                    "start_timestamp, span_name, message, trace_id, exception_type, exception_message",
                )
                .filter("is_exception = true");
                if let Some(file) = file {
                    select = select.filter(like("exception_stacktrace", "LIKE", &file));
                }
                select
                    .order_by("start_timestamp DESC")
                    .limit(limit)
                    .render()
            }

            QueryIntent::EndpointStats { errors_only, .. } => {
                let columns = format!(
                    "span_name, COUNT(*) AS count, {ERROR_COUNT} AS errors, \
                     AVG(duration * 1000) AS avg_ms, MAX(duration * 1000) AS max_ms"
                );
                let mut select = Select::new(window, &columns)
                    .filter("span_name IS NOT NULL")
                    .group_by("span_name");
                if *errors_only {
                    select = select.having(format!("{ERROR_COUNT} > 0"));
                }
                select.order_by("count DESC").limit(limit).render()
            }

            QueryIntent::TraceLookup { trace_id, span_id } => {
                let trace_id = self.filter.identifier("trace_id", trace_id)?;
                let span_id = span_id
                    .as_deref()
                    .map(|s| self.filter.identifier("span_id", s))
                    .transpose()?;

                let mut select = Select::new(
                    window,
                    "start_timestamp, span_name, span_id, message, duration, is_exception, attributes",
                )
                .filter(format!("trace_id = {trace_id}"));
                if let Some(span_id) = span_id {
                    select = select.filter(format!("span_id = {span_id}"));
                }
                select.order_by("start_timestamp ASC").render()
            }
        };

        debug!(pattern = intent.pattern(), limit = ?limit, "Built query");
        Ok(QueryText(sql))
    }

    fn resolve_limit(&self, intent: &QueryIntent) -> Result<Option<u32>> {
        let Some(default) = intent.default_limit() else {
            return Ok(None);
        };

        match intent.requested_limit() {
            None => Ok(Some(default.min(self.max_limit))),
            Some(0) => Err(Error::invalid_parameter("limit", "must be a positive integer")),
            Some(limit) if limit > self.max_limit => {
                warn!(
                    requested = limit,
                    max = self.max_limit,
                    "Limit exceeds the maximum, clamping"
                );
                Ok(Some(self.max_limit))
            }
            Some(limit) => Ok(Some(limit)),
        }
    }
}

/// Render a pattern predicate, adding the escape clause LIKE patterns need
fn like(column: &str, op: &str, fragment: &SafeFragment) -> String {
    if fragment.is_pattern() {
        format!("{column} {op} {fragment} ESCAPE '\\'")
    } else {
        format!("{column} {op} {fragment}")
    }
}

/// `1500` -> `1.500`, exact for every millisecond value
fn millis_as_seconds(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

/// A single-table SELECT assembled from clauses
struct Select {
    columns: String,
    conditions: Vec<String>,
    group_by: Option<&'static str>,
    having: Option<String>,
    order_by: Option<&'static str>,
    limit: Option<u32>,
}

impl Select {
    fn new(window: &TimeWindow, columns: &str) -> Self {
        let bound = window
            .min_timestamp()
            .to_rfc3339_opts(SecondsFormat::Micros, true);

        Self {
            columns: columns.to_string(),
            conditions: vec![format!("start_timestamp >= '{bound}'")],
            group_by: None,
            having: None,
            order_by: None,
            limit: None,
        }
    }

    fn filter(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    fn group_by(mut self, column: &'static str) -> Self {
        self.group_by = Some(column);
        self
    }

    fn having(mut self, condition: String) -> Self {
        self.having = Some(condition);
        self
    }

    fn order_by(mut self, order: &'static str) -> Self {
        self.order_by = Some(order);
        self
    }

    fn limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }

    fn render(self) -> String {
        let mut sql = format!(
            "SELECT {}\nFROM {TABLE}\nWHERE {}",
            self.columns,
            self.conditions.join(" AND ")
        );

        if let Some(group_by) = self.group_by {
            sql.push_str(&format!("\nGROUP BY {group_by}"));
        }
        if let Some(having) = self.having {
            sql.push_str(&format!("\nHAVING {having}"));
        }
        if let Some(order_by) = self.order_by {
            sql.push_str(&format!("\nORDER BY {order_by}"));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!("\nLIMIT {limit}"));
        }

        sql
    }
}
