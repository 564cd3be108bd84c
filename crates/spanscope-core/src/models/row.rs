//! Raw backend records and their normalized per-pattern shapes

use serde::Serialize;

/// A row as returned by the backend: field name to loosely typed value
pub type Record = serde_json::Map<String, serde_json::Value>;

/// One entry of the recent activity feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRow {
    /// Start timestamp as reported by the backend
    pub start_timestamp: String,
    /// Span name, falling back to the message, then `"unknown"`
    pub span_name: String,
    /// Message
    pub message: String,
    /// Trace ID
    pub trace_id: String,
    /// Whether the record is an exception
    pub is_exception: bool,
}

/// A record matching a text search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMatchRow {
    /// Start timestamp
    pub start_timestamp: String,
    /// Span name, empty when the record has none
    pub span_name: String,
    /// Full message text
    pub message: String,
    /// Trace ID
    pub trace_id: String,
    /// Whether the record is an exception
    pub is_exception: bool,
}

/// A request slower than the threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlowRequestRow {
    /// Start timestamp
    pub start_timestamp: String,
    /// Span name
    pub span_name: String,
    /// Duration in milliseconds
    pub duration_ms: f64,
    /// Trace ID
    pub trace_id: String,
}

/// An exception record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExceptionRow {
    /// Start timestamp
    pub start_timestamp: String,
    /// Span name
    pub span_name: String,
    /// Message
    pub message: String,
    /// Trace ID
    pub trace_id: String,
    /// Exception type
    pub exception_type: String,
    /// Exception message
    pub exception_message: String,
}

/// Aggregated statistics for one endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointRow {
    /// Span name the statistics are grouped by
    pub span_name: String,
    /// Number of records
    pub count: i64,
    /// Number of exception records
    pub errors: i64,
    /// `errors / count * 100`, or 0 when there are no records
    pub error_rate: f64,
    /// Average duration in milliseconds
    pub avg_ms: f64,
    /// Maximum duration in milliseconds
    pub max_ms: f64,
}

impl EndpointRow {
    /// Percentage of records that are exceptions
    pub fn compute_error_rate(count: i64, errors: i64) -> f64 {
        if count > 0 {
            errors as f64 / count as f64 * 100.0
        } else {
            0.0
        }
    }
}

/// One span of a reconstructed trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceSpanRow {
    /// Start timestamp
    pub start_timestamp: String,
    /// Span name, falling back to the message, then `"unknown"`
    pub span_name: String,
    /// Span ID
    pub span_id: String,
    /// Message
    pub message: String,
    /// Duration in milliseconds, when the record has one
    pub duration_ms: Option<f64>,
    /// Whether the record is an exception
    pub is_exception: bool,
    /// Attributes, when present and non-empty
    pub attributes: Option<serde_json::Value>,
}

/// Canonical row shape, one variant per pattern
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedRow {
    /// Recent activity
    Activity(ActivityRow),
    /// Text search match
    Match(SearchMatchRow),
    /// Slow request
    Slow(SlowRequestRow),
    /// Exception
    Exception(ExceptionRow),
    /// Endpoint statistics
    Endpoint(EndpointRow),
    /// Trace span
    Span(TraceSpanRow),
    /// Ad-hoc query row, kept as returned
    Raw(Record),
}
