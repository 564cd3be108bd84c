//! Rendering of query results for terminals and machines
//!
//! Truncation, glyphs and timestamp trimming happen only here, and only in
//! text mode.

mod format;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::models::{NormalizedRow, QueryIntent, QueryResult, Record, TimeWindow};

use format::{
    attributes_block, endpoint_errors, marker, prefix, truncate, EXCEPTION_WIDTH, MESSAGE_WIDTH,
    TIMESTAMP_WIDTH, TRACE_ID_WIDTH, TRACE_TIMESTAMP_WIDTH,
};

/// Output mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Human-readable blocks
    #[default]
    Text,
    /// The normalized rows as a JSON array
    Json,
}

/// Renders [`QueryResult`]s
#[derive(Debug, Clone, Default)]
pub struct Presenter {
    full: bool,
    window: Option<String>,
}

impl Presenter {
    /// Create a presenter with display truncation enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Show full text instead of truncated text
    pub fn full(mut self, full: bool) -> Self {
        self.full = full;
        self
    }

    /// Mention the lookback window in headers
    pub fn window(mut self, window: &TimeWindow) -> Self {
        self.window = Some(window.describe());
        self
    }

    /// Render one result
    pub fn render(&self, result: &QueryResult, mode: OutputMode) -> Result<String> {
        match mode {
            OutputMode::Json => Ok(serde_json::to_string_pretty(result.rows())?),
            OutputMode::Text => Ok(self.render_text(result)),
        }
    }

    /// Render several results as separate blocks in the given order
    pub fn render_report(&self, results: &[QueryResult], mode: OutputMode) -> Result<String> {
        match mode {
            OutputMode::Json => Ok(serde_json::to_string_pretty(results)?),
            OutputMode::Text => Ok(results
                .iter()
                .map(|r| self.render_text(r))
                .collect::<Vec<_>>()
                .join("\n\n")),
        }
    }

    fn render_text(&self, result: &QueryResult) -> String {
        let header = self.header(result);
        if result.is_empty() {
            return header;
        }

        let separator = match result.intent() {
            QueryIntent::RecentActivity { .. } | QueryIntent::TraceLookup { .. } => "\n",
            _ => "\n\n",
        };
        let rows = result
            .rows()
            .iter()
            .map(|row| self.render_row(row))
            .collect::<Vec<_>>()
            .join(separator);

        format!("{header}\n\n{rows}")
    }

    fn header(&self, result: &QueryResult) -> String {
        let count = result.row_count();
        let noun = if count == 1 { "result" } else { "results" };

        let context = match result.intent() {
            QueryIntent::RecentActivity { .. } => " of recent activity".to_string(),
            QueryIntent::TextSearch { term, field, .. } => {
                format!(" for {term:?} in {}", field.column())
            }
            QueryIntent::SlowRequests {
                min_duration_ms,
                endpoint,
                ..
            } => match endpoint {
                Some(endpoint) => format!(" slower than {min_duration_ms}ms matching {endpoint:?}"),
                None => format!(" slower than {min_duration_ms}ms"),
            },
            QueryIntent::Exceptions { file, .. } => match file {
                Some(file) => format!(" with exceptions in {file:?}"),
                None => " with exceptions".to_string(),
            },
            QueryIntent::EndpointStats { errors_only, .. } => {
                if *errors_only {
                    " across endpoints with errors".to_string()
                } else {
                    " across endpoints".to_string()
                }
            }
            QueryIntent::TraceLookup { trace_id, span_id } => match span_id {
                Some(span_id) => format!(" in trace {trace_id} span {span_id}"),
                None => format!(" in trace {trace_id}"),
            },
            QueryIntent::RawSql { .. } => " for query".to_string(),
        };

        let window = self
            .window
            .as_deref()
            .map(|w| format!(" (last {w})"))
            .unwrap_or_default();

        format!("Found {count} {noun}{context}{window}")
    }

    fn render_row(&self, row: &NormalizedRow) -> String {
        match row {
            NormalizedRow::Activity(r) => format!(
                "{} [{}] {}",
                marker(r.is_exception),
                prefix(&r.start_timestamp, TIMESTAMP_WIDTH),
                r.span_name
            ),

            NormalizedRow::Match(r) => {
                let mut lines = vec![format!(
                    "{} [{}] {}",
                    marker(r.is_exception),
                    prefix(&r.start_timestamp, TIMESTAMP_WIDTH),
                    r.span_name
                )];
                if !r.message.is_empty() && r.message != r.span_name {
                    lines.push(format!("    {}", self.cut(&r.message, MESSAGE_WIDTH)));
                }
                lines.push(format!("    trace: {}", self.trace_id(&r.trace_id)));
                lines.join("\n")
            }

            NormalizedRow::Slow(r) => format!(
                "  [{}] {}\n    {:.0}ms | trace: {}",
                prefix(&r.start_timestamp, TIMESTAMP_WIDTH),
                r.span_name,
                r.duration_ms,
                self.trace_id(&r.trace_id)
            ),

            NormalizedRow::Exception(r) => format!(
                "❌ [{}] {}\n    {}: {}\n    trace: {}",
                prefix(&r.start_timestamp, TIMESTAMP_WIDTH),
                r.span_name,
                r.exception_type,
                self.cut(&r.exception_message, EXCEPTION_WIDTH),
                self.trace_id(&r.trace_id)
            ),

            NormalizedRow::Endpoint(r) => format!(
                "  {}\n    {} reqs | {} errors | avg {:.0}ms | max {:.0}ms",
                r.span_name,
                r.count,
                endpoint_errors(r.errors, r.error_rate),
                r.avg_ms,
                r.max_ms
            ),

            NormalizedRow::Span(r) => {
                let mut line = format!(
                    "{} [{}] {}",
                    marker(r.is_exception),
                    prefix(&r.start_timestamp, TRACE_TIMESTAMP_WIDTH),
                    r.span_name
                );
                if let Some(ms) = r.duration_ms {
                    line.push_str(&format!(" ({ms:.0}ms)"));
                }
                match &r.attributes {
                    Some(attrs) => format!("{line}\n{}", attributes_block(attrs)),
                    None => line,
                }
            }

            NormalizedRow::Raw(record) => render_raw(record),
        }
    }

    fn cut(&self, text: &str, width: usize) -> String {
        if self.full {
            text.to_string()
        } else {
            truncate(text, width)
        }
    }

    fn trace_id<'a>(&self, id: &'a str) -> &'a str {
        if self.full {
            id
        } else {
            prefix(id, TRACE_ID_WIDTH)
        }
    }
}

/// Span-shaped rows get the trace layout, anything else is shown as JSON
fn render_raw(record: &Record) -> String {
    let text = |key: &str| {
        record
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };
    let timestamp = text("start_timestamp");
    let name = text("span_name").or_else(|| text("message"));
    if timestamp.is_none() && name.is_none() {
        return attributes_block(&Value::Object(record.clone()));
    }

    let line = format!(
        "  [{}] {}",
        prefix(timestamp.unwrap_or_default(), TRACE_TIMESTAMP_WIDTH),
        name.unwrap_or("unknown")
    );
    match record.get("attributes") {
        Some(attrs) if !attrs.is_null() && !attrs.as_object().is_some_and(|m| m.is_empty()) => {
            format!("{line}\n{}", attributes_block(attrs))
        }
        _ => line,
    }
}
