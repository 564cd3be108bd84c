//! Query intents: the seven supported analytical patterns

use serde::{Deserialize, Serialize};

/// Column searched by a text search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    /// Log/span message
    #[default]
    Message,
    /// Span name
    SpanName,
}

impl SearchField {
    /// Column name in the records table
    pub fn column(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::SpanName => "span_name",
        }
    }
}

/// What the caller wants to know, with the parameters of that pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum QueryIntent {
    /// Most recent records, newest first
    RecentActivity {
        /// Result limit (pattern default when unset)
        limit: Option<u32>,
    },

    /// Case-insensitive substring search over one column
    TextSearch {
        /// Search term
        term: String,
        /// Column to search
        field: SearchField,
        /// Result limit
        limit: Option<u32>,
    },

    /// Records slower than a threshold, slowest first
    SlowRequests {
        /// Minimum duration in milliseconds
        min_duration_ms: u64,
        /// Optional span name substring
        endpoint: Option<String>,
        /// Result limit
        limit: Option<u32>,
    },

    /// Records flagged as exceptions, newest first
    Exceptions {
        /// Optional file path substring of the stacktrace
        file: Option<String>,
        /// Result limit
        limit: Option<u32>,
    },

    /// Per-endpoint request counts, errors and latency
    EndpointStats {
        /// Maximum number of endpoints
        limit: Option<u32>,
        /// Keep only endpoints with at least one exception
        errors_only: bool,
    },

    /// Every record of one trace in start order
    TraceLookup {
        /// Trace identifier
        trace_id: String,
        /// Optional span identifier within the trace
        span_id: Option<String>,
    },

    /// Caller-supplied SQL, passed through verbatim
    RawSql {
        /// Query text
        sql: String,
    },
}

impl QueryIntent {
    /// Stable pattern name
    pub fn pattern(&self) -> &'static str {
        match self {
            Self::RecentActivity { .. } => "recent_activity",
            Self::TextSearch { .. } => "text_search",
            Self::SlowRequests { .. } => "slow_requests",
            Self::Exceptions { .. } => "exceptions",
            Self::EndpointStats { .. } => "endpoint_stats",
            Self::TraceLookup { .. } => "trace_lookup",
            Self::RawSql { .. } => "raw_sql",
        }
    }

    /// Limit requested by the caller, if the pattern takes one
    pub fn requested_limit(&self) -> Option<u32> {
        match self {
            Self::RecentActivity { limit }
            | Self::TextSearch { limit, .. }
            | Self::SlowRequests { limit, .. }
            | Self::Exceptions { limit, .. }
            | Self::EndpointStats { limit, .. } => *limit,
            Self::TraceLookup { .. } | Self::RawSql { .. } => None,
        }
    }

    /// Limit applied when the caller does not give one
    pub fn default_limit(&self) -> Option<u32> {
        match self {
            Self::RecentActivity { .. } => Some(30),
            Self::TextSearch { .. }
            | Self::SlowRequests { .. }
            | Self::Exceptions { .. }
            | Self::EndpointStats { .. } => Some(20),
            Self::TraceLookup { .. } | Self::RawSql { .. } => None,
        }
    }
}
