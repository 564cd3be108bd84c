//! Query results

use serde::Serialize;

use super::{NormalizedRow, QueryIntent};

/// Normalized rows of one query, in backend order.
///
/// `row_count() == rows().len()` holds by construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    intent: QueryIntent,
    row_count: usize,
    rows: Vec<NormalizedRow>,
}

impl QueryResult {
    /// Wrap normalized rows for an intent
    pub fn new(intent: QueryIntent, rows: Vec<NormalizedRow>) -> Self {
        Self {
            intent,
            row_count: rows.len(),
            rows,
        }
    }

    /// The intent that produced these rows
    pub fn intent(&self) -> &QueryIntent {
        &self.intent
    }

    /// Rows in the order the backend returned them
    pub fn rows(&self) -> &[NormalizedRow] {
        &self.rows
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Whether the query matched nothing
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }
}
