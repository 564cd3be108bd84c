//! Maps raw backend records onto the canonical row shape of each pattern.
//!
//! Fields are looked up leniently: missing or null values take a default,
//! numbers may arrive as JSON numbers or numeric strings. Text is kept in
//! full; display truncation belongs to the presenter.

use serde_json::Value;

use crate::models::{
    ActivityRow, EndpointRow, ExceptionRow, NormalizedRow, QueryIntent, Record, SearchMatchRow,
    SlowRequestRow, TraceSpanRow,
};

const UNKNOWN: &str = "unknown";

/// Normalize every row for `intent`; output length equals input length
pub fn normalize(intent: &QueryIntent, rows: Vec<Record>) -> Vec<NormalizedRow> {
    rows.into_iter()
        .map(|record| normalize_row(intent, record))
        .collect()
}

/// Normalize a single record
pub fn normalize_row(intent: &QueryIntent, record: Record) -> NormalizedRow {
    match intent {
        QueryIntent::RecentActivity { .. } => NormalizedRow::Activity(ActivityRow {
            start_timestamp: text(&record, "start_timestamp"),
            span_name: span_name(&record),
            message: text(&record, "message"),
            trace_id: text(&record, "trace_id"),
            is_exception: flag(&record, "is_exception"),
        }),

        QueryIntent::TextSearch { .. } => NormalizedRow::Match(SearchMatchRow {
            start_timestamp: text(&record, "start_timestamp"),
            span_name: text(&record, "span_name"),
            message: text(&record, "message"),
            trace_id: text(&record, "trace_id"),
            is_exception: flag(&record, "is_exception"),
        }),

        QueryIntent::SlowRequests { .. } => NormalizedRow::Slow(SlowRequestRow {
            start_timestamp: text(&record, "start_timestamp"),
            span_name: name_or_unknown(&record),
            duration_ms: duration_ms(&record).unwrap_or(0.0),
            trace_id: text(&record, "trace_id"),
        }),

        QueryIntent::Exceptions { .. } => NormalizedRow::Exception(ExceptionRow {
            start_timestamp: text(&record, "start_timestamp"),
            span_name: name_or_unknown(&record),
            message: text(&record, "message"),
            trace_id: text(&record, "trace_id"),
            exception_type: text(&record, "exception_type"),
            exception_message: text(&record, "exception_message"),
        }),

        QueryIntent::EndpointStats { .. } => {
            let count = integer(&record, "count");
            let errors = integer(&record, "errors");
            NormalizedRow::Endpoint(EndpointRow {
                span_name: name_or_unknown(&record),
                count,
                errors,
                error_rate: EndpointRow::compute_error_rate(count, errors),
                avg_ms: float(&record, "avg_ms").unwrap_or(0.0),
                max_ms: float(&record, "max_ms").unwrap_or(0.0),
            })
        }

        QueryIntent::TraceLookup { .. } => NormalizedRow::Span(TraceSpanRow {
            start_timestamp: text(&record, "start_timestamp"),
            span_name: span_name(&record),
            span_id: text(&record, "span_id"),
            message: text(&record, "message"),
            duration_ms: duration_ms(&record),
            is_exception: flag(&record, "is_exception"),
            attributes: attributes(&record),
        }),

        QueryIntent::RawSql { .. } => NormalizedRow::Raw(record),
    }
}

fn value<'a>(record: &'a Record, key: &str) -> Option<&'a Value> {
    record.get(key).filter(|v| !v.is_null())
}

fn text(record: &Record, key: &str) -> String {
    match value(record, key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn non_empty(record: &Record, key: &str) -> Option<String> {
    Some(text(record, key)).filter(|s| !s.is_empty())
}

/// `span_name`, else `message`, else `"unknown"`
fn span_name(record: &Record) -> String {
    non_empty(record, "span_name")
        .or_else(|| non_empty(record, "message"))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn name_or_unknown(record: &Record) -> String {
    non_empty(record, "span_name").unwrap_or_else(|| UNKNOWN.to_string())
}

fn flag(record: &Record, key: &str) -> bool {
    match value(record, key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => matches!(s.to_ascii_lowercase().as_str(), "true" | "t" | "1"),
        _ => false,
    }
}

fn float(record: &Record, key: &str) -> Option<f64> {
    match value(record, key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn integer(record: &Record, key: &str) -> i64 {
    match value(record, key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// `duration_ms` when the query already scaled it, else `duration` seconds * 1000
fn duration_ms(record: &Record) -> Option<f64> {
    float(record, "duration_ms").or_else(|| float(record, "duration").map(|s| s * 1000.0))
}

/// Non-empty attribute map; JSON-encoded strings are decoded
fn attributes(record: &Record) -> Option<Value> {
    let attrs = match value(record, "attributes")? {
        Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone())),
        other => other.clone(),
    };

    match &attrs {
        Value::Object(map) if map.is_empty() => None,
        Value::String(s) if s.is_empty() => None,
        _ => Some(attrs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchField;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn endpoint_stats() -> QueryIntent {
        QueryIntent::EndpointStats {
            limit: None,
            errors_only: false,
        }
    }

    fn all_intents() -> Vec<QueryIntent> {
        vec![
            QueryIntent::RecentActivity { limit: None },
            QueryIntent::TextSearch {
                term: "x".into(),
                field: SearchField::Message,
                limit: None,
            },
            QueryIntent::SlowRequests {
                min_duration_ms: 1000,
                endpoint: None,
                limit: None,
            },
            QueryIntent::Exceptions { file: None, limit: None },
            endpoint_stats(),
            QueryIntent::TraceLookup {
                trace_id: "abc".into(),
                span_id: None,
            },
            QueryIntent::RawSql { sql: "SELECT 1".into() },
        ]
    }

    #[test]
    fn test_cardinality_preserved_for_every_pattern() {
        let rows = vec![
            record(json!({"span_name": "a"})),
            record(json!({})),
            record(json!({"message": null, "is_exception": true})),
        ];
        for intent in all_intents() {
            assert_eq!(normalize(&intent, rows.clone()).len(), rows.len(), "{}", intent.pattern());
            assert!(normalize(&intent, vec![]).is_empty());
        }
    }

    #[test]
    fn test_activity_defaults() {
        let row = normalize_row(&QueryIntent::RecentActivity { limit: None }, record(json!({})));
        let NormalizedRow::Activity(row) = row else {
            panic!("expected activity row");
        };
        assert_eq!(row.span_name, "unknown");
        assert_eq!(row.start_timestamp, "");
        assert!(!row.is_exception);
    }

    #[test]
    fn test_span_name_falls_back_to_message() {
        let row = normalize_row(
            &QueryIntent::RecentActivity { limit: None },
            record(json!({"span_name": null, "message": "cache miss", "is_exception": 1})),
        );
        let NormalizedRow::Activity(row) = row else {
            panic!("expected activity row");
        };
        assert_eq!(row.span_name, "cache miss");
        assert!(row.is_exception);
    }

    #[test]
    fn test_search_without_span_name_keeps_message_separate() {
        let row = normalize_row(
            &QueryIntent::TextSearch {
                term: "m".into(),
                field: SearchField::Message,
                limit: None,
            },
            record(json!({"span_name": null, "message": "m".repeat(300)})),
        );
        let NormalizedRow::Match(row) = row else {
            panic!("expected match row");
        };
        assert_eq!(row.span_name, "");
        assert_eq!(row.message.len(), 300);
    }

    #[test]
    fn test_exception_without_span_name_is_unknown() {
        let row = normalize_row(
            &QueryIntent::Exceptions { file: None, limit: None },
            record(json!({"message": "boom", "exception_type": "ValueError"})),
        );
        let NormalizedRow::Exception(row) = row else {
            panic!("expected exception row");
        };
        assert_eq!(row.span_name, "unknown");
        assert_eq!(row.message, "boom");
    }

    #[test]
    fn test_slow_and_endpoint_names_do_not_use_message() {
        let slow = normalize_row(
            &QueryIntent::SlowRequests {
                min_duration_ms: 1000,
                endpoint: None,
                limit: None,
            },
            record(json!({"message": "slow thing", "duration_ms": 1200.0})),
        );
        assert!(matches!(slow, NormalizedRow::Slow(ref r) if r.span_name == "unknown"));

        let endpoint =
            normalize_row(&endpoint_stats(), record(json!({"message": "x", "count": 1})));
        assert!(matches!(endpoint, NormalizedRow::Endpoint(ref r) if r.span_name == "unknown"));
    }

    #[test]
    fn test_search_keeps_full_message() {
        let long = "x".repeat(300);
        let row = normalize_row(
            &QueryIntent::TextSearch {
                term: "x".into(),
                field: SearchField::Message,
                limit: None,
            },
            record(json!({"span_name": "upload", "message": long})),
        );
        let NormalizedRow::Match(row) = row else {
            panic!("expected match row");
        };
        assert_eq!(row.message.len(), 300);
    }

    #[test]
    fn test_endpoint_error_rate() {
        let rows = normalize(
            &endpoint_stats(),
            vec![
                record(json!({
                    "span_name": "GET /a",
                    "count": 10,
                    "errors": 2,
                    "avg_ms": 12.5,
                    "max_ms": 80.0
                })),
                record(json!({"span_name": "GET /b", "count": 0, "errors": 0})),
                record(json!({"span_name": "GET /c", "count": "4", "errors": "1", "avg_ms": null})),
            ],
        );

        let rates: Vec<f64> = rows
            .iter()
            .map(|r| match r {
                NormalizedRow::Endpoint(e) => e.error_rate,
                _ => panic!("expected endpoint row"),
            })
            .collect();
        assert!((rates[0] - 20.0).abs() < f64::EPSILON);
        assert_eq!(rates[1], 0.0);
        assert!((rates[2] - 25.0).abs() < f64::EPSILON);

        let NormalizedRow::Endpoint(third) = &rows[2] else {
            panic!("expected endpoint row");
        };
        assert_eq!(third.avg_ms, 0.0);
        assert_eq!(third.count, 4);
    }

    #[test]
    fn test_slow_prefers_scaled_duration() {
        let intent = QueryIntent::SlowRequests {
            min_duration_ms: 1000,
            endpoint: None,
            limit: None,
        };
        let rows = normalize(
            &intent,
            vec![
                record(json!({"span_name": "a", "duration_ms": 1500.0})),
                record(json!({"span_name": "b", "duration": 2.5})),
            ],
        );
        let durations: Vec<f64> = rows
            .iter()
            .map(|r| match r {
                NormalizedRow::Slow(s) => s.duration_ms,
                _ => panic!("expected slow row"),
            })
            .collect();
        assert_eq!(durations, vec![1500.0, 2500.0]);
    }

    #[test]
    fn test_trace_span_converts_seconds_and_keeps_attributes() {
        let intent = QueryIntent::TraceLookup {
            trace_id: "abc".into(),
            span_id: None,
        };
        let row = normalize_row(
            &intent,
            record(json!({
                "start_timestamp": "2024-06-01T12:00:00.123456Z",
                "span_name": "POST /upload",
                "duration": 0.25,
                "attributes": {"http.status_code": 200}
            })),
        );
        let NormalizedRow::Span(span) = row else {
            panic!("expected span row");
        };
        assert_eq!(span.duration_ms, Some(250.0));
        assert_eq!(span.attributes, Some(json!({"http.status_code": 200})));
    }

    #[test]
    fn test_empty_attributes_dropped() {
        let intent = QueryIntent::TraceLookup {
            trace_id: "abc".into(),
            span_id: None,
        };
        let row = normalize_row(&intent, record(json!({"attributes": {}, "duration": null})));
        let NormalizedRow::Span(span) = row else {
            panic!("expected span row");
        };
        assert!(span.attributes.is_none());
        assert!(span.duration_ms.is_none());
    }

    #[test]
    fn test_encoded_attributes_decoded() {
        let intent = QueryIntent::TraceLookup {
            trace_id: "abc".into(),
            span_id: None,
        };
        let row = normalize_row(&intent, record(json!({"attributes": "{\"user\": \"ada\"}"})));
        let NormalizedRow::Span(span) = row else {
            panic!("expected span row");
        };
        assert_eq!(span.attributes, Some(json!({"user": "ada"})));
    }

    #[test]
    fn test_raw_rows_untouched() {
        let original = record(json!({"anything": [1, 2, 3], "n": null}));
        let row = normalize_row(&QueryIntent::RawSql { sql: "SELECT 1".into() }, original.clone());
        assert_eq!(row, NormalizedRow::Raw(original));
    }

    #[test]
    fn test_order_preserved() {
        let rows = normalize(
            &QueryIntent::RecentActivity { limit: None },
            vec![
                record(json!({"span_name": "third", "start_timestamp": "2024-01-01T00:00:03Z"})),
                record(json!({"span_name": "first", "start_timestamp": "2024-01-01T00:00:01Z"})),
                record(json!({"span_name": "second", "start_timestamp": "2024-01-01T00:00:02Z"})),
            ],
        );
        let names: Vec<&str> = rows
            .iter()
            .map(|r| match r {
                NormalizedRow::Activity(a) => a.span_name.as_str(),
                _ => panic!("expected activity row"),
            })
            .collect();
        assert_eq!(names, vec!["third", "first", "second"]);
    }
}
