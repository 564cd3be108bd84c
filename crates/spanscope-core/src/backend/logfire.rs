//! HTTP client for the Logfire query API

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::credentials::ReadToken;
use crate::error::{Error, Result};
use crate::models::Record;

use super::{QueryBackend, TokenInfo};

const DEFAULT_REGION: &str = "us";

/// Row-oriented query response
#[derive(Debug, Deserialize)]
struct RowQueryResults {
    #[serde(default)]
    rows: Vec<Record>,
}

/// Base URL for the region encoded in a token (`pylf_v<n>_<region>_...`)
pub fn region_base_url(token: &str) -> String {
    let mut parts = token.split('_');
    let region = match (parts.next(), parts.next(), parts.next()) {
        (Some("pylf"), Some(version), Some(region))
            if version.starts_with('v')
                && !region.is_empty()
                && region.chars().all(|c| c.is_ascii_lowercase()) =>
        {
            region
        }
        _ => DEFAULT_REGION,
    };
    format!("https://logfire-{region}.pydantic.dev")
}

/// Query API client; the connection pool is released when the client drops
#[derive(Clone)]
pub struct LogfireClient {
    client: Client,
    base_url: Url,
    display_url: String,
}

impl LogfireClient {
    /// Create a client for `token`, using `base_url` or the token's region
    pub fn new(token: &ReadToken, base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        let raw_url = base_url
            .map(str::to_string)
            .unwrap_or_else(|| region_base_url(token.expose()));

        let mut base = Url::parse(&raw_url)
            .map_err(|e| Error::config(format!("invalid backend base_url {raw_url:?}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut auth = HeaderValue::from_str(token.expose()).map_err(|_| {
            Error::invalid_parameter("read_token", "contains characters not allowed in a header")
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(concat!("spanscope/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {e}")))?;

        debug!(base_url = %base, "Created query client");

        Ok(Self {
            client,
            display_url: raw_url.trim_end_matches('/').to_string(),
            base_url: base,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::config(format!("invalid endpoint {path}: {e}")))
    }
}

#[async_trait]
impl QueryBackend for LogfireClient {
    async fn query_rows(&self, sql: &str, min_timestamp: DateTime<Utc>) -> Result<Vec<Record>> {
        let min_timestamp = min_timestamp.to_rfc3339_opts(SecondsFormat::Micros, true);

        let response = self
            .client
            .get(self.endpoint("v1/query")?)
            .query(&[
                ("sql", sql),
                ("min_timestamp", min_timestamp.as_str()),
                ("json_rows", "true"),
            ])
            .send()
            .await?;

        let body: RowQueryResults = check_status(response).await?.json().await?;
        Ok(body.rows)
    }

    async fn token_info(&self) -> Result<TokenInfo> {
        let response = self
            .client
            .get(self.endpoint("v1/read-token-info")?)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    fn base_url(&self) -> &str {
        &self.display_url
    }
}

/// Translate non-success statuses into the error taxonomy
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = error_detail(&body);
    warn!(status = status.as_u16(), detail = %detail, "Backend returned an error");

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Auth(format!("backend returned {status}: {detail}"))
        }
        StatusCode::BAD_REQUEST
        | StatusCode::UNPROCESSABLE_ENTITY
        | StatusCode::INTERNAL_SERVER_ERROR => Error::BackendQuery(format!("{status}: {detail}")),
        _ => Error::transport(format!("unexpected response {status}: {detail}")),
    })
}

/// `detail` of a JSON error body, or the trimmed body itself
fn error_detail(body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned())
        .map(|d| match d {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_else(|| body.trim().to_string());

    if detail.is_empty() {
        "no details".to_string()
    } else {
        detail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token() -> ReadToken {
        ReadToken::new("pylf_v1_eu_testtoken")
    }

    async fn client(server: &MockServer) -> LogfireClient {
        LogfireClient::new(&token(), Some(&server.uri()), Duration::from_secs(5)).unwrap()
    }

    fn min_ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_region_base_url() {
        assert_eq!(
            region_base_url("pylf_v1_eu_abc123"),
            "https://logfire-eu.pydantic.dev"
        );
        assert_eq!(
            region_base_url("pylf_v2_us_abc123"),
            "https://logfire-us.pydantic.dev"
        );
        assert_eq!(region_base_url("legacy-token"), "https://logfire-us.pydantic.dev");
    }

    #[test]
    fn test_error_detail() {
        assert_eq!(error_detail(r#"{"detail": "bad sql"}"#), "bad sql");
        assert_eq!(error_detail("  plain text \n"), "plain text");
        assert_eq!(error_detail(""), "no details");
    }

    #[tokio::test]
    async fn test_query_rows_sends_bound_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/query"))
            .and(query_param("sql", "SELECT span_name FROM records"))
            .and(query_param("min_timestamp", "2024-06-01T12:00:00.000000Z"))
            .and(query_param("json_rows", "true"))
            .and(header("authorization", "pylf_v1_eu_testtoken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "columns": [{"name": "span_name"}],
                "rows": [{"span_name": "GET /a"}, {"span_name": "GET /b"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let rows = client(&server)
            .await
            .query_rows("SELECT span_name FROM records", min_ts())
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["span_name"], "GET /a");
        assert_eq!(rows[1]["span_name"], "GET /b");
    }

    #[tokio::test]
    async fn test_query_rows_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/query"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"columns": [], "rows": []})),
            )
            .mount(&server)
            .await;

        let rows = client(&server).await.query_rows("SELECT 1", min_ts()).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid token"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).await.query_rows("SELECT 1", min_ts()).await.unwrap_err();
        assert!(matches!(err, Error::Auth(ref msg) if msg.contains("Invalid token")));
    }

    #[tokio::test]
    async fn test_bad_query_maps_to_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(json!({"detail": "SQL error: table 'recordz' not found"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .query_rows("SELECT * FROM recordz", min_ts())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BackendQuery(ref msg) if msg.contains("recordz")));
    }

    #[tokio::test]
    async fn test_unavailable_maps_to_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).await.query_rows("SELECT 1", min_ts()).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_connection_failure_maps_to_transport_error() {
        let client = LogfireClient::new(&token(), Some("http://127.0.0.1:1"), Duration::from_secs(2))
            .unwrap();
        let err = client.query_rows("SELECT 1", min_ts()).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_token_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/read-token-info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "organization_name": "acme",
                "project_name": "shop",
                "token_id": "ignored"
            })))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let info = client.token_info().await.unwrap();
        assert_eq!(info.organization_name, "acme");
        assert_eq!(info.project_name, "shop");
        assert_eq!(client.base_url(), server.uri());
    }

    #[test]
    fn test_unusable_token_is_invalid_parameter() {
        let token = ReadToken::new("pylf_v1_us_bad\ntoken");
        let result = LogfireClient::new(&token, Some("http://127.0.0.1:1"), Duration::from_secs(1));
        assert!(matches!(
            result,
            Err(Error::InvalidParameter { ref name, .. }) if name == "read_token"
        ));
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let result = LogfireClient::new(&token(), Some("not a url"), Duration::from_secs(1));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
