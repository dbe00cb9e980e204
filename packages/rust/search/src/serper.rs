//! Serper JSON search API backend.

use std::time::Duration;

use async_trait::async_trait;
use prospector_shared::{ProspectorError, Result, SearchHit};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{DEFAULT_TIMEOUT_SECS, SearchProvider, build_client, network_error, read_body, trim_base};

const PROVIDER: &str = "serper";
const DEFAULT_BASE_URL: &str = "https://google.serper.dev";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    num: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

/// Google results via `POST {base}/search`.
pub struct SerperClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl SerperClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
        })
    }

    /// Point the client at a different host (tests, proxies).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = trim_base(base_url);
        self
    }
}

#[async_trait]
impl SearchProvider for SerperClient {
    #[instrument(skip_all, fields(provider = PROVIDER, query = %query))]
    async fn search(&self, query: &str, result_count: usize) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("X-API-KEY", &self.api_key)
            .json(&SearchRequest {
                q: query,
                num: result_count,
            })
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        let Some(body) = read_body(PROVIDER, response).await? else {
            return Ok(Vec::new());
        };
        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| ProspectorError::parse(format!("{PROVIDER} response: {e}")))?;

        let hits: Vec<SearchHit> = parsed
            .organic
            .into_iter()
            .filter(|r| !r.link.is_empty())
            .take(result_count)
            .map(|r| SearchHit {
                url: r.link,
                title: r.title,
                snippet: r.snippet,
            })
            .collect();

        debug!(count = hits.len(), "search complete");
        Ok(hits)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> SerperClient {
        SerperClient::new("test-key")
            .unwrap()
            .with_base_url(&server.uri())
    }

    #[tokio::test]
    async fn test_search_parses_organic_results() {
        let server = MockServer::start().await;
        let fixture = std::fs::read_to_string("../../../fixtures/json/serper-search.json")
            .expect("read serper fixture");

        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("X-API-KEY", "test-key"))
            .and(body_json(serde_json::json!({"q": "\"Acme Co\" website", "num": 10})))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture))
            .mount(&server)
            .await;

        let hits = client_for(&server)
            .await
            .search("\"Acme Co\" website", 10)
            .await
            .unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].url, "https://www.linkedin.com/company/acme-co");
        assert_eq!(hits[1].url, "https://www.acme.com/");
        assert_eq!(hits[1].title, "Acme Co | Financial Advisory");
        assert!(hits[2].snippet.contains("annual report"));
    }

    #[tokio::test]
    async fn test_search_truncates_to_result_count() {
        let server = MockServer::start().await;
        let fixture = std::fs::read_to_string("../../../fixtures/json/serper-search.json")
            .expect("read serper fixture");

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture))
            .mount(&server)
            .await;

        let hits = client_for(&server).await.search("acme", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(403).set_body_string("bad key"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server).await;

        let err = client.search("q", 10).await.unwrap_err();
        assert!(matches!(err, ProspectorError::RateLimited { .. }));
        assert!(err.is_retryable());

        let err = client.search("q", 10).await.unwrap_err();
        assert!(matches!(err, ProspectorError::Provider { status: 503, .. }));
        assert!(err.is_retryable());

        let err = client.search("q", 10).await.unwrap_err();
        assert!(matches!(err, ProspectorError::Provider { status: 403, .. }));
        assert!(!err.is_retryable());

        assert!(client.search("q", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.search("q", 10).await.unwrap_err();
        assert!(matches!(err, ProspectorError::Parse { .. }));
        assert!(!err.is_retryable());
    }
}
