//! Provider interfaces and HTTP backends.
//!
//! The pipeline talks to the outside world through exactly two traits:
//! [`SearchProvider`] (web and profile search) and [`EmailFinder`] (bulk
//! company email discovery). Credentials are injected at construction; no
//! backend reads the environment.
//!
//! All backends map HTTP statuses the same way: 429 becomes
//! [`ProspectorError::RateLimited`], 404 an empty result, any other
//! non-success a [`ProspectorError::Provider`] (retryable for 5xx).

mod anymailfinder;
mod html;
mod serper;

use std::time::Duration;

use async_trait::async_trait;
use prospector_shared::{ProspectorError, Result, SearchHit};
use reqwest::{Client, Response, StatusCode};

pub use anymailfinder::AnymailfinderClient;
pub use html::{HtmlSearchClient, parse_results};
pub use serper::SerperClient;

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("Prospector/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Longest provider error body kept in an error message.
const MAX_ERROR_BODY: usize = 200;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A web search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run `query`, returning at most `result_count` hits in rank order.
    async fn search(&self, query: &str, result_count: usize) -> Result<Vec<SearchHit>>;

    /// Short provider name for logs and errors.
    fn name(&self) -> &str;
}

/// A bulk email discovery backend: one call per domain.
#[async_trait]
pub trait EmailFinder: Send + Sync {
    /// Addresses the provider knows at `domain`, in provider order.
    async fn find_company_emails(&self, domain: &str) -> Result<Vec<String>>;

    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with the shared user agent and timeout.
pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| ProspectorError::Network(format!("failed to build HTTP client: {e}")))
}

/// Map a transport error to [`ProspectorError::Network`].
pub(crate) fn network_error(provider: &str, e: reqwest::Error) -> ProspectorError {
    ProspectorError::Network(format!("{provider}: {e}"))
}

/// Read a response body, mapping non-success statuses to errors.
///
/// Returns `Ok(None)` on 404 so callers can treat it as an empty result.
pub(crate) async fn read_body(provider: &str, response: Response) -> Result<Option<String>> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProspectorError::from_status(
            provider,
            status.as_u16(),
            truncate(body.trim(), MAX_ERROR_BODY),
        ));
    }
    response
        .text()
        .await
        .map(Some)
        .map_err(|e| network_error(provider, e))
}

/// Trim a trailing slash so `{base}/path` joins cleanly.
pub(crate) fn trim_base(base: &str) -> String {
    base.trim_end_matches('/').to_string()
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
