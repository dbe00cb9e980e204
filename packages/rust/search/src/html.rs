//! Keyless HTML search backend.
//!
//! Fetches the static results page (`GET {base}/html/?q=`) and scrapes the
//! result blocks. Result links are redirect URLs carrying the target in a
//! `uddg` query parameter; those are unwrapped to the real destination.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use prospector_shared::{Result, SearchHit};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use crate::{DEFAULT_TIMEOUT_SECS, SearchProvider, build_client, network_error, read_body, trim_base};

const PROVIDER: &str = "html-search";
const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";

static RESULT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".result").expect("result selector"));
static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.result__a").expect("link selector"));
static SNIPPET_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".result__snippet").expect("snippet selector"));

/// Scrapes an HTML results page; needs no API key.
pub struct HtmlSearchClient {
    base_url: String,
    client: Client,
}

impl HtmlSearchClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = trim_base(base_url);
        self
    }
}

#[async_trait]
impl SearchProvider for HtmlSearchClient {
    #[instrument(skip_all, fields(provider = PROVIDER, query = %query))]
    async fn search(&self, query: &str, result_count: usize) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .get(format!("{}/html/", self.base_url))
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        let Some(body) = read_body(PROVIDER, response).await? else {
            return Ok(Vec::new());
        };

        let hits = parse_results(&body, result_count);
        debug!(count = hits.len(), "search complete");
        Ok(hits)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

/// Extract up to `limit` organic hits from a results page. Ads are skipped.
pub fn parse_results(html: &str, limit: usize) -> Vec<SearchHit> {
    let doc = Html::parse_document(html);
    doc.select(&RESULT_SEL)
        .filter(|el| !is_ad(el))
        .filter_map(|el| {
            let link = el.select(&LINK_SEL).next()?;
            let href = link.value().attr("href")?;
            let url = unwrap_redirect(href)?;
            let title = collapse(&link.text().collect::<String>());
            let snippet = el
                .select(&SNIPPET_SEL)
                .next()
                .map(|s| collapse(&s.text().collect::<String>()))
                .unwrap_or_default();
            Some(SearchHit {
                url,
                title,
                snippet,
            })
        })
        .take(limit)
        .collect()
}

fn is_ad(el: &ElementRef<'_>) -> bool {
    el.value().classes().any(|c| c == "result--ad")
}

/// Resolve a result href to its destination URL.
///
/// `//duckduckgo.com/l/?uddg=https%3A%2F%2Facme.com%2F&rut=..` becomes
/// `https://acme.com/`; plain absolute links pass through.
fn unwrap_redirect(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("{DEFAULT_BASE_URL}{href}")
    } else {
        href.to_string()
    };
    let url = Url::parse(&absolute).ok()?;
    if let Some((_, target)) = url.query_pairs().find(|(k, _)| k == "uddg") {
        return Some(target.into_owned());
    }
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fixture() -> String {
        std::fs::read_to_string("../../../fixtures/html/search-results.html")
            .expect("read search results fixture")
    }

    #[test]
    fn test_parse_results_unwraps_redirects() {
        let hits = parse_results(&fixture(), 10);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].url, "https://www.acme.com/");
        assert_eq!(hits[0].title, "Acme Co | Financial Advisory");
        assert_eq!(
            hits[0].snippet,
            "Acme Co provides audit, tax and advisory services across Ontario."
        );
        assert_eq!(hits[1].url, "https://ca.linkedin.com/company/acme-co");
        assert_eq!(hits[2].url, "https://acme.com/careers");
    }

    #[test]
    fn test_parse_results_skips_ads_and_respects_limit() {
        let hits = parse_results(&fixture(), 1);
        assert_eq!(hits.len(), 1);
        assert!(parse_results(&fixture(), 10).iter().all(|h| !h.url.contains("ads.example")));
    }

    #[test]
    fn test_unwrap_redirect_forms() {
        assert_eq!(
            unwrap_redirect("/l/?uddg=https%3A%2F%2Fx.io%2Fa&rut=1").as_deref(),
            Some("https://x.io/a")
        );
        assert_eq!(
            unwrap_redirect("https://acme.com/").as_deref(),
            Some("https://acme.com/")
        );
        assert!(unwrap_redirect("javascript:void(0)").is_none());
    }

    #[tokio::test]
    async fn test_search_against_mock_server() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/html/"))
            .and(query_param("q", "\"Acme Co\" website"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture()))
            .mount(&server)
            .await;

        let client = HtmlSearchClient::new().unwrap().with_base_url(&server.uri());
        let hits = client.search("\"Acme Co\" website", 10).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(client.name(), "html-search");
    }

    #[tokio::test]
    async fn test_search_maps_rate_limit() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/html/"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = HtmlSearchClient::new().unwrap().with_base_url(&server.uri());
        let err = client.search("anything", 10).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
