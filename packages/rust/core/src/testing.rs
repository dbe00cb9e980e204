//! In-memory providers for pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use prospector_search::{EmailFinder, SearchProvider};
use prospector_shared::{ProspectorError, Result, SearchHit};

pub(crate) fn hit(url: &str, title: &str, snippet: &str) -> SearchHit {
    SearchHit {
        url: url.into(),
        title: title.into(),
        snippet: snippet.into(),
    }
}

/// Answers queries from a fixed table; unknown queries return no hits.
#[derive(Default)]
pub(crate) struct MockSearch {
    answers: HashMap<String, Vec<SearchHit>>,
    failing: HashMap<String, u16>,
    latency: Duration,
    pub calls: Mutex<Vec<String>>,
    times: Mutex<Vec<Instant>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, query: &str, hits: Vec<SearchHit>) -> Self {
        self.answers.insert(query.to_string(), hits);
        self
    }

    /// Make `query` fail with `status` on every call.
    pub fn fail(mut self, query: &str, status: u16) -> Self {
        self.failing.insert(query.to_string(), status);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// When each call reached the provider, in arrival order.
    pub fn call_times(&self) -> Vec<Instant> {
        self.times.lock().unwrap().clone()
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.queries().iter().filter(|q| q.contains(needle)).count()
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, query: &str, result_count: usize) -> Result<Vec<SearchHit>> {
        self.calls.lock().unwrap().push(query.to_string());
        self.times.lock().unwrap().push(Instant::now());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(status) = self.failing.get(query) {
            return Err(ProspectorError::from_status("mock-search", *status, "failing"));
        }
        Ok(self
            .answers
            .get(query)
            .map(|hits| hits.iter().take(result_count).cloned().collect())
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "mock-search"
    }
}

/// Returns a fixed email list per domain and counts lookups.
#[derive(Default)]
pub(crate) struct MockFinder {
    emails: HashMap<String, Vec<String>>,
    failing: HashMap<String, u16>,
    latency: Duration,
    pub calls: Mutex<Vec<String>>,
    times: Mutex<Vec<Instant>>,
}

impl MockFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn domain(mut self, domain: &str, emails: &[&str]) -> Self {
        self.emails
            .insert(domain.to_string(), emails.iter().map(|e| e.to_string()).collect());
        self
    }

    pub fn fail(mut self, domain: &str, status: u16) -> Self {
        self.failing.insert(domain.to_string(), status);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn lookups(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.times.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailFinder for MockFinder {
    async fn find_company_emails(&self, domain: &str) -> Result<Vec<String>> {
        self.calls.lock().unwrap().push(domain.to_string());
        self.times.lock().unwrap().push(Instant::now());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(status) = self.failing.get(domain) {
            return Err(ProspectorError::from_status("mock-finder", *status, "failing"));
        }
        Ok(self.emails.get(domain).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "mock-finder"
    }
}
