//! Bulk email discovery per company domain.

use std::collections::HashSet;
use std::sync::Arc;

use prospector_search::EmailFinder;
use prospector_shared::{EmailCandidate, EmailLookup, Result};
use prospector_storage::Storage;
use tracing::{debug, info, instrument, warn};

use crate::cache::OnceMap;
use crate::limiter::RateLimiter;
use crate::retry::RetryPolicy;

/// One provider call per domain per run, never one per person.
pub struct CompanyEmailFinder {
    finder: Arc<dyn EmailFinder>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    max_emails: usize,
    cache: OnceMap<String, EmailLookup>,
    storage: Option<Arc<Storage>>,
    ttl_days: u32,
}

impl CompanyEmailFinder {
    pub fn new(
        finder: Arc<dyn EmailFinder>,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
        max_emails: usize,
    ) -> Self {
        Self {
            finder,
            limiter,
            retry,
            max_emails,
            cache: OnceMap::new(),
            storage: None,
            ttl_days: 0,
        }
    }

    pub fn with_storage(mut self, storage: Arc<Storage>, ttl_days: u32) -> Self {
        self.storage = Some(storage);
        self.ttl_days = ttl_days;
        self
    }

    /// Addresses at `domain`, normalized and capped.
    #[instrument(skip_all, fields(domain = %domain, stage = "emails"))]
    pub async fn find(&self, domain: &str) -> Result<EmailLookup> {
        let domain = domain.trim().to_lowercase();
        self.cache
            .get_or_try_init(domain.clone(), || self.lookup(&domain))
            .await
    }

    /// Number of distinct domains looked up so far.
    pub async fn cached_domains(&self) -> usize {
        self.cache.len().await
    }

    async fn lookup(&self, domain: &str) -> Result<EmailLookup> {
        if let Some(storage) = &self.storage {
            match storage.get_emails(domain, self.ttl_days).await {
                Ok(Some(cached)) => {
                    debug!(count = cached.emails.len(), "email cache hit");
                    return Ok(cap(cached, self.max_emails));
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "email cache read failed"),
            }
        }

        let raw = self
            .retry
            .run_limited(&self.limiter, "email lookup", || {
                self.finder.find_company_emails(domain)
            })
            .await?;
        let lookup = EmailLookup::new(domain, normalize_emails(raw, self.max_emails));

        info!(
            provider = self.finder.name(),
            count = lookup.emails.len(),
            status = lookup.status.as_str(),
            "email lookup complete"
        );

        if let Some(storage) = &self.storage {
            if let Err(e) = storage.put_emails(&lookup).await {
                warn!(error = %e, "email cache write failed");
            }
        }
        Ok(lookup)
    }
}

/// Trim, lowercase, drop malformed addresses and duplicates (first wins), cap.
pub fn normalize_emails(raw: Vec<String>, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| is_plausible_address(e))
        .filter(|e| seen.insert(e.clone()))
        .take(max)
        .collect()
}

/// Candidates for the per-email stage.
pub fn candidates(lookup: &EmailLookup) -> Vec<EmailCandidate> {
    lookup
        .emails
        .iter()
        .map(|address| EmailCandidate {
            address: address.clone(),
            source_domain: lookup.domain.clone(),
        })
        .collect()
}

fn is_plausible_address(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && domain.contains('.') && !email.contains(char::is_whitespace)
        }
        _ => false,
    }
}

fn cap(mut lookup: EmailLookup, max: usize) -> EmailLookup {
    lookup.emails.truncate(max);
    lookup
}
