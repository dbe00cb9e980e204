//! Company name → canonical homepage domain.
//!
//! Up to three queries of decreasing specificity are issued; the first
//! homepage-like result wins and short-circuits the rest. If none of the
//! queries produces one, the first subpage-like result seen is used as a
//! fallback (`is_homepage = false`).

use std::sync::Arc;

use prospector_extract::{UrlClass, classify_url, domain_of, normalize_website};
use prospector_search::SearchProvider;
use prospector_shared::{CompanyRecord, ProspectorError, ResolvedWebsite, Result};
use prospector_storage::Storage;
use tracing::{debug, info, instrument, warn};

use crate::cache::OnceMap;
use crate::limiter::RateLimiter;
use crate::retry::RetryPolicy;

pub struct WebsiteResolver {
    search: Arc<dyn SearchProvider>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    result_count: usize,
    cache: OnceMap<(String, String), Option<ResolvedWebsite>>,
    storage: Option<Arc<Storage>>,
    ttl_days: u32,
}

impl WebsiteResolver {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
        result_count: usize,
    ) -> Self {
        Self {
            search,
            limiter,
            retry,
            result_count,
            cache: OnceMap::new(),
            storage: None,
            ttl_days: 0,
        }
    }

    /// Back the in-run cache with a persistent one.
    pub fn with_storage(mut self, storage: Arc<Storage>, ttl_days: u32) -> Self {
        self.storage = Some(storage);
        self.ttl_days = ttl_days;
        self
    }

    /// Resolve the website of `company`. `Ok(None)` means not found.
    #[instrument(skip_all, fields(company = %company.name, stage = "website"))]
    pub async fn resolve(&self, company: &CompanyRecord) -> Result<Option<ResolvedWebsite>> {
        if let Some(known) = company.website.as_deref().and_then(known_website) {
            debug!(domain = %known.domain, "using supplied website");
            return Ok(Some(known));
        }

        let name = clean_name(&company.name);
        if name.is_empty() {
            warn!("company record has no name");
            return Ok(None);
        }
        let keywords = company.context_keywords();
        let key = (name.to_lowercase(), keywords.to_lowercase());

        self.cache
            .get_or_try_init(key, || self.resolve_uncached(&name, &keywords))
            .await
    }

    async fn resolve_uncached(&self, name: &str, keywords: &str) -> Result<Option<ResolvedWebsite>> {
        if let Some(storage) = &self.storage {
            match storage.get_website(name, keywords, self.ttl_days).await {
                Ok(Some(cached)) => {
                    debug!(domain = %cached.domain, "website cache hit");
                    return Ok(Some(cached));
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "website cache read failed"),
            }
        }

        let resolved = self.search_website(name, keywords).await?;

        if let (Some(storage), Some(site)) = (&self.storage, &resolved) {
            if let Err(e) = storage.put_website(name, keywords, site).await {
                warn!(error = %e, "website cache write failed");
            }
        }
        Ok(resolved)
    }

    async fn search_website(&self, name: &str, keywords: &str) -> Result<Option<ResolvedWebsite>> {
        let mut fallback: Option<ResolvedWebsite> = None;
        let mut last_error: Option<ProspectorError> = None;
        let mut answered = false;

        for query in website_queries(name, keywords) {
            let hits = match self
                .retry
                .run_limited(&self.limiter, "website search", || {
                    self.search.search(&query, self.result_count)
                })
                .await
            {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(%query, error = %e, "website query failed");
                    last_error = Some(e);
                    continue;
                }
            };
            answered = true;

            for hit in hits {
                match classify_url(&hit.url) {
                    UrlClass::Skipped => {}
                    UrlClass::Homepage => {
                        if let Some(domain) = domain_of(&hit.url) {
                            info!(%domain, %query, "website resolved");
                            return Ok(Some(ResolvedWebsite {
                                domain,
                                url: hit.url,
                                is_homepage: true,
                            }));
                        }
                    }
                    UrlClass::Subpage => {
                        if fallback.is_none() {
                            fallback = domain_of(&hit.url).map(|domain| ResolvedWebsite {
                                domain,
                                url: hit.url.clone(),
                                is_homepage: false,
                            });
                        }
                    }
                }
            }
        }

        match (fallback, last_error) {
            (Some(site), _) => {
                info!(domain = %site.domain, "website resolved from subpage fallback");
                Ok(Some(site))
            }
            (None, Some(e)) if !answered => Err(e),
            _ => {
                debug!("no website found");
                Ok(None)
            }
        }
    }
}

/// The three queries, most specific first.
pub fn website_queries(name: &str, keywords: &str) -> Vec<String> {
    let keywords = keywords.trim();
    let first = if keywords.is_empty() {
        format!("\"{name}\" official website")
    } else {
        format!("\"{name}\" {keywords} official website")
    };
    vec![first, format!("\"{name}\" website"), name.to_string()]
}

fn clean_name(name: &str) -> String {
    name.replace('"', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn known_website(raw: &str) -> Option<ResolvedWebsite> {
    let domain = normalize_website(raw)?;
    Some(ResolvedWebsite {
        url: format!("https://{domain}/"),
        domain,
        is_homepage: true,
    })
}
