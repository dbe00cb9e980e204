//! Candidate name + company → professional-network profile.

use std::sync::Arc;

use prospector_extract::{names_match, parse_profile};
use prospector_search::SearchProvider;
use prospector_shared::{PersonProfile, ProspectorError, Result};
use tracing::{debug, instrument, warn};

use crate::limiter::RateLimiter;
use crate::retry::RetryPolicy;

const PROFILE_SITE: &str = "site:linkedin.com/in";

pub struct PersonResolver {
    search: Arc<dyn SearchProvider>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl PersonResolver {
    pub fn new(search: Arc<dyn SearchProvider>, limiter: Arc<RateLimiter>, retry: RetryPolicy) -> Self {
        Self {
            search,
            limiter,
            retry,
        }
    }

    /// Find the profile of `candidate_name` at `company_name`.
    ///
    /// The first hit with a profile URL whose display name carries the
    /// candidate's surname is accepted.
    #[instrument(skip_all, fields(name = %candidate_name, company = %company_name, stage = "person"))]
    pub async fn resolve(
        &self,
        candidate_name: &str,
        company_name: &str,
    ) -> Result<Option<PersonProfile>> {
        let mut last_error: Option<ProspectorError> = None;
        let mut answered = false;

        for (query, cap) in person_queries(candidate_name, company_name) {
            let hits = match self
                .retry
                .run_limited(&self.limiter, "person search", || {
                    self.search.search(&query, cap)
                })
                .await
            {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(%query, error = %e, "person query failed");
                    last_error = Some(e);
                    continue;
                }
            };
            answered = true;

            let found = hits
                .iter()
                .take(cap)
                .filter_map(parse_profile)
                .find(|profile| names_match(candidate_name, &profile.full_name));
            if let Some(profile) = found {
                debug!(title = %profile.title, url = %profile.profile_url, "profile found");
                return Ok(Some(profile));
            }
        }

        match last_error {
            Some(e) if !answered => Err(e),
            _ => Ok(None),
        }
    }
}

/// Broadening query ladder with per-query result caps.
pub fn person_queries(name: &str, company: &str) -> [(String, usize); 3] {
    [
        (format!("{PROFILE_SITE} \"{name}\" \"{company}\""), 5),
        (format!("{PROFILE_SITE} \"{name}\" {company}"), 5),
        (format!("{PROFILE_SITE} {name} {company}"), 7),
    ]
}
