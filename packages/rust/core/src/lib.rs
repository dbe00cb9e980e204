//! Core pipeline orchestration and domain logic for Prospector.
//!
//! This crate ties together web search, bulk email lookup, name extraction,
//! profile resolution and title validation into one end-to-end run
//! ([`Pipeline::run`]).

pub mod cache;
pub mod dedup;
pub mod emails;
pub mod limiter;
pub mod person;
pub mod pipeline;
pub mod retry;
pub mod website;

#[cfg(test)]
mod testing;

pub use dedup::DedupSet;
pub use emails::{CompanyEmailFinder, candidates, normalize_emails};
pub use limiter::RateLimiter;
pub use person::{PersonResolver, person_queries};
pub use pipeline::{
    CompanyState, ContactSink, EmailState, NullSink, Pipeline, ProgressReporter, RunReport,
    RunStatus, RunSummary, SilentProgress,
};
pub use retry::RetryPolicy;
pub use website::{WebsiteResolver, website_queries};
