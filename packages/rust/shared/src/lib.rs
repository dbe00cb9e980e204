//! Shared types, error model, and configuration for Prospector.
//!
//! This crate is the foundation depended on by all other Prospector crates.
//! It provides:
//! - [`ProspectorError`] — the unified error type
//! - Domain types ([`CompanyRecord`], [`ResolvedWebsite`], [`DecisionMaker`], [`RunId`], ...)
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CacheConfig, DefaultsConfig, EmailFinderConfig, MIN_PERSON_CONFIDENCE,
    PipelineConfig, RateLimitConfig, RetryConfig, SearchBackend, SearchConfig, ValidatorConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{ProspectorError, Result};
pub use types::{
    CompanyRecord, DecisionMaker, EmailCandidate, EmailLookup, ExtractedContact, LookupStatus,
    NamePattern, PersonProfile, ResolvedWebsite, RunId, SearchHit, dedup_key,
};
