//! Application configuration for Prospector.
//!
//! User config lives at `~/.prospector/prospector.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ProspectorError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "prospector.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".prospector";

/// Person Resolver is never invoked below this extractor confidence.
pub const MIN_PERSON_CONFIDENCE: f32 = 0.80;

/// Hard ceiling on addresses kept per domain.
const MAX_EMAILS_CEILING: usize = 20;

// ---------------------------------------------------------------------------
// Config structs (matching prospector.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pipeline defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Shared provider call spacing.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Provider retry policy.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Web search backend.
    #[serde(default)]
    pub search: SearchConfig,

    /// Bulk email discovery backend.
    #[serde(default)]
    pub email_finder: EmailFinderConfig,

    /// Persistent cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Additional decision-maker keywords.
    #[serde(default)]
    pub validator: ValidatorConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Companies processed concurrently (outer pool width).
    #[serde(default = "default_concurrency")]
    pub company_concurrency: usize,

    /// Emails processed concurrently per company (inner pool width).
    #[serde(default = "default_concurrency")]
    pub email_concurrency: usize,

    /// Maximum addresses kept per domain.
    #[serde(default = "default_max_emails")]
    pub max_emails_per_domain: usize,

    /// Minimum extractor confidence before a profile search is attempted.
    #[serde(default = "default_min_confidence")]
    pub min_person_confidence: f32,

    /// Overall run deadline in seconds; 0 disables it.
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            company_concurrency: default_concurrency(),
            email_concurrency: default_concurrency(),
            max_emails_per_domain: default_max_emails(),
            min_person_confidence: default_min_confidence(),
            run_timeout_secs: default_run_timeout(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}
fn default_max_emails() -> usize {
    MAX_EMAILS_CEILING
}
fn default_min_confidence() -> f32 {
    MIN_PERSON_CONFIDENCE
}
fn default_run_timeout() -> u64 {
    3600
}

/// `[rate_limit]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Minimum ms between any two provider calls, across all workers.
    #[serde(default = "default_min_interval")]
    pub min_interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval(),
        }
    }
}

fn default_min_interval() -> u64 {
    500
}

/// `[retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per provider call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles each attempt.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff() -> u64 {
    1000
}

/// Which web search backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchBackend {
    /// JSON search API (requires an API key).
    #[default]
    Serper,
    /// Keyless HTML results page.
    Html,
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub backend: SearchBackend,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Override the backend's base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Results requested per website query.
    #[serde(default = "default_website_results")]
    pub website_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: SearchBackend::default(),
            api_key_env: default_search_key_env(),
            base_url: None,
            website_results: default_website_results(),
        }
    }
}

fn default_search_key_env() -> String {
    "SERPER_API_KEY".into()
}
fn default_website_results() -> usize {
    10
}

/// `[email_finder]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailFinderConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_email_key_env")]
    pub api_key_env: String,

    /// Override the backend's base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for EmailFinderConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_email_key_env(),
            base_url: None,
        }
    }
}

fn default_email_key_env() -> String {
    "ANYMAILFINDER_API_KEY".into()
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Persist website/email lookups across runs.
    #[serde(default)]
    pub persist: bool,

    /// Cache database path (defaults to `~/.prospector/cache.db`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Persisted entries older than this are ignored.
    #[serde(default = "default_ttl_days")]
    pub ttl_days: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            persist: false,
            path: None,
            ttl_days: default_ttl_days(),
        }
    }
}

fn default_ttl_days() -> u32 {
    30
}

/// `[validator]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Extra title keywords that mark a decision-maker.
    #[serde(default)]
    pub extra_include: Vec<String>,

    /// Extra title keywords that disqualify a title.
    #[serde(default)]
    pub extra_exclude: Vec<String>,
}

impl AppConfig {
    /// Reject values the pipeline cannot honor.
    pub fn validate(&self) -> Result<()> {
        let d = &self.defaults;
        if d.company_concurrency == 0 || d.email_concurrency == 0 {
            return Err(ProspectorError::config("concurrency widths must be at least 1"));
        }
        if d.max_emails_per_domain == 0 || d.max_emails_per_domain > MAX_EMAILS_CEILING {
            return Err(ProspectorError::config(format!(
                "max_emails_per_domain must be between 1 and {MAX_EMAILS_CEILING}"
            )));
        }
        if !(MIN_PERSON_CONFIDENCE..=1.0).contains(&d.min_person_confidence) {
            return Err(ProspectorError::config(format!(
                "min_person_confidence must be between {MIN_PERSON_CONFIDENCE} and 1.0"
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(ProspectorError::config("retry.max_attempts must be at least 1"));
        }
        if self.search.website_results == 0 {
            return Err(ProspectorError::config("search.website_results must be at least 1"));
        }
        Ok(())
    }

    /// Resolve the cache database path.
    pub fn cache_path(&self) -> Result<PathBuf> {
        match &self.cache.path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Ok(config_dir()?.join("cache.db")),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub company_concurrency: usize,
    pub email_concurrency: usize,
    pub max_emails_per_domain: usize,
    pub min_person_confidence: f32,
    /// `None` runs without a deadline.
    pub run_timeout: Option<Duration>,
    /// Minimum spacing between provider calls.
    pub min_call_interval: Duration,
    pub retry_max_attempts: u32,
    pub retry_initial_backoff: Duration,
    pub website_results: usize,
    pub cache_ttl_days: u32,
    pub extra_include: Vec<String>,
    pub extra_exclude: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        let timeout = config.defaults.run_timeout_secs;
        Self {
            company_concurrency: config.defaults.company_concurrency,
            email_concurrency: config.defaults.email_concurrency,
            max_emails_per_domain: config.defaults.max_emails_per_domain,
            min_person_confidence: config.defaults.min_person_confidence,
            run_timeout: (timeout > 0).then(|| Duration::from_secs(timeout)),
            min_call_interval: Duration::from_millis(config.rate_limit.min_interval_ms),
            retry_max_attempts: config.retry.max_attempts,
            retry_initial_backoff: Duration::from_millis(config.retry.initial_backoff_ms),
            website_results: config.search.website_results,
            cache_ttl_days: config.cache.ttl_days,
            extra_include: config.validator.extra_include.clone(),
            extra_exclude: config.validator.extra_exclude.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.prospector/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ProspectorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.prospector/prospector.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load and validate the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ProspectorError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        ProspectorError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ProspectorError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ProspectorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ProspectorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a provider API key from the env var named by the config.
pub fn resolve_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(ProspectorError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("company_concurrency"));
        assert!(toml_str.contains("SERPER_API_KEY"));
        assert!(toml_str.contains("ANYMAILFINDER_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.max_emails_per_domain, 20);
        assert_eq!(parsed.retry.max_attempts, 3);
        assert_eq!(parsed.search.backend, SearchBackend::Serper);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
company_concurrency = 8

[search]
backend = "html"

[validator]
extra_include = ["managing member"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.company_concurrency, 8);
        assert_eq!(config.defaults.email_concurrency, 4);
        assert_eq!(config.search.backend, SearchBackend::Html);
        assert_eq!(config.validator.extra_include, vec!["managing member"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn low_confidence_threshold_rejected() {
        let mut config = AppConfig::default();
        config.defaults.min_person_confidence = 0.6;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ProspectorError::Config { .. }));
        assert!(err.to_string().contains("min_person_confidence"));
    }

    #[test]
    fn email_cap_enforced() {
        let mut config = AppConfig::default();
        config.defaults.max_emails_per_domain = 50;
        assert!(config.validate().is_err());
    }

    #[test]
    fn pipeline_config_from_app_config() {
        let app = AppConfig::default();
        let pipeline = PipelineConfig::from(&app);
        assert_eq!(pipeline.company_concurrency, 4);
        assert_eq!(pipeline.email_concurrency, 4);
        assert_eq!(pipeline.min_call_interval, Duration::from_millis(500));
        assert_eq!(pipeline.run_timeout, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        let mut app = AppConfig::default();
        app.defaults.run_timeout_secs = 0;
        assert!(PipelineConfig::from(&app).run_timeout.is_none());
    }

    #[test]
    fn api_key_resolution() {
        // Use a unique env var name to avoid interfering with other tests
        let result = resolve_api_key("PROSPECTOR_TEST_NONEXISTENT_KEY_12345");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
