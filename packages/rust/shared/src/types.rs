//! Core domain types for the decision-maker discovery pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for pipeline run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// CompanyRecord
// ---------------------------------------------------------------------------

/// A raw company as supplied by an upstream source. Read-only to the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyRecord {
    /// Company display name.
    pub name: String,
    /// City / region, used to disambiguate common names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Industry label from the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    /// Any other free-text context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    /// Website already known to the source; skips website resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Category of the originating job posting, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_context: Option<String>,
}

impl CompanyRecord {
    /// Create a record with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Disambiguation keywords: location, industry and free keywords joined by spaces.
    pub fn context_keywords(&self) -> String {
        [&self.location, &self.industry, &self.keywords]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ---------------------------------------------------------------------------
// Resolution outputs
// ---------------------------------------------------------------------------

/// The canonical website found for a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedWebsite {
    /// Bare host, lowercased, without `www.`.
    pub domain: String,
    /// The URL that produced this domain.
    pub url: String,
    /// `false` when this is a subpage fallback.
    pub is_homepage: bool,
}

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

/// Outcome status of a bulk email lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStatus {
    Found,
    NotFound,
}

impl LookupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::NotFound => "not_found",
        }
    }
}

/// Result of one bulk email discovery call for a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailLookup {
    pub domain: String,
    pub emails: Vec<String>,
    pub status: LookupStatus,
}

impl EmailLookup {
    /// Build a lookup, deriving the status from whether any emails were found.
    pub fn new(domain: impl Into<String>, emails: Vec<String>) -> Self {
        let status = if emails.is_empty() {
            LookupStatus::NotFound
        } else {
            LookupStatus::Found
        };
        Self {
            domain: domain.into(),
            emails,
            status,
        }
    }
}

/// An address discovered at a company domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailCandidate {
    pub address: String,
    pub source_domain: String,
}

/// Which local-part pattern produced an [`ExtractedContact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamePattern {
    Generic,
    Dotted,
    Separated,
    CamelCase,
    SingleToken,
    Unparseable,
}

/// A name guess derived purely from an email address.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedContact {
    /// Title-cased name, empty for generic or unparseable addresses.
    pub candidate_name: String,
    /// Heuristic score in `[0, 1]`.
    pub confidence: f32,
    pub is_generic: bool,
    pub pattern: NamePattern,
}

impl ExtractedContact {
    /// A generic mailbox such as `info@`.
    pub fn generic() -> Self {
        Self {
            candidate_name: String::new(),
            confidence: 0.0,
            is_generic: true,
            pattern: NamePattern::Generic,
        }
    }

    /// A local part with no usable name.
    pub fn unparseable() -> Self {
        Self {
            candidate_name: String::new(),
            confidence: 0.0,
            is_generic: false,
            pattern: NamePattern::Unparseable,
        }
    }
}

/// A professional-network profile. Name and title here supersede the extracted guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonProfile {
    pub full_name: String,
    pub title: String,
    pub profile_url: String,
}

// ---------------------------------------------------------------------------
// DecisionMaker
// ---------------------------------------------------------------------------

/// A validated decision-maker contact; the terminal output of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionMaker {
    pub company_name: String,
    pub full_name: String,
    pub title: String,
    pub email: String,
    pub profile_url: String,
    /// Company domain the email was discovered at.
    pub domain: String,
    /// Industry category from the company's context, if classified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    /// Extractor confidence of the originating email.
    pub confidence: f32,
    pub found_at: DateTime<Utc>,
}

impl DecisionMaker {
    /// The uniqueness key: case-insensitive (full_name, company_name).
    pub fn dedup_key(&self) -> (String, String) {
        dedup_key(&self.full_name, &self.company_name)
    }
}

/// Normalize a (full_name, company_name) pair for deduplication.
pub fn dedup_key(full_name: &str, company_name: &str) -> (String, String) {
    let norm = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    (norm(full_name), norm(company_name))
}
