//! Text heuristics used by the discovery pipeline.
//!
//! Everything here is pure and synchronous:
//! - [`names`] — candidate person names from email local-parts
//! - [`urls`] — search-result URL filtering and homepage classification
//! - [`profile`] — profile-URL shape checks and name/title parsing from hits
//! - [`roles`] — decision-maker title validation
//! - [`rules`] — ordered keyword rule tables (role context, industry)

pub mod names;
pub mod profile;
pub mod roles;
pub mod rules;
pub mod urls;

pub use names::extract_contact;
pub use profile::{is_profile_url, names_match, parse_profile};
pub use roles::{RejectReason, RoleProfile, TitleValidator, Verdict};
pub use rules::{IndustryClassifier, RuleTable};
pub use urls::{UrlClass, classify_url, domain_of, normalize_website};
