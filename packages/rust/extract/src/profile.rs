//! Profile search-hit parsing.
//!
//! Profile hits come back from the search backend titled like
//! `Jane Doe - Chief Financial Officer - Acme Co | LinkedIn`. The name is the
//! first segment; the title is the second, or the first snippet fragment
//! phrased as "<title> at <company>".

use std::sync::LazyLock;

use prospector_shared::{PersonProfile, SearchHit};
use regex::Regex;

static PROFILE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://([a-z]{2,3}\.)?(www\.)?linkedin\.com/in/[^/?#]+")
        .expect("profile url regex")
});

const TITLE_SEPARATORS: &[&str] = &[" - ", " – ", " — "];

/// Whether `url` points at an individual profile page.
pub fn is_profile_url(url: &str) -> bool {
    PROFILE_URL_RE.is_match(url.trim())
}

/// Name and title from a profile search hit. `None` when the hit is not a
/// profile page or carries no usable name.
pub fn parse_profile(hit: &SearchHit) -> Option<PersonProfile> {
    if !is_profile_url(&hit.url) {
        return None;
    }

    let head = hit.title.split(" | ").next().unwrap_or_default();
    let head = strip_suffix_ci(head.trim(), "linkedin");
    let segments = split_segments(head);

    let full_name = segments.first().map(|s| clean_name(s))?;
    if full_name.is_empty() {
        return None;
    }

    let title = segments
        .get(1)
        .map(|s| title_before_company(s))
        .filter(|t| !t.is_empty())
        .or_else(|| title_from_snippet(&hit.snippet))
        .unwrap_or_default();

    Some(PersonProfile {
        full_name,
        title,
        profile_url: hit.url.trim().to_string(),
    })
}

/// Whether a resolved display name carries the candidate's surname.
///
/// The surname is the candidate's last word (its only word for single-token
/// names); a shared first name alone never matches.
pub fn names_match(candidate: &str, display_name: &str) -> bool {
    let Some(surname) = candidate.split_whitespace().last() else {
        return false;
    };
    let seen = name_tokens(display_name);
    name_tokens(surname).iter().any(|t| seen.contains(t))
}

fn name_tokens(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphabetic())
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

fn split_segments(head: &str) -> Vec<String> {
    let mut segments = vec![head.to_string()];
    for sep in TITLE_SEPARATORS {
        segments = segments
            .iter()
            .flat_map(|s| s.split(sep).map(str::to_string).collect::<Vec<_>>())
            .collect();
    }
    segments
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Trailing `- LinkedIn` style branding, case-insensitive.
fn strip_suffix_ci<'a>(s: &'a str, brand: &str) -> &'a str {
    let lower = s.to_lowercase();
    if !lower.ends_with(brand) {
        return s;
    }
    let cut = s.len() - brand.len();
    if !s.is_char_boundary(cut) {
        return s;
    }
    s[..cut].trim_end_matches([' ', '-', '–', '—', '|']).trim_end()
}

/// Drop credentials after a comma (`Jane Doe, CPA`) and parenthesized notes.
fn clean_name(segment: &str) -> String {
    let name = segment.split(',').next().unwrap_or_default();
    let name = name.split('(').next().unwrap_or_default();
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn title_before_company(segment: &str) -> String {
    let title = match segment.find(" at ") {
        Some(idx) => &segment[..idx],
        None => segment,
    };
    title.trim().to_string()
}

fn title_from_snippet(snippet: &str) -> Option<String> {
    snippet
        .split(" · ")
        .flat_map(|part| part.split(". "))
        .find(|fragment| fragment.contains(" at "))
        .map(title_before_company)
        .filter(|t| !t.is_empty())
}
