//! Candidate person names from email addresses.
//!
//! Tiers, evaluated in order:
//! 1. generic mailbox (`info@`, `sales@`, ...) → generic, stop
//! 2. `first.last` → 0.95
//! 3. `first_last` / `first-last` → 0.90
//! 4. `FirstLast` → 0.85
//! 5. single token of 3+ letters → 0.60
//!
//! Digits and other non-letter characters are stripped before matching.

use std::sync::LazyLock;

use prospector_shared::{ExtractedContact, NamePattern};
use regex::Regex;

pub const DOTTED_CONFIDENCE: f32 = 0.95;
pub const SEPARATED_CONFIDENCE: f32 = 0.90;
pub const CAMEL_CONFIDENCE: f32 = 0.85;
pub const SINGLE_TOKEN_CONFIDENCE: f32 = 0.60;

/// Local parts that name a function, not a person.
const GENERIC_LOCAL_PARTS: &[&str] = &[
    "info", "information", "contact", "contactus", "hello", "hi", "hey", "sales", "support",
    "help", "helpdesk", "admin", "administrator", "hr", "humanresources", "careers", "career",
    "jobs", "recruiting", "recruitment", "talent", "office", "team", "billing", "accounts",
    "accounting", "invoices", "finance", "marketing", "press", "media", "pr", "news",
    "newsletter", "enquiries", "enquiry", "inquiries", "inquiry", "webmaster", "postmaster",
    "hostmaster", "mail", "email", "service", "services", "customerservice", "customercare",
    "care", "booking", "bookings", "reservations", "reception", "general", "privacy", "legal",
    "compliance", "security", "abuse", "feedback", "orders", "order", "shop", "store",
    "partners", "partnerships", "events", "operations", "ops", "it", "tech", "dev", "web",
    "online", "main", "mailbox", "frontdesk", "welcome", "studio", "hq", "all", "staff",
];

/// Prefixes of automated senders.
const GENERIC_PREFIXES: &[&str] = &["noreply", "no-reply", "donotreply", "do-not-reply", "mailer-daemon"];

/// Two capitalized runs, e.g. `JohnDoe` or `johnDoe`.
static CAMEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][a-z]+)([A-Z][a-z]+)$").expect("camel case regex"));

/// Parse a candidate name out of an email address.
pub fn extract_contact(email: &str) -> ExtractedContact {
    let trimmed = email.trim();
    let local = trimmed.split_once('@').map_or(trimmed, |(local, _)| local);
    // Sub-addressing tags (`john+news@`) never carry name information.
    let local = local.split('+').next().unwrap_or(local);

    let lowered = local.to_lowercase();
    if GENERIC_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return ExtractedContact::generic();
    }

    let cleaned = clean_local_part(local);
    if cleaned.is_empty() {
        return ExtractedContact::unparseable();
    }
    if is_generic(&cleaned.to_lowercase()) {
        return ExtractedContact::generic();
    }

    if cleaned.contains('.') {
        return from_tokens(&cleaned, NamePattern::Dotted, DOTTED_CONFIDENCE);
    }
    if cleaned.contains(['_', '-']) {
        return from_tokens(&cleaned, NamePattern::Separated, SEPARATED_CONFIDENCE);
    }
    if let Some(caps) = CAMEL_RE.captures(&cleaned) {
        return contact(
            format!("{} {}", title_case(&caps[1]), title_case(&caps[2])),
            NamePattern::CamelCase,
            CAMEL_CONFIDENCE,
        );
    }
    single_token(&cleaned)
}

/// Keep letters and separators; drop digits and everything else, then trim stray separators.
fn clean_local_part(local: &str) -> String {
    let kept: String = local
        .chars()
        .filter(|c| c.is_alphabetic() || matches!(c, '.' | '_' | '-'))
        .collect();
    kept.trim_matches(|c| matches!(c, '.' | '_' | '-')).to_string()
}

fn is_generic(lowered: &str) -> bool {
    if GENERIC_LOCAL_PARTS.contains(&lowered) {
        return true;
    }
    let compact: String = lowered.chars().filter(|c| c.is_alphabetic()).collect();
    if GENERIC_LOCAL_PARTS.contains(&compact.as_str()) {
        return true;
    }
    // `sales.team`, `hr-office`: every piece is a function word.
    let tokens = split_tokens(lowered);
    tokens.len() > 1 && tokens.iter().all(|t| GENERIC_LOCAL_PARTS.contains(&t.as_str()))
}

fn split_tokens(s: &str) -> Vec<String> {
    s.split(['.', '_', '-'])
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Dotted local parts split on `.` only; an inner `-`/`_` stays inside a
/// compound token (`mary-ann.smith` → "Mary-Ann Smith").
fn name_tokens(cleaned: &str, pattern: NamePattern) -> Vec<String> {
    let separators: &[char] = if pattern == NamePattern::Dotted {
        &['.']
    } else {
        &['_', '-']
    };
    cleaned
        .split(separators)
        .map(|t| t.trim_matches(|c| matches!(c, '.' | '_' | '-')))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn letter_count(token: &str) -> usize {
    token.chars().filter(|c| c.is_alphabetic()).count()
}

fn from_tokens(cleaned: &str, pattern: NamePattern, confidence: f32) -> ExtractedContact {
    let mut tokens = name_tokens(cleaned, pattern);
    let mut confidence = confidence;

    // `john.m.doe`: drop middle initials, at camel-case confidence since the
    // name no longer maps one-to-one onto the local part.
    if tokens.len() > 2 {
        let last = tokens.len() - 1;
        let kept: Vec<String> = tokens
            .iter()
            .enumerate()
            .filter(|(i, t)| *i == 0 || *i == last || letter_count(t) > 1)
            .map(|(_, t)| t.clone())
            .collect();
        if kept.len() != 2 {
            return ExtractedContact::unparseable();
        }
        tokens = kept;
        confidence = confidence.min(CAMEL_CONFIDENCE);
    }

    match tokens.as_slice() {
        [first, last] if letter_count(first) >= 2 && letter_count(last) >= 2 => contact(
            format!("{} {}", title_case_compound(first), title_case_compound(last)),
            pattern,
            confidence,
        ),
        // `j.doe`: an initial plus a surname is only a weak single-token guess.
        [first, last] => {
            let longest = if letter_count(first) >= letter_count(last) {
                first
            } else {
                last
            };
            single_token(longest)
        }
        [only] => single_token(only),
        _ => ExtractedContact::unparseable(),
    }
}

fn single_token(token: &str) -> ExtractedContact {
    let letters: String = token.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.chars().count() >= 3 {
        contact(title_case(&letters), NamePattern::SingleToken, SINGLE_TOKEN_CONFIDENCE)
    } else {
        ExtractedContact::unparseable()
    }
}

fn contact(candidate_name: String, pattern: NamePattern, confidence: f32) -> ExtractedContact {
    ExtractedContact {
        candidate_name,
        confidence,
        is_generic: false,
        pattern,
    }
}

fn title_case(token: &str) -> String {
    let lower = token.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Title-case each part of a possibly hyphenated token; `_` becomes `-`.
fn title_case_compound(token: &str) -> String {
    token
        .split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_first_last() {
        let c = extract_contact("john.doe@acme.com");
        assert_eq!(c.candidate_name, "John Doe");
        assert_eq!(c.confidence, DOTTED_CONFIDENCE);
        assert!(!c.is_generic);
        assert_eq!(c.pattern, NamePattern::Dotted);
    }

    #[test]
    fn underscore_and_hyphen() {
        let c = extract_contact("jane_smith@acme.com");
        assert_eq!(c.candidate_name, "Jane Smith");
        assert_eq!(c.confidence, SEPARATED_CONFIDENCE);

        let c = extract_contact("mary-ann@acme.com");
        assert_eq!(c.candidate_name, "Mary Ann");
        assert_eq!(c.pattern, NamePattern::Separated);
    }

    #[test]
    fn camel_case_split() {
        let c = extract_contact("JohnDoe@acme.com");
        assert_eq!(c.candidate_name, "John Doe");
        assert_eq!(c.confidence, CAMEL_CONFIDENCE);

        let c = extract_contact("johnDoe@acme.com");
        assert_eq!(c.candidate_name, "John Doe");
    }

    #[test]
    fn single_token_is_weak() {
        let c = extract_contact("johnny@acme.com");
        assert_eq!(c.candidate_name, "Johnny");
        assert_eq!(c.confidence, SINGLE_TOKEN_CONFIDENCE);
        assert_eq!(c.pattern, NamePattern::SingleToken);

        let c = extract_contact("jd@acme.com");
        assert_eq!(c.pattern, NamePattern::Unparseable);
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn digits_are_stripped() {
        let c = extract_contact("john.doe2@acme.com");
        assert_eq!(c.candidate_name, "John Doe");
        assert_eq!(c.confidence, DOTTED_CONFIDENCE);

        let c = extract_contact("jdoe1985@acme.com");
        assert_eq!(c.candidate_name, "Jdoe");
        assert_eq!(c.confidence, SINGLE_TOKEN_CONFIDENCE);
    }

    #[test]
    fn generic_mailboxes() {
        for email in [
            "info@acme.com",
            "support@acme.com",
            "sales@acme.com",
            "HR@acme.com",
            "careers@acme.com",
            "info2@acme.com",
            "customer.service@acme.com",
            "sales-team@acme.com",
            "noreply@acme.com",
            "no-reply-billing@acme.com",
        ] {
            let c = extract_contact(email);
            assert!(c.is_generic, "{email} should be generic");
            assert!(c.candidate_name.is_empty(), "{email} should have no name");
            assert_eq!(c.confidence, 0.0);
        }
    }

    #[test]
    fn initial_forms() {
        // Initial + surname falls to the weak tier.
        let c = extract_contact("j.doe@acme.com");
        assert_eq!(c.candidate_name, "Doe");
        assert_eq!(c.confidence, SINGLE_TOKEN_CONFIDENCE);

        // Middle initial dropped, confidence capped below the exact tiers.
        let c = extract_contact("john.m.doe@acme.com");
        assert_eq!(c.candidate_name, "John Doe");
        assert_eq!(c.confidence, CAMEL_CONFIDENCE);

        let c = extract_contact("a.b.c.d@acme.com");
        assert_eq!(c.pattern, NamePattern::Unparseable);
    }

    #[test]
    fn dotted_names_keep_hyphenated_parts() {
        let c = extract_contact("john.doe-smith@acme.com");
        assert_eq!(c.candidate_name, "John Doe-Smith");
        assert_eq!(c.confidence, DOTTED_CONFIDENCE);
        assert_eq!(c.pattern, NamePattern::Dotted);

        let c = extract_contact("mary-ann.smith@acme.com");
        assert_eq!(c.candidate_name, "Mary-Ann Smith");
        assert_eq!(c.confidence, DOTTED_CONFIDENCE);

        let c = extract_contact("mary_ann.smith@acme.com");
        assert_eq!(c.candidate_name, "Mary-Ann Smith");
    }

    #[test]
    fn plus_tag_dropped() {
        let c = extract_contact("john.doe+newsletter@acme.com");
        assert_eq!(c.candidate_name, "John Doe");
    }

    #[test]
    fn high_confidence_tokens_match_local_part() {
        for email in [
            "john.doe@acme.com",
            "Sarah.Connor@sky.net",
            "li_wei@acme.cn",
            "anna-maria@acme.de",
            "peter.parker99@acme.com",
        ] {
            let c = extract_contact(email);
            assert!(c.confidence >= 0.90, "{email}");
            let local = email.split('@').next().unwrap();
            let components: Vec<String> = local
                .split(['.', '_', '-'])
                .map(|t| t.chars().filter(|c| c.is_alphabetic()).collect::<String>().to_lowercase())
                .collect();
            let tokens: Vec<String> = c
                .candidate_name
                .split(' ')
                .map(|t| t.to_lowercase())
                .collect();
            assert_eq!(tokens, components, "{email}");
        }
    }

    #[test]
    fn missing_at_sign_treated_as_local_part() {
        let c = extract_contact("john.doe");
        assert_eq!(c.candidate_name, "John Doe");
    }
}
