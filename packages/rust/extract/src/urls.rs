//! Search-result URL filtering for website resolution.
//!
//! A result URL is either skipped outright (social networks, directories,
//! documents, download areas), a subpage (careers, about, news, ...), or
//! homepage-like (anything else on a company host).

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Hosts that never represent a company's own website.
const SKIP_HOSTS: &[&str] = &[
    "linkedin.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "youtube.com",
    "tiktok.com",
    "pinterest.com",
    "reddit.com",
    "medium.com",
    "wikipedia.org",
    "crunchbase.com",
    "glassdoor.com",
    "glassdoor.ca",
    "indeed.com",
    "clutch.co",
    "yelp.com",
    "yelp.ca",
    "bloomberg.com",
    "zoominfo.com",
    "dnb.com",
    "bbb.org",
    "yellowpages.com",
    "yellowpages.ca",
    "google.com",
    "maps.google.com",
    "apple.com",
    "amazon.com",
];

/// Path markers of content deeper than a homepage.
const SUBPAGE_MARKERS: &[&str] = &[
    "/careers", "/career", "/jobs", "/about", "/news", "/press", "/blog", "/contact", "/team",
    "/events", "/media", "/investors", "/insights", "/article", "/stories", "/resources",
];

/// Document files and download/notice directories.
static SKIP_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\.(pdf|docx?|xlsx?|pptx?|zip)$)|(/(downloads?|notices?|documents?|uploads|wp-content|files|assets)(/|$))",
    )
    .expect("skip path regex")
});

/// Classification of a single search-result URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlClass {
    /// Never usable as a company website.
    Skipped,
    /// Root-ish page on a company host.
    Homepage,
    /// Deeper content page on a company host; fallback only.
    Subpage,
}

/// Classify a result URL.
pub fn classify_url(raw: &str) -> UrlClass {
    let Ok(url) = Url::parse(raw.trim()) else {
        return UrlClass::Skipped;
    };
    if url.scheme() != "http" && url.scheme() != "https" {
        return UrlClass::Skipped;
    }
    let Some(host) = url.host_str().map(str::to_lowercase) else {
        return UrlClass::Skipped;
    };
    if host.parse::<std::net::IpAddr>().is_ok() || is_skipped_host(&host) {
        return UrlClass::Skipped;
    }

    let path = url.path().to_lowercase();
    if SKIP_PATH_RE.is_match(&path) {
        return UrlClass::Skipped;
    }
    if SUBPAGE_MARKERS.iter().any(|m| path.contains(m)) {
        return UrlClass::Subpage;
    }
    UrlClass::Homepage
}

fn is_skipped_host(host: &str) -> bool {
    SKIP_HOSTS
        .iter()
        .any(|skip| host == *skip || host.ends_with(&format!(".{skip}")))
}

/// Bare, lowercased host of a URL with any leading `www.` removed.
pub fn domain_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    (!host.is_empty()).then(|| host.to_string())
}

/// Domain of a website string as supplied by an upstream source,
/// which may lack a scheme (`acme.com`, `www.acme.com/`).
pub fn normalize_website(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains("://") {
        domain_of(trimmed)
    } else {
        domain_of(&format!("https://{trimmed}"))
    }
}
