//! Ordered keyword rule tables for free-text classification.
//!
//! A [`RuleTable`] maps keyword sets to values and is evaluated top to
//! bottom; the first rule with any keyword present in the text wins.
//! Keywords match at word starts, so `engineer` matches "Engineering" but
//! `ai` would not match "retail".

/// One row of a rule table.
#[derive(Debug, Clone)]
pub struct Rule<T> {
    pub keywords: Vec<String>,
    pub value: T,
}

/// An ordered, first-match-wins keyword classifier.
#[derive(Debug, Clone)]
pub struct RuleTable<T> {
    rules: Vec<Rule<T>>,
}

impl<T> Default for RuleTable<T> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<T> RuleTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule; earlier rules take precedence.
    pub fn rule(mut self, keywords: &[&str], value: T) -> Self {
        self.rules.push(Rule {
            keywords: keywords.iter().map(|k| normalize(k)).collect(),
            value,
        });
        self
    }

    /// Value of the first rule whose keywords appear in `text`.
    pub fn classify(&self, text: &str) -> Option<&T> {
        let haystack = format!(" {} ", normalize(text));
        self.rules
            .iter()
            .find(|rule| {
                rule.keywords
                    .iter()
                    .any(|kw| haystack.contains(&format!(" {kw}")))
            })
            .map(|rule| &rule.value)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Lowercase and collapse every non-alphanumeric run into a single space.
pub(crate) fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Industry classification
// ---------------------------------------------------------------------------

/// Maps company context text (industry label, keywords) to an industry category.
#[derive(Debug, Clone)]
pub struct IndustryClassifier {
    table: RuleTable<&'static str>,
}

impl Default for IndustryClassifier {
    fn default() -> Self {
        let table = RuleTable::new()
            .rule(
                &["fintech", "finance", "financial", "bank", "investment", "wealth", "insurance", "accounting", "cpa"],
                "Finance",
            )
            .rule(
                &["software", "saas", "technology", "tech", "cloud", "cybersecurity", "machine learning", "artificial intelligence", "data", "it services"],
                "Technology",
            )
            .rule(
                &["health", "medical", "clinic", "pharma", "biotech", "dental", "hospital", "wellness"],
                "Healthcare",
            )
            .rule(
                &["real estate", "realty", "property", "properties", "construction", "architecture", "contractor"],
                "Real Estate & Construction",
            )
            .rule(
                &["marketing", "advertising", "agency", "seo", "branding", "media", "design studio"],
                "Marketing & Media",
            )
            .rule(
                &["law firm", "legal", "attorney", "lawyer", "solicitor"],
                "Legal",
            )
            .rule(
                &["manufacturing", "industrial", "factory", "machinery", "automotive", "fabrication"],
                "Manufacturing",
            )
            .rule(
                &["logistics", "shipping", "freight", "transportation", "supply chain", "trucking"],
                "Logistics",
            )
            .rule(
                &["retail", "ecommerce", "e commerce", "consumer goods", "fashion", "apparel"],
                "Retail",
            )
            .rule(
                &["education", "school", "university", "training", "edtech", "tutoring"],
                "Education",
            )
            .rule(
                &["restaurant", "hotel", "hospitality", "travel", "catering", "food"],
                "Hospitality",
            );
        Self { table }
    }
}

impl IndustryClassifier {
    pub fn classify(&self, text: &str) -> Option<&'static str> {
        self.table.classify(text).copied()
    }
}
