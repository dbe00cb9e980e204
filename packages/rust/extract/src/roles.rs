//! Decision-maker title validation.
//!
//! A title is accepted iff it contains at least one include keyword of the
//! selected [`RoleProfile`] and none of the exclude keywords. Matching is
//! case-insensitive substring matching, so `vp` also covers "SVP" and "EVP".
//! The C-suite acronyms `cto`, `cio`, `cro`, `coo` and `cmo` must start a
//! word so that `cto` does not fire inside "Director".

use crate::rules::{RuleTable, normalize};

/// Keywords every profile rejects.
const EXCLUDE: &[&str] = &[
    "assistant", "associate", "junior", "jr", "intern", "coordinator", "analyst", "trainee",
    "apprentice", "student", "former", "ex-", "retired", "volunteer", "receptionist",
    "representative", "specialist", "advisor to",
];

/// C-suite acronyms that also occur inside ordinary words
/// ("Dire*cto*r", "Mi*cro*soft", "*Coo*king").
const WORD_START: &[&str] = &["cto", "cio", "cro", "coo", "cmo"];

/// Generic C-suite and leadership titles.
const EXECUTIVE: &[&str] = &[
    "founder", "co-founder", "cofounder", "owner", "ceo", "chief", "president", "vp",
    "vice president", "director", "partner", "principal", "managing director", "head of",
    "general manager", "cfo", "coo", "cto", "cmo",
];

const TECHNICAL: &[&str] = &[
    "founder", "cto", "cio", "chief technology", "chief technical", "chief information",
    "chief product", "vp engineering", "vp of engineering", "vice president of engineering",
    "vp technology", "vp of technology", "head of engineering", "head of technology",
    "director of engineering", "engineering director", "it director", "director of it",
];

const SALES: &[&str] = &[
    "founder", "cro", "chief revenue", "chief sales", "chief commercial", "vp sales",
    "vp of sales", "vice president of sales", "head of sales", "sales director",
    "director of sales", "business development director", "director of business development",
];

const MARKETING: &[&str] = &[
    "founder", "cmo", "chief marketing", "chief growth", "vp marketing", "vp of marketing",
    "vice president of marketing", "head of marketing", "head of growth", "marketing director",
    "director of marketing",
];

const FINANCE: &[&str] = &[
    "founder", "cfo", "chief financial", "vp finance", "vp of finance",
    "vice president of finance", "head of finance", "finance director", "director of finance",
    "financial controller", "controller", "treasurer",
];

/// Which include keyword set applies, selected from the role context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoleProfile {
    #[default]
    Executive,
    Technical,
    Sales,
    Marketing,
    Finance,
}

impl RoleProfile {
    fn include(&self) -> &'static [&'static str] {
        match self {
            Self::Executive => EXECUTIVE,
            Self::Technical => TECHNICAL,
            Self::Sales => SALES,
            Self::Marketing => MARKETING,
            Self::Finance => FINANCE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Executive => "executive",
            Self::Technical => "technical",
            Self::Sales => "sales",
            Self::Marketing => "marketing",
            Self::Finance => "finance",
        }
    }
}

/// Outcome of validating one title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted { keyword: String },
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    EmptyTitle,
    Excluded { keyword: String },
    NoIncludeKeyword,
}

/// Validates resolved titles against include/exclude keyword sets.
#[derive(Debug, Clone)]
pub struct TitleValidator {
    context_rules: RuleTable<RoleProfile>,
    extra_include: Vec<String>,
    extra_exclude: Vec<String>,
}

impl Default for TitleValidator {
    fn default() -> Self {
        Self::new(&[], &[])
    }
}

impl TitleValidator {
    /// Build a validator; `extra_*` extend every profile's lists.
    pub fn new(extra_include: &[String], extra_exclude: &[String]) -> Self {
        let context_rules = RuleTable::new()
            .rule(
                &["engineer", "developer", "software", "devops", "programmer", "data scientist", "machine learning", "technical", "information technology", "qa", "sre"],
                RoleProfile::Technical,
            )
            .rule(
                &["sales", "account executive", "business development", "bdr", "sdr"],
                RoleProfile::Sales,
            )
            .rule(
                &["marketing", "growth", "seo", "content", "brand", "social media"],
                RoleProfile::Marketing,
            )
            .rule(
                &["finance", "accounting", "accountant", "bookkeep", "payroll", "controller", "audit"],
                RoleProfile::Finance,
            );

        Self {
            context_rules,
            extra_include: extra_include.iter().map(|k| k.to_lowercase()).collect(),
            extra_exclude: extra_exclude.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Profile for an optional role context; [`RoleProfile::Executive`] when none matches.
    pub fn profile_for(&self, role_context: Option<&str>) -> RoleProfile {
        role_context
            .and_then(|ctx| self.context_rules.classify(ctx))
            .copied()
            .unwrap_or_default()
    }

    /// Validate `title` under the profile selected by `role_context`.
    pub fn validate(&self, title: &str, role_context: Option<&str>) -> Verdict {
        self.validate_with(title, self.profile_for(role_context))
    }

    pub fn validate_with(&self, title: &str, profile: RoleProfile) -> Verdict {
        let title = title.trim();
        if title.is_empty() {
            return Verdict::Rejected(RejectReason::EmptyTitle);
        }

        let excluded = EXCLUDE
            .iter()
            .copied()
            .chain(self.extra_exclude.iter().map(String::as_str))
            .find(|kw| contains_keyword(title, kw));
        if let Some(keyword) = excluded {
            return Verdict::Rejected(RejectReason::Excluded {
                keyword: keyword.to_string(),
            });
        }

        profile
            .include()
            .iter()
            .copied()
            .chain(self.extra_include.iter().map(String::as_str))
            .find(|kw| contains_keyword(title, kw))
            .map(|kw| Verdict::Accepted {
                keyword: kw.to_string(),
            })
            .unwrap_or(Verdict::Rejected(RejectReason::NoIncludeKeyword))
    }

    pub fn is_decision_maker(&self, title: &str, role_context: Option<&str>) -> bool {
        self.validate(title, role_context).is_accepted()
    }
}

/// Case-insensitive substring match. Acronyms in [`WORD_START`] must begin a word.
fn contains_keyword(title: &str, keyword: &str) -> bool {
    if WORD_START.contains(&keyword) {
        format!(" {}", normalize(title)).contains(&format!(" {keyword}"))
    } else {
        title.to_lowercase().contains(keyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_leadership_titles() {
        let v = TitleValidator::default();
        for title in [
            "CFO",
            "Chief Executive Officer",
            "Co-Founder & CEO",
            "VP, Operations",
            "Vice President of Sales",
            "Managing Partner",
            "Director of Finance",
            "Owner",
        ] {
            assert!(v.is_decision_maker(title, None), "{title}");
        }
    }

    #[test]
    fn rejects_excluded_titles() {
        let v = TitleValidator::default();
        for title in [
            "Executive Assistant to the CEO",
            "Associate Director",
            "Junior Partner",
            "Marketing Intern",
            "Project Coordinator",
            "Financial Analyst",
            "Former CEO",
        ] {
            assert!(!v.is_decision_maker(title, None), "{title}");
        }
    }

    #[test]
    fn rejects_titles_without_keywords() {
        let v = TitleValidator::default();
        assert_eq!(
            v.validate("Software Engineer", None),
            Verdict::Rejected(RejectReason::NoIncludeKeyword)
        );
        assert_eq!(v.validate("   ", None), Verdict::Rejected(RejectReason::EmptyTitle));
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let v = TitleValidator::default();
        assert!(v.is_decision_maker("regional DIRECTOR, emea", None));
        assert!(v.is_decision_maker("Presidential Advisor & Vice-President", None));
    }

    #[test]
    fn prefixed_vice_president_titles_match() {
        let v = TitleValidator::default();
        for title in ["SVP, Operations", "EVP Sales", "SVP of Finance", "AVP Strategy"] {
            assert!(v.is_decision_maker(title, None), "{title}");
        }
        assert!(v.is_decision_maker("EVP of Sales", Some("Account Executive")));
        assert!(v.is_decision_maker("SVP of Finance", Some("Payroll")));
    }

    #[test]
    fn exclude_keywords_match_as_substrings() {
        let v = TitleValidator::default();
        assert_eq!(
            v.validate("Founder, Apex-Systems", None),
            Verdict::Rejected(RejectReason::Excluded {
                keyword: "ex-".into()
            })
        );
    }

    #[test]
    fn embedded_acronyms_do_not_match() {
        let v = TitleValidator::default();
        // "cto" inside "Director" must not route a sales director into technical.
        assert!(!v.is_decision_maker("Sales Director", Some("Senior Software Engineer")));
        assert!(v.is_decision_maker("CTO", Some("Senior Software Engineer")));
        assert!(v.is_decision_maker("Founder/CTO", Some("Backend developer")));
    }

    #[test]
    fn role_context_selects_profile() {
        let v = TitleValidator::default();
        assert_eq!(v.profile_for(Some("Senior Software Engineer")), RoleProfile::Technical);
        assert_eq!(v.profile_for(Some("Account Executive")), RoleProfile::Sales);
        assert_eq!(v.profile_for(Some("Growth Marketer")), RoleProfile::Marketing);
        assert_eq!(v.profile_for(Some("Staff Accountant")), RoleProfile::Finance);
        assert_eq!(v.profile_for(Some("Warehouse Associate")), RoleProfile::Executive);
        assert_eq!(v.profile_for(None), RoleProfile::Executive);

        // Technical postings route to engineering leadership, not generic C-suite.
        assert!(!v.is_decision_maker("Chief Operating Officer", Some("DevOps Engineer")));
        assert!(v.is_decision_maker("VP of Engineering", Some("DevOps Engineer")));
    }

    #[test]
    fn configured_keywords_extend_lists() {
        let v = TitleValidator::new(&["Managing Member".into()], &["interim".into()]);
        assert!(v.is_decision_maker("Managing Member", None));
        assert!(!v.is_decision_maker("Interim CEO", None));
    }

    #[test]
    fn accepted_verdict_reports_keyword() {
        let v = TitleValidator::default();
        assert_eq!(
            v.validate("CFO", None),
            Verdict::Accepted {
                keyword: "cfo".into()
            }
        );
    }
}
