//! Static lookup tables for the quality screen and the narrative.
//!
//! Phrases are stored in normalised form (see
//! [`crate::util::text::normalize_text`]) and matched on word boundaries.

use aho_corasick::{AhoCorasick, BuildError, MatchKind};
use once_cell::sync::Lazy;

use crate::util::text::normalize_text;

/// Word-boundary phrase matcher over normalised text.
#[derive(Debug, Clone)]
pub struct PhraseSet {
    phrases: Vec<String>,
    matcher: AhoCorasick,
}

impl PhraseSet {
    /// Build a matcher; phrases are normalised and blanks dropped.
    ///
    /// # Errors
    /// Returns an error when the automaton cannot be built.
    pub fn new<I, S>(phrases: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases: Vec<String> = phrases
            .into_iter()
            .map(|p| normalize_text(p.as_ref()))
            .filter(|p| !p.is_empty())
            .collect();
        let padded: Vec<String> = phrases.iter().map(|p| format!(" {p} ")).collect();
        let matcher = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostFirst)
            .build(&padded)?;
        Ok(Self { phrases, matcher })
    }

    /// First phrase found in an already normalised text.
    #[must_use]
    pub fn find_in(&self, normalized: &str) -> Option<&str> {
        let padded = format!(" {normalized} ");
        self.matcher
            .find(&padded)
            .map(|m| self.phrases[m.pattern().as_usize()].as_str())
    }

    #[must_use]
    pub fn matches(&self, normalized: &str) -> bool {
        self.find_in(normalized).is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

fn static_set(phrases: &[&str]) -> PhraseSet {
    PhraseSet::new(phrases).expect("static phrase table builds")
}

pub(crate) static RECRUITMENT: Lazy<PhraseSet> = Lazy::new(|| {
    static_set(&[
        "vacancy",
        "vacancies",
        "job opening",
        "job openings",
        "job advert",
        "we are hiring",
        "were hiring",
        "join our team",
        "careers at",
        "apply now",
        "recruitment",
        "recruiting",
        "graduate scheme",
        "internship",
        "internships",
        "secondment opportunity",
    ])
});

pub(crate) static GENERIC_PAGES: Lazy<PhraseSet> = Lazy::new(|| {
    static_set(&[
        "privacy policy",
        "privacy notice",
        "cookie policy",
        "cookie settings",
        "contact us",
        "sitemap",
        "site map",
        "terms of use",
        "terms and conditions",
        "accessibility statement",
        "about us",
        "page not found",
        "search results",
        "log in",
        "sign in",
        "subscribe to our newsletter",
        "home page",
    ])
});

/// URL path segments that never hold regulatory content.
pub(crate) const NON_CONTENT_PATH_SEGMENTS: &[&str] = &[
    "contact",
    "contact-us",
    "privacy",
    "privacy-policy",
    "cookies",
    "cookie-policy",
    "sitemap",
    "accessibility",
    "careers",
    "jobs",
    "vacancies",
    "search",
    "login",
];

/// Whole words that mark a scraped headline as junk.
pub(crate) static JUNK_WORDS: Lazy<PhraseSet> = Lazy::new(|| {
    static_set(&[
        "undefined",
        "null",
        "nan",
        "placeholder",
        "untitled",
        "lorem ipsum",
        "object object",
        "tbd",
    ])
});

/// Raw fragments (lower-case) that mark template or markup leakage.
pub(crate) const JUNK_FRAGMENTS: &[&str] = &["{{", "}}", "&nbsp;", "tel:", "call us on", "phone:"];

/// Corporate filing titles with no regulatory substance, normalised.
pub(crate) const ROUTINE_FILING_TITLES: &[&str] = &[
    "result of agm",
    "results of agm",
    "result of annual general meeting",
    "notice of agm",
    "total voting rights",
    "director resignation",
    "directorate change",
    "directorate changes",
    "transaction in own shares",
    "transactions in own shares",
    "holdings in company",
    "holding in company",
    "block listing return",
    "blocklisting interim review",
    "director pdmr shareholding",
    "form 83",
];

/// Recurring low-value items skipped by the domestic selection passes.
pub(crate) const RECURRING_LOW_VALUE_PREFIXES: &[&str] = &[
    "daily official list",
    "market notice",
    "weekly bulletin",
    "monthly statistics",
    "register update",
    "list of regulated",
];

/// Themes detected for the narrative, in reporting order.
pub(crate) const NARRATIVE_THEMES: &[&str] =
    &["enforcement", "consultation", "deadline", "guidance"];
