//! Content-quality screen applied to every candidate update.
//!
//! The filter is a pure predicate over one record plus the sent-history set:
//! running it twice over the same input yields the same survivors.

pub mod lexicon;

use std::collections::HashSet;

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use self::lexicon::{
    GENERIC_PAGES, JUNK_FRAGMENTS, JUNK_WORDS, NON_CONTENT_PATH_SEGMENTS, PhraseSet, RECRUITMENT,
    ROUTINE_FILING_TITLES,
};
use super::config::QualityConfig;
use crate::store::{RawUpdate, models::normalize_sector};
use crate::util::text::{
    alphabetic_count, contains_phone_fragment, has_alpha_run, normalize_text, word_uniqueness,
};

const MIN_HEADLINE_CHARS: usize = 15;
const MIN_HEADLINE_ALPHA: usize = 10;
const MIN_UNIQUENESS_RATIO: f64 = 0.4;
const UNIQUENESS_MIN_WORDS: usize = 5;
const MIN_SUMMARY_CHARS: usize = 20;
const RESTATEMENT_MARGIN: usize = 30;
const SUBSTANTIVE_FEED_CHARS: usize = 40;
const SUBSTANTIVE_AI_MARGIN: usize = 80;
const ECHO_PREFIX_CHARS: usize = 30;

/// Why a record was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    RecentlySent,
    OutsideFinancialScope,
    Recruitment,
    GenericPage,
    Junk,
    ThinHeadline,
    RepetitiveSummary,
    HeadlineRestated,
    NoSubstantiveSummary,
    RoutineFiling,
}

impl RejectReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RecentlySent => "recently_sent",
            Self::OutsideFinancialScope => "outside_financial_scope",
            Self::Recruitment => "recruitment",
            Self::GenericPage => "generic_page",
            Self::Junk => "junk",
            Self::ThinHeadline => "thin_headline",
            Self::RepetitiveSummary => "repetitive_summary",
            Self::HeadlineRestated => "headline_restated",
            Self::NoSubstantiveSummary => "no_substantive_summary",
            Self::RoutineFiling => "routine_filing",
        }
    }
}

/// A record that passed the quality screen.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredUpdate(RawUpdate);

impl FilteredUpdate {
    #[must_use]
    pub fn into_inner(self) -> RawUpdate {
        self.0
    }
}

impl std::ops::Deref for FilteredUpdate {
    type Target = RawUpdate;

    fn deref(&self) -> &RawUpdate {
        &self.0
    }
}

impl std::ops::DerefMut for FilteredUpdate {
    fn deref_mut(&mut self) -> &mut RawUpdate {
        &mut self.0
    }
}

/// Survivors plus a per-reason tally of rejections.
#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub survivors: Vec<FilteredUpdate>,
    pub rejected: FxHashMap<RejectReason, usize>,
}

impl FilterOutcome {
    #[must_use]
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

struct FinancialScope {
    authorities: PhraseSet,
    sectors: HashSet<String>,
    keywords: PhraseSet,
}

pub struct QualityFilter<'a> {
    history: &'a HashSet<String>,
    ignore_history: bool,
    financial: Option<FinancialScope>,
}

impl<'a> QualityFilter<'a> {
    /// Build the filter for one run.
    ///
    /// # Errors
    /// Returns an error when an allow-list matcher cannot be built.
    pub fn new(
        config: &QualityConfig,
        history: &'a HashSet<String>,
        ignore_history: bool,
    ) -> Result<Self, aho_corasick::BuildError> {
        let financial = if config.financial_only {
            Some(FinancialScope {
                authorities: PhraseSet::new(&config.financial_authorities)?,
                sectors: config
                    .financial_sectors
                    .iter()
                    .map(|s| normalize_sector(s))
                    .filter(|s| !s.is_empty())
                    .collect(),
                keywords: PhraseSet::new(&config.financial_keywords)?,
            })
        } else {
            None
        };
        Ok(Self {
            history,
            ignore_history,
            financial,
        })
    }

    /// Screen a batch, keeping input order.
    #[must_use]
    pub fn apply(&self, updates: Vec<RawUpdate>) -> FilterOutcome {
        let mut outcome = FilterOutcome {
            survivors: Vec::with_capacity(updates.len()),
            rejected: FxHashMap::default(),
        };
        for update in updates {
            match self.check(&update) {
                Ok(()) => outcome.survivors.push(FilteredUpdate(update)),
                Err(reason) => {
                    debug!(
                        id = update.identity_key().unwrap_or("-"),
                        reason = reason.as_str(),
                        "rejected update"
                    );
                    *outcome.rejected.entry(reason).or_insert(0) += 1;
                }
            }
        }
        outcome
    }

    /// Screen a single record, wrapping it when it passes.
    ///
    /// # Errors
    /// Returns the [`RejectReason`] when the record fails the screen.
    pub fn admit(&self, update: RawUpdate) -> Result<FilteredUpdate, RejectReason> {
        self.check(&update).map(|()| FilteredUpdate(update))
    }

    /// Check one record.
    ///
    /// # Errors
    /// Returns the first [`RejectReason`] that applies.
    pub fn check(&self, update: &RawUpdate) -> Result<(), RejectReason> {
        if !self.ignore_history
            && update
                .identity_key()
                .is_some_and(|id| self.history.contains(id))
        {
            return Err(RejectReason::RecentlySent);
        }

        let headline = update.headline.trim();
        let headline_norm = normalize_text(headline);

        if let Some(scope) = &self.financial {
            if !scope.admits(update) {
                return Err(RejectReason::OutsideFinancialScope);
            }
        }

        let category_norm = update
            .category
            .as_deref()
            .map(normalize_text)
            .unwrap_or_default();
        if RECRUITMENT.matches(&headline_norm) || RECRUITMENT.matches(&category_norm) {
            return Err(RejectReason::Recruitment);
        }

        if GENERIC_PAGES.matches(&headline_norm)
            || update.url.as_deref().is_some_and(is_non_content_url)
        {
            return Err(RejectReason::GenericPage);
        }

        if is_junk_headline(headline, &headline_norm) {
            return Err(RejectReason::Junk);
        }

        if headline.chars().count() < MIN_HEADLINE_CHARS
            || alphabetic_count(headline) < MIN_HEADLINE_ALPHA
        {
            return Err(RejectReason::ThinHeadline);
        }

        if let Some(summary) = update.best_summary() {
            let (ratio, words) = word_uniqueness(summary);
            if words > UNIQUENESS_MIN_WORDS && ratio < MIN_UNIQUENESS_RATIO {
                return Err(RejectReason::RepetitiveSummary);
            }
            if is_restatement(&headline_norm, summary) {
                return Err(RejectReason::HeadlineRestated);
            }
        }

        if !has_substantive_summary(update, headline, &headline_norm) {
            return Err(RejectReason::NoSubstantiveSummary);
        }

        if ROUTINE_FILING_TITLES.contains(&headline_norm.as_str()) {
            return Err(RejectReason::RoutineFiling);
        }

        Ok(())
    }
}

impl FinancialScope {
    fn admits(&self, update: &RawUpdate) -> bool {
        let authority = normalize_text(update.authority_name());
        if !authority.is_empty() && self.authorities.matches(&authority) {
            return true;
        }
        if update
            .sector_labels()
            .into_iter()
            .any(|label| self.sectors.contains(&normalize_sector(label)))
        {
            return true;
        }
        self.keywords
            .matches(&normalize_text(&update.combined_text()))
    }
}

fn is_non_content_url(url: &str) -> bool {
    let lowered = url.to_ascii_lowercase();
    let after_scheme = lowered
        .split_once("://")
        .map_or(lowered.as_str(), |(_, rest)| rest);
    let path = after_scheme
        .split_once('/')
        .map_or("", |(_, path)| path)
        .split(['?', '#'])
        .next()
        .unwrap_or("");
    path.split('/')
        .any(|segment| NON_CONTENT_PATH_SEGMENTS.contains(&segment))
}

fn is_junk_headline(headline: &str, headline_norm: &str) -> bool {
    let lowered = headline.to_lowercase();
    JUNK_WORDS.matches(headline_norm)
        || JUNK_FRAGMENTS.iter().any(|f| lowered.contains(f))
        || contains_phone_fragment(headline)
}

fn is_restatement(headline_norm: &str, summary: &str) -> bool {
    let trimmed = summary.trim();
    if trimmed.chars().count() < MIN_SUMMARY_CHARS || !has_alpha_run(trimmed, 3) {
        return true;
    }
    if headline_norm.is_empty() {
        return false;
    }
    let summary_norm = normalize_text(trimmed);
    if summary_norm == format!("{headline_norm} {headline_norm}")
        || summary_norm == format!("{headline_norm}{headline_norm}")
    {
        return true;
    }
    summary_norm.contains(headline_norm)
        && summary_norm.chars().count() < headline_norm.chars().count() + RESTATEMENT_MARGIN
}

fn has_substantive_summary(update: &RawUpdate, headline: &str, headline_norm: &str) -> bool {
    if update
        .feed_summary()
        .is_some_and(|s| s.chars().count() > SUBSTANTIVE_FEED_CHARS)
    {
        return true;
    }
    let Some(ai) = update.ai_summary.as_deref().map(str::trim) else {
        return false;
    };
    if ai.chars().count() <= headline.chars().count() + SUBSTANTIVE_AI_MARGIN {
        return false;
    }
    let echo_prefix: String = headline_norm.chars().take(ECHO_PREFIX_CHARS).collect();
    let echo_prefix = echo_prefix.trim_end();
    echo_prefix.is_empty() || !normalize_text(ai).starts_with(echo_prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn good() -> RawUpdate {
        RawUpdate {
            id: Some("u1".into()),
            headline: "FCA sets out new expectations for motor finance redress".into(),
            summary: Some(
                "The regulator outlined how firms should assess historic commission arrangements and compensate affected customers."
                    .into(),
            ),
            authority: Some("FCA".into()),
            url: Some("https://www.fca.org.uk/news/statements/motor-finance".into()),
            relevance_score: Some(85),
            ..RawUpdate::default()
        }
    }

    fn check(update: &RawUpdate) -> Result<(), RejectReason> {
        let history = HashSet::new();
        let config = QualityConfig::default();
        QualityFilter::new(&config, &history, false)
            .expect("filter")
            .check(update)
    }

    #[test]
    fn accepts_substantive_update() {
        assert_eq!(check(&good()), Ok(()));
    }

    #[test]
    fn rejects_recently_sent_unless_ignoring_history() {
        let history: HashSet<String> = ["u1".to_string()].into_iter().collect();
        let config = QualityConfig::default();
        let strict = QualityFilter::new(&config, &history, false).expect("filter");
        let relaxed = QualityFilter::new(&config, &history, true).expect("filter");

        assert_eq!(strict.check(&good()), Err(RejectReason::RecentlySent));
        assert_eq!(relaxed.check(&good()), Ok(()));
    }

    #[test]
    fn history_matches_url_when_id_missing() {
        let mut update = good();
        update.id = None;
        let history: HashSet<String> =
            ["https://www.fca.org.uk/news/statements/motor-finance".to_string()]
                .into_iter()
                .collect();
        let config = QualityConfig::default();
        let filter = QualityFilter::new(&config, &history, false).expect("filter");
        assert_eq!(filter.check(&update), Err(RejectReason::RecentlySent));
    }

    #[test]
    fn financial_scope_accepts_sector_or_keyword_matches() {
        let mut update = good();
        update.authority = Some("Ofcom".into());
        update.headline = "Ofcom publishes new telecoms switching guidance".into();
        update.summary = Some(
            "Providers must make switching simpler for customers moving between broadband networks."
                .into(),
        );
        assert_eq!(check(&update), Err(RejectReason::OutsideFinancialScope));

        update.sectors = vec!["Payments".into()];
        assert_eq!(check(&update), Ok(()));

        update.sectors.clear();
        update.summary = Some(
            "Providers must make switching simpler, including for customers paying by direct debit from their bank."
                .into(),
        );
        assert_eq!(check(&update), Ok(()));
    }

    #[test]
    fn financial_scope_can_be_disabled() {
        let mut update = good();
        update.authority = Some("Ofcom".into());
        update.headline = "Ofcom publishes new telecoms switching guidance".into();
        update.summary = Some(
            "Providers must make switching simpler for customers moving between broadband networks."
                .into(),
        );
        let history = HashSet::new();
        let config = QualityConfig {
            financial_only: false,
            ..QualityConfig::default()
        };
        let filter = QualityFilter::new(&config, &history, false).expect("filter");
        assert_eq!(filter.check(&update), Ok(()));
    }

    #[rstest]
    #[case("FCA vacancy: Senior Associate, Supervision", RejectReason::Recruitment)]
    #[case("FCA privacy policy and data protection notice", RejectReason::GenericPage)]
    #[case("FCA notice undefined undefined update", RejectReason::Junk)]
    #[case("FCA helpline 0800 111 6768 opening hours", RejectReason::Junk)]
    #[case("FCA update", RejectReason::ThinHeadline)]
    #[case("FCA 2024/25 12-34 56", RejectReason::ThinHeadline)]
    fn rejects_low_value_headlines(#[case] headline: &str, #[case] reason: RejectReason) {
        let mut update = good();
        update.headline = headline.into();
        assert_eq!(check(&update), Err(reason));
    }

    #[test]
    fn recruitment_category_is_rejected() {
        let mut update = good();
        update.category = Some("Careers at the FCA".into());
        assert_eq!(check(&update), Err(RejectReason::Recruitment));
    }

    #[rstest]
    #[case("https://www.fca.org.uk/contact")]
    #[case("https://www.fca.org.uk/careers/graduates?ref=1")]
    #[case("https://www.bankofengland.co.uk/sitemap")]
    fn rejects_non_content_urls(#[case] url: &str) {
        let mut update = good();
        update.url = Some(url.into());
        assert_eq!(check(&update), Err(RejectReason::GenericPage));
    }

    #[test]
    fn rejects_repetitive_summary() {
        let mut update = good();
        update.summary = Some("rates rates rates rates rates rates rates rates rise".into());
        assert_eq!(check(&update), Err(RejectReason::RepetitiveSummary));
    }

    #[test]
    fn rejects_summary_that_repeats_headline_twice() {
        let mut update = good();
        update.summary = Some(format!("{} {}", update.headline, update.headline));
        assert_eq!(check(&update), Err(RejectReason::HeadlineRestated));
    }

    #[test]
    fn rejects_summary_that_barely_extends_headline() {
        let mut update = good();
        update.summary = Some(format!("{} - read more.", update.headline));
        assert_eq!(check(&update), Err(RejectReason::HeadlineRestated));
    }

    #[test]
    fn rejects_missing_or_echoing_summaries() {
        let mut update = good();
        update.summary = None;
        assert_eq!(check(&update), Err(RejectReason::NoSubstantiveSummary));

        update.ai_summary = Some(format!(
            "{} and this AI summary keeps going with enough extra words to pass the length bar easily today.",
            update.headline
        ));
        assert_eq!(check(&update), Err(RejectReason::NoSubstantiveSummary));

        update.ai_summary = Some(
            "Firms that sold car finance with discretionary commission must review complaints, \
             contact affected customers and set aside provisions for redress over the coming year."
                .into(),
        );
        assert_eq!(check(&update), Ok(()));
    }

    #[test]
    fn rejects_routine_corporate_filings() {
        let mut update = good();
        update.headline = "Total Voting Rights".into();
        update.authority = Some("London Stock Exchange".into());
        assert_eq!(check(&update), Err(RejectReason::RoutineFiling));
    }

    #[test]
    fn filtering_is_idempotent() {
        let mut repeated = good();
        repeated.id = Some("u2".into());
        repeated.summary = Some(format!("{} {}", repeated.headline, repeated.headline));
        let history = HashSet::new();
        let config = QualityConfig::default();
        let filter = QualityFilter::new(&config, &history, false).expect("filter");

        let first = filter.apply(vec![good(), repeated]);
        let survivors: Vec<RawUpdate> = first
            .survivors
            .iter()
            .cloned()
            .map(FilteredUpdate::into_inner)
            .collect();
        let second = filter.apply(survivors.clone());

        assert_eq!(first.rejected_total(), 1);
        assert_eq!(second.rejected_total(), 0);
        assert_eq!(
            second
                .survivors
                .into_iter()
                .map(FilteredUpdate::into_inner)
                .collect::<Vec<_>>(),
            survivors
        );
    }
}
