//! Quota-balanced selection of the digest.
//!
//! The deduplicated pool is split into a domestic block (region absent or
//! `UK`) and an international block, each filled by its own sequence of
//! passes. Every pass walks candidates in relevance order (stable, so input
//! order breaks ties) and skips anything already selected.
//!
//! ## Domestic passes
//!
//! 1. Priority authority, up to its own cap.
//! 2. Relevance at or above the high threshold, under all caps.
//! 3. Any relevance, under all caps.
//! 4. Any relevance, sector and treasury-family caps lifted.
//!
//! A final sweep drops items that breach a hard cap.
//!
//! ## International passes
//!
//! 1. Relevance at or above the international threshold, one per authority.
//! 2. Any relevance, one per authority.
//! 3. Any relevance, two per authority.

pub mod policy;
pub mod state;

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use self::policy::{AuthorityClass, AuthorityPolicy, hard_cap};
use self::state::{SelectionState, authority_key};
use super::config::SelectionConfig;
use super::quality::FilteredUpdate;
use super::quality::lexicon::RECURRING_LOW_VALUE_PREFIXES;
use crate::store::models::normalize_sector;
use crate::util::text::normalize_text;

/// Which caps a domestic pass enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CapMode {
    /// Only the priority authority's own cap.
    PriorityOnly,
    /// Named, treasury-family, per-authority and per-sector caps together.
    Strict,
    /// Priority cap, the two named single-authority caps and the
    /// per-authority cap; sector and treasury-family caps are lifted.
    Relaxed,
}

pub struct BalancedSelector<'a> {
    config: &'a SelectionConfig,
    policy: AuthorityPolicy,
}

impl<'a> BalancedSelector<'a> {
    #[must_use]
    pub fn new(config: &'a SelectionConfig) -> Self {
        Self {
            config,
            policy: AuthorityPolicy::new(config),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &AuthorityPolicy {
        &self.policy
    }

    /// Select the domestic and international blocks from a deduplicated pool.
    #[must_use]
    pub fn select(&self, pool: Vec<FilteredUpdate>) -> SelectionState {
        let (mut domestic, mut international): (Vec<_>, Vec<_>) =
            pool.into_iter().partition(|update| update.is_domestic());
        sort_by_relevance(&mut domestic);
        sort_by_relevance(&mut international);

        let mut state = SelectionState::default();
        self.select_domestic(&domestic, &mut state);
        self.select_international(&international, &mut state);

        info!(
            domestic_candidates = domestic.len(),
            international_candidates = international.len(),
            domestic_selected = state.domestic().len(),
            international_selected = state.international().len(),
            "balanced selection completed"
        );
        state
    }

    fn select_domestic(&self, candidates: &[FilteredUpdate], state: &mut SelectionState) {
        let high = self.config.domestic_high_threshold;

        self.domestic_pass(candidates, state, CapMode::PriorityOnly, |_, class| {
            class == AuthorityClass::Priority
        });
        self.domestic_pass(candidates, state, CapMode::Strict, |update, _| {
            update.score() >= high
        });
        self.domestic_pass(candidates, state, CapMode::Strict, |_, _| true);
        if state.domestic().len() < self.config.domestic_target {
            debug!(
                selected = state.domestic().len(),
                target = self.config.domestic_target,
                "domestic block short, relaxing sector and family caps"
            );
            self.domestic_pass(candidates, state, CapMode::Relaxed, |_, _| true);
        }

        self.enforce_hard_caps(state);
    }

    fn domestic_pass<F>(
        &self,
        candidates: &[FilteredUpdate],
        state: &mut SelectionState,
        mode: CapMode,
        eligible: F,
    ) where
        F: Fn(&FilteredUpdate, AuthorityClass) -> bool,
    {
        for candidate in candidates {
            if state.domestic().len() >= self.config.domestic_target {
                break;
            }
            if state.is_selected(candidate) || is_recurring_low_value(candidate) {
                continue;
            }
            let class = self.policy.classify(candidate.authority_name());
            if eligible(candidate, class) && self.admits(state, candidate, class, mode) {
                state.push_domestic(candidate.clone(), class);
            }
        }
    }

    fn admits(
        &self,
        state: &SelectionState,
        update: &FilteredUpdate,
        class: AuthorityClass,
        mode: CapMode,
    ) -> bool {
        if class == AuthorityClass::Priority
            && state.class_count(AuthorityClass::Priority) >= self.config.priority_cap
        {
            return false;
        }
        match mode {
            CapMode::PriorityOnly => true,
            CapMode::Relaxed => {
                if matches!(class, AuthorityClass::Secondary | AuthorityClass::Tertiary)
                    && state.class_count(class) >= 1
                {
                    return false;
                }
                class == AuthorityClass::Priority
                    || state.authority_count(&authority_key(update)) < self.config.authority_cap
            }
            CapMode::Strict => {
                if hard_cap(class, self.config).is_some_and(|cap| state.class_count(class) >= cap) {
                    return false;
                }
                if class == AuthorityClass::TreasuryFamily
                    && state.hm_other() >= self.config.treasury_family_cap
                {
                    return false;
                }
                if class != AuthorityClass::Priority
                    && state.authority_count(&authority_key(update)) >= self.config.authority_cap
                {
                    return false;
                }
                update.sector_labels().into_iter().all(|label| {
                    state.sector_count(&normalize_sector(label)) < self.config.sector_cap
                })
            }
        }
    }

    /// Drop domestic items that would push a hard-capped authority over its cap.
    fn enforce_hard_caps(&self, state: &mut SelectionState) {
        let mut seen: FxHashMap<AuthorityClass, usize> = FxHashMap::default();
        let assembled = state.take_domestic();
        let before = assembled.len();
        let kept: Vec<FilteredUpdate> = assembled
            .into_iter()
            .filter(|update| {
                let class = self.policy.classify(update.authority_name());
                let Some(cap) = hard_cap(class, self.config) else {
                    return true;
                };
                let count = seen.entry(class).or_insert(0);
                if *count >= cap {
                    return false;
                }
                *count += 1;
                true
            })
            .collect();
        if kept.len() < before {
            warn!(
                dropped = before - kept.len(),
                "hard authority caps removed domestic items"
            );
        }
        state.reset_domestic(kept, &self.policy);
    }

    fn select_international(&self, candidates: &[FilteredUpdate], state: &mut SelectionState) {
        let mut per_authority: FxHashMap<String, usize> = FxHashMap::default();
        let passes = [
            (
                Some(self.config.international_high_threshold),
                self.config.international_authority_cap,
            ),
            (None, self.config.international_authority_cap),
            (None, self.config.international_relaxed_authority_cap),
        ];

        for (min_score, cap) in passes {
            for candidate in candidates {
                if state.international().len() >= self.config.international_target {
                    return;
                }
                if state.is_selected(candidate)
                    || min_score.is_some_and(|min| candidate.score() < min)
                {
                    continue;
                }
                let key = authority_key(candidate);
                if per_authority.get(&key).copied().unwrap_or(0) >= cap {
                    continue;
                }
                let class = self.policy.classify(candidate.authority_name());
                if hard_cap(class, self.config)
                    .is_some_and(|hard| state.class_count(class) >= hard)
                {
                    continue;
                }
                *per_authority.entry(key).or_insert(0) += 1;
                state.push_international(candidate.clone(), class);
            }
        }
    }
}

/// Stable sort, highest relevance first.
fn sort_by_relevance(updates: &mut [FilteredUpdate]) {
    updates.sort_by(|a, b| b.score().cmp(&a.score()));
}

pub(crate) fn is_recurring_low_value(update: &FilteredUpdate) -> bool {
    let headline = normalize_text(&update.headline);
    RECURRING_LOW_VALUE_PREFIXES
        .iter()
        .any(|prefix| headline.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::pipeline::config::QualityConfig;
    use crate::pipeline::quality::QualityFilter;
    use crate::store::RawUpdate;

    fn screen(updates: Vec<RawUpdate>) -> Vec<FilteredUpdate> {
        let history = HashSet::new();
        let config = QualityConfig {
            financial_only: false,
            ..QualityConfig::default()
        };
        let outcome = QualityFilter::new(&config, &history, false)
            .expect("filter")
            .apply(updates);
        assert_eq!(outcome.rejected_total(), 0, "fixtures must pass the screen");
        outcome.survivors
    }

    fn update(id: &str, authority: &str, score: u8) -> RawUpdate {
        RawUpdate {
            id: Some(id.into()),
            headline: format!("{authority} announcement reference {id} on prudential rules"),
            summary: Some(format!(
                "Firms supervised by {authority} should review the changes described in notice {id}."
            )),
            authority: Some(authority.into()),
            relevance_score: Some(score),
            ..RawUpdate::default()
        }
    }

    fn international(id: &str, authority: &str, score: u8) -> RawUpdate {
        RawUpdate {
            region: Some("EU".into()),
            ..update(id, authority, score)
        }
    }

    fn ids(updates: &[FilteredUpdate]) -> Vec<&str> {
        updates.iter().filter_map(|u| u.id.as_deref()).collect()
    }

    #[test]
    fn generic_authority_cap_excludes_lowest_relevance() {
        let config = SelectionConfig::default();
        let selector = BalancedSelector::new(&config);
        let state = selector.select(screen(vec![
            update("a", "Payment Systems Regulator", 85),
            update("b", "Payment Systems Regulator", 86),
            update("c", "Payment Systems Regulator", 87),
        ]));

        assert_eq!(ids(state.domestic()), vec!["c", "b"]);
    }

    #[test]
    fn priority_authority_first_up_to_its_cap() {
        let config = SelectionConfig::default();
        let selector = BalancedSelector::new(&config);
        let mut pool: Vec<RawUpdate> =
            (0..5).map(|i| update(&format!("f{i}"), "FCA", 50)).collect();
        pool.push(update("pra", "PRA", 95));

        let state = selector.select(screen(pool));

        let selected = ids(state.domestic());
        assert_eq!(&selected[..3], &["f0", "f1", "f2"]);
        assert!(selected.contains(&"pra"));
        assert_eq!(
            selected.iter().filter(|id| id.starts_with('f')).count(),
            3,
            "priority cap holds in every pass"
        );
    }

    #[test]
    fn named_single_authorities_never_exceed_one() {
        let config = SelectionConfig::default();
        let selector = BalancedSelector::new(&config);
        let state = selector.select(screen(vec![
            update("boe1", "Bank of England", 95),
            update("boe2", "Bank of England", 94),
            update("tpr1", "The Pensions Regulator", 93),
            update("tpr2", "The Pensions Regulator", 92),
        ]));

        assert_eq!(ids(state.domestic()), vec!["boe1", "tpr1"]);
    }

    #[test]
    fn treasury_family_shares_a_combined_cap() {
        let config = SelectionConfig {
            domestic_target: 3,
            ..SelectionConfig::default()
        };
        let selector = BalancedSelector::new(&config);
        let state = selector.select(screen(vec![
            update("t1", "HM Treasury", 90),
            update("t2", "HMRC", 89),
            update("t3", "OFSI", 88),
            update("p1", "PRA", 60),
        ]));

        // Strict passes stop the family at two; PRA fills the third slot.
        assert_eq!(ids(state.domestic()), vec!["t1", "t2", "p1"]);
    }

    #[test]
    fn relaxed_pass_lifts_family_and_sector_caps_when_short() {
        let config = SelectionConfig {
            domestic_target: 5,
            sector_cap: 1,
            ..SelectionConfig::default()
        };
        let selector = BalancedSelector::new(&config);
        let mut pool = vec![
            update("t1", "HM Treasury", 90),
            update("t2", "HMRC", 89),
            update("t3", "OFSI", 88),
            update("s1", "Serious Fraud Office", 70),
            update("s2", "Payment Systems Regulator", 65),
        ];
        pool[3].sectors = vec!["Banking".into()];
        pool[4].sectors = vec!["Banking".into()];

        let state = selector.select(screen(pool));

        assert_eq!(ids(state.domestic()), vec!["t1", "t2", "s1", "t3", "s2"]);
    }

    #[test]
    fn relaxed_pass_keeps_per_authority_cap() {
        let config = SelectionConfig {
            domestic_target: 4,
            ..SelectionConfig::default()
        };
        let selector = BalancedSelector::new(&config);
        let state = selector.select(screen(vec![
            update("a", "PRA", 90),
            update("b", "PRA", 80),
            update("c", "PRA", 70),
            update("boe1", "Bank of England", 50),
            update("boe2", "Bank of England", 40),
        ]));

        assert_eq!(ids(state.domestic()), vec!["a", "b", "boe1"]);
    }

    #[test]
    fn sector_cap_limits_strict_passes() {
        let config = SelectionConfig {
            domestic_target: 10,
            sector_cap: 1,
            ..SelectionConfig::default()
        };
        let selector = BalancedSelector::new(&config);
        let mut first = update("a", "PRA", 90);
        first.sectors = vec!["Banking".into()];
        let mut second = update("b", "Payment Systems Regulator", 85);
        second.sectors = vec!["banking".into()];
        let mut third = update("c", "Serious Fraud Office", 84);
        third.sectors = vec!["Insurance".into()];

        let mut state = SelectionState::default();
        selector.domestic_pass(
            &screen(vec![first, second, third]),
            &mut state,
            CapMode::Strict,
            |_, _| true,
        );

        assert_eq!(ids(state.domestic()), vec!["a", "c"]);
    }

    #[test]
    fn recurring_low_value_items_are_skipped() {
        let config = SelectionConfig::default();
        let selector = BalancedSelector::new(&config);
        let mut notice = update("n", "London Stock Exchange", 99);
        notice.headline = "Market Notice: trading calendar amendments for members".into();

        let state = selector.select(screen(vec![notice, update("p", "PRA", 50)]));

        assert_eq!(ids(state.domestic()), vec!["p"]);
    }

    #[test]
    fn capped_exchange_is_trimmed_by_final_sweep() {
        let config = SelectionConfig {
            domestic_target: 4,
            ..SelectionConfig::default()
        };
        let selector = BalancedSelector::new(&config);
        let state = selector.select(screen(vec![
            update("x1", "AQUIS Exchange", 90),
            update("x2", "AQUIS Exchange", 89),
            update("x3", "Aquis Stock Exchange", 88),
            update("x4", "AQUIS", 87),
        ]));

        assert_eq!(ids(state.domestic()), vec!["x1", "x2"]);
    }

    #[test]
    fn international_block_balances_authorities() {
        let config = SelectionConfig::default();
        let selector = BalancedSelector::new(&config);
        let state = selector.select(screen(vec![
            international("e1", "ESMA", 90),
            international("e2", "ESMA", 88),
            international("e3", "ESMA", 86),
            international("s1", "SEC", 60),
            international("b1", "EBA", 75),
        ]));

        // Pass 1: e1, b1. Pass 2: s1. Pass 3: e2 (second ESMA slot).
        assert_eq!(ids(state.international()), vec!["e1", "b1", "s1", "e2"]);
        assert!(state.domestic().is_empty());
    }

    #[test]
    fn international_target_is_respected() {
        let config = SelectionConfig::default();
        let selector = BalancedSelector::new(&config);
        let pool = (0..12)
            .map(|i| international(&format!("i{i}"), &format!("Regulator {i}"), 90))
            .collect();

        let state = selector.select(screen(pool));

        assert_eq!(state.international().len(), config.international_target);
    }

    #[test]
    fn duplicate_identifiers_are_selected_once() {
        let config = SelectionConfig::default();
        let selector = BalancedSelector::new(&config);
        let first = update("same", "PRA", 90);
        let mut second = update("same", "Serious Fraud Office", 85);
        second.headline = "Serious Fraud Office charges directors over investment fraud".into();

        let state = selector.select(screen(vec![first, second]));

        assert_eq!(state.domestic().len(), 1);
    }
}
