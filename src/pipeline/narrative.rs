//! Metrics and narrative summary for a composed digest.
//!
//! ## Sentence shape
//!
//! "This digest highlights {counts} from {n} authorities{, concentrated in
//! sectors}{, with themes of themes}. {closing}"
//!
//! A stale-fallback run appends a freshness disclaimer.

use chrono::{DateTime, Duration, Utc};
use rustc_hash::{FxHashMap, FxHashSet};

use super::quality::FilteredUpdate;
use super::quality::lexicon::NARRATIVE_THEMES;
use super::types::DigestMetrics;
use crate::classifier::RelevanceBand;
use crate::store::models::normalize_sector;

/// Horizon for `deadlineCount`.
pub const DEADLINE_HORIZON_DAYS: i64 = 30;
const TOP_SECTORS: usize = 3;
const MAX_THEMES: usize = 2;

pub const QUIET_PERIOD_SENTENCE: &str =
    "No significant regulatory movements were identified in this period.";
pub const STALE_DISCLAIMER: &str =
    "Note: fresh updates were scarce, so this digest includes older items and freshness cannot be guaranteed.";
const CRITICAL_CLOSING: &str = "Priority review is recommended for the critical items.";
const MONITOR_CLOSING: &str = "No immediate action is required, but items merit monitoring.";

/// Screened items whose compliance deadline falls within the next 30 days.
#[must_use]
pub fn count_upcoming_deadlines(screened: &[FilteredUpdate], now: DateTime<Utc>) -> usize {
    let horizon = now + Duration::days(DEADLINE_HORIZON_DAYS);
    screened
        .iter()
        .filter_map(|update| update.compliance_deadline)
        .filter(|deadline| *deadline >= now && *deadline <= horizon)
        .count()
}

/// Bucket and authority counts over the final selection.
#[must_use]
pub fn build_metrics(
    selected: &[FilteredUpdate],
    deadline_count: usize,
    window_hours_used: Option<u32>,
    stale_fallback_used: bool,
) -> DigestMetrics {
    let mut metrics = DigestMetrics {
        deadline_count,
        window_hours_used,
        stale_fallback_used,
        ..DigestMetrics::default()
    };
    let mut authorities = FxHashSet::default();
    for update in selected {
        match RelevanceBand::from_score(update.score()) {
            RelevanceBand::High => metrics.high_count += 1,
            RelevanceBand::Medium => metrics.medium_count += 1,
            RelevanceBand::Low => metrics.low_count += 1,
        }
        let authority = update.authority_name();
        if !authority.is_empty() {
            authorities.insert(authority.to_lowercase());
        }
    }
    metrics.unique_authorities = authorities.len();
    metrics
}

#[must_use]
pub fn build_narrative(selected: &[FilteredUpdate], metrics: &DigestMetrics) -> String {
    let mut narrative = if metrics.high_count + metrics.medium_count == 0 {
        QUIET_PERIOD_SENTENCE.to_string()
    } else {
        compose_sentence(selected, metrics)
    };
    if metrics.stale_fallback_used {
        narrative.push(' ');
        narrative.push_str(STALE_DISCLAIMER);
    }
    narrative
}

fn compose_sentence(selected: &[FilteredUpdate], metrics: &DigestMetrics) -> String {
    let texts: Vec<String> = selected
        .iter()
        .map(|update| update.combined_text().to_lowercase())
        .collect();
    let enforcement = texts.iter().filter(|t| t.contains("enforcement")).count();

    let counts: Vec<String> = [
        (metrics.high_count, "critical item", "critical items"),
        (enforcement, "enforcement action", "enforcement actions"),
        (metrics.medium_count, "notable update", "notable updates"),
    ]
    .into_iter()
    .filter(|(count, _, _)| *count > 0)
    .map(|(count, one, many)| format!("{count} {}", if count == 1 { one } else { many }))
    .collect();

    let authorities = match metrics.unique_authorities {
        1 => "1 authority".to_string(),
        n => format!("{n} authorities"),
    };
    let mut sentence = format!("This digest highlights {} from {authorities}", join_list(&counts));

    let sectors = top_sectors(selected);
    if !sectors.is_empty() {
        sentence.push_str(", concentrated in ");
        sentence.push_str(&join_list(&sectors));
    }

    let themes: Vec<String> = NARRATIVE_THEMES
        .iter()
        .filter(|theme| texts.iter().any(|t| t.contains(*theme)))
        .take(MAX_THEMES)
        .map(ToString::to_string)
        .collect();
    if !themes.is_empty() {
        sentence.push_str(", with themes of ");
        sentence.push_str(&join_list(&themes));
    }

    let closing = if metrics.high_count > 0 {
        CRITICAL_CLOSING
    } else {
        MONITOR_CLOSING
    };
    format!("{sentence}. {closing}")
}

/// Most frequent sector labels; ties keep first-seen order.
fn top_sectors(selected: &[FilteredUpdate]) -> Vec<String> {
    let mut order: Vec<(String, String)> = Vec::new();
    let mut counts: FxHashMap<String, usize> = FxHashMap::default();
    for update in selected {
        for label in update.sector_labels() {
            let key = normalize_sector(label);
            let count = counts.entry(key.clone()).or_insert(0);
            if *count == 0 {
                order.push((key, label.to_string()));
            }
            *count += 1;
        }
    }
    let mut ranked: Vec<(usize, String)> = order
        .into_iter()
        .map(|(key, label)| (counts.get(&key).copied().unwrap_or(0), label))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked
        .into_iter()
        .take(TOP_SECTORS)
        .map(|(_, label)| label)
        .collect()
}

fn join_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}
