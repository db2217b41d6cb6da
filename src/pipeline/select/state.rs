//! Running counters for one selection run.

use rustc_hash::{FxHashMap, FxHashSet};

use super::policy::{AuthorityClass, AuthorityPolicy};
use crate::pipeline::quality::FilteredUpdate;
use crate::store::models::normalize_sector;
use crate::util::text::{hash_text, headline_key, normalize_text};

/// Selection state owned by a single composition run.
///
/// Authority, sector and treasury-family counters track the domestic block;
/// class counters and the membership sets span both blocks.
#[derive(Debug, Default, Clone)]
pub struct SelectionState {
    authority_counts: FxHashMap<String, usize>,
    class_counts: FxHashMap<AuthorityClass, usize>,
    sector_counts: FxHashMap<String, usize>,
    hm_other: usize,
    domestic: Vec<FilteredUpdate>,
    international: Vec<FilteredUpdate>,
    selected_ids: FxHashSet<String>,
    selected_keys: FxHashSet<u64>,
}

/// Counter key for an update's authority.
pub(crate) fn authority_key(update: &FilteredUpdate) -> String {
    normalize_text(update.authority_name())
}

impl SelectionState {
    /// Whether the identifier or the headline key is already taken.
    #[must_use]
    pub fn is_selected(&self, update: &FilteredUpdate) -> bool {
        self.selected_ids.contains(&update.selection_identity())
            || self
                .selected_keys
                .contains(&hash_text(&headline_key(&update.headline)))
    }

    #[must_use]
    pub fn domestic(&self) -> &[FilteredUpdate] {
        &self.domestic
    }

    #[must_use]
    pub fn international(&self) -> &[FilteredUpdate] {
        &self.international
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.domestic.len() + self.international.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Domestic block first, then international.
    #[must_use]
    pub fn into_insights(self) -> Vec<FilteredUpdate> {
        let mut insights = self.domestic;
        insights.extend(self.international);
        insights
    }

    pub(crate) fn authority_count(&self, key: &str) -> usize {
        self.authority_counts.get(key).copied().unwrap_or(0)
    }

    pub(crate) fn class_count(&self, class: AuthorityClass) -> usize {
        self.class_counts.get(&class).copied().unwrap_or(0)
    }

    pub(crate) fn sector_count(&self, sector_key: &str) -> usize {
        self.sector_counts.get(sector_key).copied().unwrap_or(0)
    }

    pub(crate) fn hm_other(&self) -> usize {
        self.hm_other
    }

    pub(crate) fn push_domestic(&mut self, update: FilteredUpdate, class: AuthorityClass) {
        self.count_domestic(&update, class);
        self.mark(&update);
        self.domestic.push(update);
    }

    pub(crate) fn push_international(&mut self, update: FilteredUpdate, class: AuthorityClass) {
        *self.class_counts.entry(class).or_insert(0) += 1;
        self.mark(&update);
        self.international.push(update);
    }

    pub(crate) fn take_domestic(&mut self) -> Vec<FilteredUpdate> {
        std::mem::take(&mut self.domestic)
    }

    /// Replace the domestic block and rebuild every counter from scratch.
    pub(crate) fn reset_domestic(
        &mut self,
        domestic: Vec<FilteredUpdate>,
        policy: &AuthorityPolicy,
    ) {
        let international = std::mem::take(&mut self.international);
        *self = Self::default();
        for update in domestic {
            let class = policy.classify(update.authority_name());
            self.push_domestic(update, class);
        }
        for update in international {
            let class = policy.classify(update.authority_name());
            self.push_international(update, class);
        }
    }

    fn count_domestic(&mut self, update: &FilteredUpdate, class: AuthorityClass) {
        *self.authority_counts.entry(authority_key(update)).or_insert(0) += 1;
        *self.class_counts.entry(class).or_insert(0) += 1;
        if class == AuthorityClass::TreasuryFamily {
            self.hm_other += 1;
        }
        for label in update.sector_labels() {
            *self.sector_counts.entry(normalize_sector(label)).or_insert(0) += 1;
        }
    }

    fn mark(&mut self, update: &FilteredUpdate) {
        self.selected_ids.insert(update.selection_identity());
        self.selected_keys
            .insert(hash_text(&headline_key(&update.headline)));
    }
}
