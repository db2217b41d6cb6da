use tracing::{debug, info};

use super::config::{GapFillConfig, SelectionConfig};
use super::quality::QualityFilter;
use super::select::is_recurring_low_value;
use super::select::policy::{AuthorityClass, AuthorityPolicy, hard_cap};
use super::select::state::{SelectionState, authority_key};
use crate::store::RawUpdate;

/// Tops up an under-filled domestic block from a supplemental fetch.
///
/// Supplemental records go through the same quality screen as the main pool.
/// They respect the hard authority caps and the per-authority cap for
/// non-priority authorities; the sector and treasury-family caps are not
/// applied.
pub struct GapFiller<'a> {
    selection: &'a SelectionConfig,
    config: &'a GapFillConfig,
    policy: &'a AuthorityPolicy,
}

impl<'a> GapFiller<'a> {
    #[must_use]
    pub fn new(
        selection: &'a SelectionConfig,
        config: &'a GapFillConfig,
        policy: &'a AuthorityPolicy,
    ) -> Self {
        Self {
            selection,
            config,
            policy,
        }
    }

    #[must_use]
    pub fn needs_fill(&self, state: &SelectionState) -> bool {
        state.domestic().len() < self.selection.domestic_target
    }

    /// Append supplemental domestic records until the target is met.
    ///
    /// Returns the number of records added. They land at the end of the
    /// domestic block, ahead of every international insight.
    pub fn fill(
        &self,
        state: &mut SelectionState,
        supplemental: Vec<RawUpdate>,
        filter: &QualityFilter<'_>,
    ) -> usize {
        let offered = supplemental.len();
        let mut added = 0usize;

        for update in supplemental {
            if !self.needs_fill(state) {
                break;
            }
            if !update.is_domestic() {
                continue;
            }
            let mut candidate = match filter.admit(update) {
                Ok(candidate) => candidate,
                Err(reason) => {
                    debug!(reason = reason.as_str(), "supplemental update rejected");
                    continue;
                }
            };
            if state.is_selected(&candidate) || is_recurring_low_value(&candidate) {
                continue;
            }
            let class = self.policy.classify(candidate.authority_name());
            if hard_cap(class, self.selection).is_some_and(|cap| state.class_count(class) >= cap) {
                continue;
            }
            if class != AuthorityClass::Priority
                && state.authority_count(&authority_key(&candidate)) >= self.selection.authority_cap
            {
                continue;
            }
            if candidate.relevance_score.is_none() {
                candidate.relevance_score = Some(self.config.default_score);
            }
            state.push_domestic(candidate, class);
            added += 1;
        }

        info!(
            offered,
            added,
            domestic = state.domestic().len(),
            target = self.selection.domestic_target,
            "gap-fill completed"
        );
        added
    }
}
