use rustc_hash::FxHashSet;
use tracing::debug;

use super::quality::FilteredUpdate;
use crate::util::text::{hash_text, headline_key};

/// Collapses records sharing an identifier or a normalised headline key.
///
/// The first record wins, so callers pass the pool in relevance-bucket order
/// (high, medium, low).
#[derive(Debug, Default, Clone)]
pub struct FuzzyDeduplicator;

impl FuzzyDeduplicator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn deduplicate(&self, updates: Vec<FilteredUpdate>) -> Vec<FilteredUpdate> {
        let before = updates.len();
        let mut seen_ids = FxHashSet::default();
        let mut seen_keys = FxHashSet::default();
        let mut kept = Vec::with_capacity(before);

        for update in updates {
            // Identifier first: same id with a reworded headline is still one record.
            if !seen_ids.insert(update.selection_identity()) {
                continue;
            }
            if !seen_keys.insert(hash_text(&headline_key(&update.headline))) {
                continue;
            }
            kept.push(update);
        }

        debug!(before, after = kept.len(), "fuzzy dedup completed");
        kept
    }
}
