//! Relevance categorisation seam.
//!
//! Scoring itself happens upstream; the engine only needs updates split into
//! high / medium / low buckets with the order inside each bucket preserved.

use anyhow::Result;
use async_trait::async_trait;

use crate::store::{FirmProfile, RawUpdate, models::normalize_sector};

/// Score at or above which an update is high relevance.
pub const HIGH_RELEVANCE: u8 = 80;
/// Score at or above which an update is medium relevance.
pub const MEDIUM_RELEVANCE: u8 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelevanceBand {
    High,
    Medium,
    Low,
}

impl RelevanceBand {
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        if score >= HIGH_RELEVANCE {
            Self::High
        } else if score >= MEDIUM_RELEVANCE {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Updates grouped by relevance band.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorizedUpdates {
    pub high: Vec<RawUpdate>,
    pub medium: Vec<RawUpdate>,
    pub low: Vec<RawUpdate>,
}

impl CategorizedUpdates {
    /// Flatten to high, then medium, then low.
    #[must_use]
    pub fn into_ordered(self) -> Vec<RawUpdate> {
        let mut ordered = self.high;
        ordered.extend(self.medium);
        ordered.extend(self.low);
        ordered
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.high.len() + self.medium.len() + self.low.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
pub trait RelevanceCategorizer: Send + Sync {
    async fn categorize(
        &self,
        updates: Vec<RawUpdate>,
        profile: Option<&FirmProfile>,
    ) -> Result<CategorizedUpdates>;
}

/// Buckets updates by their existing relevance score.
///
/// When a firm profile is present, updates touching one of the profile's
/// sectors get a priority reason attached; scores are never changed.
#[derive(Debug, Default, Clone)]
pub struct ScoreBandCategorizer;

impl ScoreBandCategorizer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RelevanceCategorizer for ScoreBandCategorizer {
    async fn categorize(
        &self,
        updates: Vec<RawUpdate>,
        profile: Option<&FirmProfile>,
    ) -> Result<CategorizedUpdates> {
        let focus: Vec<String> = profile
            .map(|p| p.sectors.iter().map(|s| normalize_sector(s)).collect())
            .unwrap_or_default();

        let mut buckets = CategorizedUpdates::default();
        for mut update in updates {
            if update.priority_reason.is_none() {
                let matched = update
                    .sector_labels()
                    .into_iter()
                    .find(|label| focus.contains(&normalize_sector(label)))
                    .map(ToString::to_string);
                if let Some(sector) = matched {
                    update.priority_reason = Some(format!("Matches firm focus on {sector}"));
                }
            }
            match RelevanceBand::from_score(update.score()) {
                RelevanceBand::High => buckets.high.push(update),
                RelevanceBand::Medium => buckets.medium.push(update),
                RelevanceBand::Low => buckets.low.push(update),
            }
        }
        Ok(buckets)
    }
}
