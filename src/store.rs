//! Update pool and sent-history collaborators.

pub mod memory;
pub mod models;
pub mod snapshot;

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::InMemoryUpdateStore;
pub use models::{FirmProfile, RawUpdate, SentRecord};

/// Closed publication interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FetchWindow {
    /// Window of `hours` ending at `end`.
    #[must_use]
    pub fn ending_at(end: DateTime<Utc>, hours: u32) -> Self {
        Self {
            start: end - chrono::Duration::hours(i64::from(hours)),
            end,
        }
    }

    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

/// Read access to the update pool and the "already sent" history.
///
/// Implementations own their consistency; the digest engine never writes.
#[async_trait]
pub trait UpdateStore: Send + Sync {
    /// Fetch updates published inside `window` (or any time when `None`).
    async fn fetch_updates(
        &self,
        window: Option<FetchWindow>,
        limit: usize,
        newest_first: bool,
    ) -> Result<Vec<RawUpdate>>;

    /// Identifiers sent within the last `retention_days` days.
    async fn fetch_recently_sent_identifiers(&self, retention_days: u32) -> Result<HashSet<String>>;

    async fn fetch_firm_profile(&self) -> Result<Option<FirmProfile>>;
}
