//! In-memory update pool backing the snapshot loader and the tests.

use std::collections::HashSet;

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use super::{FetchWindow, FirmProfile, RawUpdate, SentRecord, UpdateStore};

/// Parameters of one `fetch_updates` call, kept for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub window: Option<FetchWindow>,
    pub limit: usize,
    pub newest_first: bool,
}

impl FetchRequest {
    /// Window length in whole hours, `None` for unwindowed fetches.
    #[must_use]
    pub fn window_hours(&self) -> Option<i64> {
        self.window.map(|w| (w.end - w.start).num_hours())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUpdateStore {
    updates: Vec<RawUpdate>,
    sent: Vec<SentRecord>,
    profile: Option<FirmProfile>,
    profile_unavailable: bool,
    reference_time: Option<DateTime<Utc>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl InMemoryUpdateStore {
    #[must_use]
    pub fn new(updates: Vec<RawUpdate>) -> Self {
        Self {
            updates,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_sent(mut self, sent: Vec<SentRecord>) -> Self {
        self.sent = sent;
        self
    }

    #[must_use]
    pub fn with_profile(mut self, profile: FirmProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Make `fetch_firm_profile` fail.
    #[must_use]
    pub fn with_unavailable_profile(mut self) -> Self {
        self.profile_unavailable = true;
        self
    }

    /// Fix the clock used for the history retention cut-off.
    #[must_use]
    pub fn with_reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.reference_time = Some(now);
        self
    }

    /// Fetch calls received so far, in order.
    pub async fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().await.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

#[async_trait]
impl UpdateStore for InMemoryUpdateStore {
    async fn fetch_updates(
        &self,
        window: Option<FetchWindow>,
        limit: usize,
        newest_first: bool,
    ) -> Result<Vec<RawUpdate>> {
        self.requests.lock().await.push(FetchRequest {
            window,
            limit,
            newest_first,
        });

        let mut matched: Vec<RawUpdate> = self
            .updates
            .iter()
            .filter(|update| match window {
                Some(window) => update.published_at().is_some_and(|at| window.contains(at)),
                None => true,
            })
            .cloned()
            .collect();

        // Undated records sort last in both directions.
        matched.sort_by(|a, b| match (a.published_at(), b.published_at()) {
            (Some(x), Some(y)) if newest_first => y.cmp(&x),
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        matched.truncate(limit);
        Ok(matched)
    }

    async fn fetch_recently_sent_identifiers(
        &self,
        retention_days: u32,
    ) -> Result<HashSet<String>> {
        let now = self.reference_time.unwrap_or_else(Utc::now);
        let cutoff = now - Duration::days(i64::from(retention_days));
        Ok(self
            .sent
            .iter()
            .filter(|record| record.sent_at >= cutoff)
            .map(|record| record.id.clone())
            .collect())
    }

    async fn fetch_firm_profile(&self) -> Result<Option<FirmProfile>> {
        if self.profile_unavailable {
            bail!("firm profile store unavailable");
        }
        Ok(self.profile.clone())
    }
}
