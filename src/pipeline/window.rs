//! Lookback window resolution with adaptive expansion.
//!
//! The resolver starts from the preferred window, widens it while the pool is
//! too thin, and as a last resort drops the window and takes the most recent
//! records regardless of age (stale fallback).

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::config::{DEFAULT_WINDOW_HOURS, WindowConfig};
use super::error::{ComposeError, FetchStage};
use crate::store::{FetchWindow, RawUpdate, UpdateStore};

/// Candidate pool produced by the resolver.
#[derive(Debug, Clone, Default)]
pub struct ResolvedPool {
    pub updates: Vec<RawUpdate>,
    /// Window the pool was drawn from; `None` when stale fallback was used.
    pub window_hours: Option<u32>,
    pub stale_fallback_used: bool,
    /// Every window length tried, in order.
    pub windows_tried: Vec<u32>,
}

impl ResolvedPool {
    #[must_use]
    pub fn expansions(&self) -> usize {
        self.windows_tried.len().saturating_sub(1)
    }
}

/// Clamp the requested window into `[1, max_hours]`.
#[must_use]
pub fn initial_window_hours(preferred: Option<u32>, max_hours: u32) -> u32 {
    preferred
        .unwrap_or(DEFAULT_WINDOW_HOURS)
        .clamp(1, max_hours.max(1))
}

/// Next window: `min(max, max(current + 24, round(current * 1.5)))`.
#[must_use]
pub fn next_window_hours(current: u32, max_hours: u32) -> u32 {
    let by_day = current.saturating_add(24);
    let by_ratio = current.saturating_add(current.div_ceil(2));
    by_day.max(by_ratio).min(max_hours)
}

pub struct WindowResolver<'a> {
    config: &'a WindowConfig,
}

impl<'a> WindowResolver<'a> {
    #[must_use]
    pub fn new(config: &'a WindowConfig) -> Self {
        Self { config }
    }

    /// Fetch the candidate pool for a run ending at `now`.
    ///
    /// # Errors
    /// Any store failure is returned as [`ComposeError::Fetch`] without retry.
    pub async fn resolve(
        &self,
        store: &dyn UpdateStore,
        preferred_hours: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<ResolvedPool, ComposeError> {
        let max_hours = self.config.max_hours.max(1);
        let mut window =
            initial_window_hours(preferred_hours.or(self.config.preferred_hours), max_hours);
        let mut windows_tried = vec![window];

        let mut updates = self
            .fetch_window(store, now, window, FetchStage::Window)
            .await?;
        debug!(window_hours = window, candidates = updates.len(), "initial window fetched");

        let mut expansions = 0usize;
        while updates.len() < self.config.min_items
            && window < max_hours
            && expansions < self.config.max_expansions
        {
            let next = next_window_hours(window, max_hours);
            info!(
                from_hours = window,
                to_hours = next,
                candidates = updates.len(),
                min_items = self.config.min_items,
                "expanding digest window"
            );
            window = next;
            windows_tried.push(window);
            expansions += 1;
            updates = self
                .fetch_window(store, now, window, FetchStage::Expansion)
                .await?;
        }

        if updates.len() < self.config.min_items && self.config.allow_stale_fallback {
            warn!(
                window_hours = window,
                candidates = updates.len(),
                limit = self.config.stale_fallback_limit,
                "window still short after expansion, falling back to most recent updates"
            );
            let stale = store
                .fetch_updates(None, self.config.stale_fallback_limit, true)
                .await
                .map_err(ComposeError::fetch(FetchStage::StaleFallback))?;
            return Ok(ResolvedPool {
                updates: stale,
                window_hours: None,
                stale_fallback_used: true,
                windows_tried,
            });
        }

        Ok(ResolvedPool {
            updates,
            window_hours: Some(window),
            stale_fallback_used: false,
            windows_tried,
        })
    }

    async fn fetch_window(
        &self,
        store: &dyn UpdateStore,
        now: DateTime<Utc>,
        hours: u32,
        stage: FetchStage,
    ) -> Result<Vec<RawUpdate>, ComposeError> {
        store
            .fetch_updates(
                Some(FetchWindow::ending_at(now, hours)),
                self.config.fetch_limit,
                true,
            )
            .await
            .map_err(ComposeError::fetch(stage))
    }
}
