//! Entry point of the digest composition engine.
//!
//! One [`DigestComposer::compose`] call runs the stages in order:
//!
//! 1. Window Resolver: fetch the candidate pool, widening the lookback or
//!    falling back to the most recent updates when it is thin.
//! 2. Sent history and firm profile lookups.
//! 3. Relevance categorisation (high, medium, low).
//! 4. Quality Filter, Fuzzy Deduplicator, Balanced Selector.
//! 5. Gap-Filler when the domestic block is short.
//! 6. Metrics and narrative.
//!
//! When the stale fallback was engaged and the history-respecting run selects
//! nothing, steps 4 and 5 are rebuilt once with the history ignored.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use super::config::DigestConfig;
use super::dedup::FuzzyDeduplicator;
use super::error::{ComposeError, FetchStage};
use super::gap_fill::GapFiller;
use super::narrative::{build_metrics, build_narrative, count_upcoming_deadlines};
use super::quality::QualityFilter;
use super::select::BalancedSelector;
use super::select::state::SelectionState;
use super::types::{ComposeRequest, DigestInsight, DigestPayload};
use super::window::{ResolvedPool, WindowResolver};
use crate::classifier::RelevanceCategorizer;
use crate::observability::metrics::Metrics;
use crate::store::{RawUpdate, UpdateStore};

/// Outcome of filter, dedup, selection and gap-fill over one candidate list.
struct Selection {
    state: SelectionState,
    deadline_count: usize,
    supplemental: usize,
}

pub struct DigestComposer {
    store: Arc<dyn UpdateStore>,
    categorizer: Arc<dyn RelevanceCategorizer>,
    config: Arc<DigestConfig>,
    metrics: Option<Arc<Metrics>>,
}

impl DigestComposer {
    #[must_use]
    pub fn new(
        store: Arc<dyn UpdateStore>,
        categorizer: Arc<dyn RelevanceCategorizer>,
        config: Arc<DigestConfig>,
    ) -> Self {
        Self {
            store,
            categorizer,
            config,
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn config(&self) -> &DigestConfig {
        &self.config
    }

    /// Compose one digest.
    ///
    /// # Errors
    /// Store and categoriser failures propagate as [`ComposeError`]; a failed
    /// firm-profile lookup is tolerated.
    pub async fn compose(&self, request: ComposeRequest) -> Result<DigestPayload, ComposeError> {
        let run_id = Uuid::now_v7();
        let started = Instant::now();
        let span = info_span!("compose_digest", %run_id);

        let result = self.run(request).instrument(span).await;

        if let Some(metrics) = &self.metrics {
            metrics
                .compose_duration
                .observe(started.elapsed().as_secs_f64());
            match &result {
                Ok(payload) => {
                    metrics.runs_completed.inc();
                    metrics
                        .insights_selected
                        .inc_by(u64::try_from(payload.insights.len()).unwrap_or(u64::MAX));
                }
                Err(_) => metrics.runs_failed.inc(),
            }
        }
        if let Err(err) = &result {
            warn!(%run_id, error = %err, "digest composition failed");
        }
        result
    }

    async fn run(&self, request: ComposeRequest) -> Result<DigestPayload, ComposeError> {
        let now = request.now;
        let persona = request
            .persona
            .unwrap_or_else(|| self.config.persona.clone());

        let ResolvedPool {
            updates,
            window_hours,
            stale_fallback_used,
            windows_tried,
        } = WindowResolver::new(&self.config.window)
            .resolve(self.store.as_ref(), request.window_hours, now)
            .await?;
        let expansions = windows_tried.len().saturating_sub(1);
        self.record(|m| {
            m.window_expansions
                .inc_by(u64::try_from(expansions).unwrap_or(u64::MAX));
            if stale_fallback_used {
                m.stale_fallbacks.inc();
            }
        });

        let history = self
            .store
            .fetch_recently_sent_identifiers(self.config.quality.history_retention_days)
            .await
            .map_err(|source| ComposeError::History { source })?;

        let profile = match self.store.fetch_firm_profile().await {
            Ok(profile) => profile,
            Err(err) => {
                warn!(error = %err, "firm profile unavailable, categorising without it");
                None
            }
        };

        let fetched = updates.len();
        let candidates = self
            .categorizer
            .categorize(updates, profile.as_ref())
            .await
            .map_err(|source| ComposeError::Categorize { source })?
            .into_ordered();

        let mut selection = self.select(&candidates, &history, false, now).await?;
        let mut history_ignored = false;
        if stale_fallback_used && selection.state.is_empty() && !history.is_empty() {
            warn!(
                history = history.len(),
                candidates = candidates.len(),
                "stale pool fully covered by sent history, rebuilding with history ignored"
            );
            selection = self.select(&candidates, &history, true, now).await?;
            history_ignored = true;
            self.record(|m| m.history_ignored.inc());
        }

        let insights = selection.state.into_insights();
        let metrics = build_metrics(
            &insights,
            selection.deadline_count,
            window_hours,
            stale_fallback_used,
        );
        let summary = build_narrative(&insights, &metrics);

        info!(
            fetched,
            windows_tried = ?windows_tried,
            window_hours = ?window_hours,
            stale_fallback_used,
            history_ignored,
            supplemental = selection.supplemental,
            insights = insights.len(),
            high = metrics.high_count,
            medium = metrics.medium_count,
            low = metrics.low_count,
            "digest composed"
        );

        Ok(DigestPayload {
            digest_id: Uuid::new_v4(),
            persona,
            summary,
            insights: insights.iter().map(DigestInsight::from).collect(),
            metrics,
            generated_at: now,
            history_ignored,
        })
    }

    async fn select(
        &self,
        candidates: &[RawUpdate],
        history: &HashSet<String>,
        ignore_history: bool,
        now: DateTime<Utc>,
    ) -> Result<Selection, ComposeError> {
        let config = &self.config;
        let filter = QualityFilter::new(&config.quality, history, ignore_history)?;

        let outcome = filter.apply(candidates.to_vec());
        info!(
            candidates = candidates.len(),
            survivors = outcome.survivors.len(),
            rejected = outcome.rejected_total(),
            ignore_history,
            "quality filter applied"
        );
        self.record(|m| {
            for (reason, count) in &outcome.rejected {
                m.record_rejections(*reason, *count);
            }
        });

        let deadline_count = count_upcoming_deadlines(&outcome.survivors, now);
        let pool = FuzzyDeduplicator::new().deduplicate(outcome.survivors);

        let selector = BalancedSelector::new(&config.selection);
        let mut state = selector.select(pool);

        let filler = GapFiller::new(&config.selection, &config.gap_fill, selector.policy());
        let mut supplemental = 0;
        if filler.needs_fill(&state) {
            let extra = self
                .store
                .fetch_updates(None, config.gap_fill.supplemental_limit, true)
                .await
                .map_err(ComposeError::fetch(FetchStage::Supplemental))?;
            supplemental = filler.fill(&mut state, extra, &filter);
            self.record(|m| {
                m.supplemental_insights
                    .inc_by(u64::try_from(supplemental).unwrap_or(u64::MAX));
            });
        }

        Ok(Selection {
            state,
            deadline_count,
            supplemental,
        })
    }

    fn record(&self, f: impl FnOnce(&Metrics)) {
        if let Some(metrics) = &self.metrics {
            f(metrics);
        }
    }
}
