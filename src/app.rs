use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::info;

use crate::{
    classifier::ScoreBandCategorizer,
    config::Config,
    observability::Telemetry,
    pipeline::{ComposeRequest, DigestComposer, DigestPayload},
    scheduler::{DailyCadence, ScheduleHandle, spawn_daily_digest},
    store::UpdateStore,
};

/// Capacity of the scheduled digest channel.
const SCHEDULE_CHANNEL_CAPACITY: usize = 4;

/// Process-lifetime context owning the composer and the schedule handle.
pub struct ComponentRegistry {
    config: Arc<Config>,
    telemetry: Telemetry,
    composer: Arc<DigestComposer>,
    schedule: Option<ScheduleHandle>,
}

impl ComponentRegistry {
    /// Wire the composer against `store`.
    ///
    /// # Errors
    /// Fails when telemetry cannot be initialised.
    pub fn build(config: Config, store: Arc<dyn UpdateStore>) -> Result<Self> {
        let telemetry = Telemetry::new().context("failed to initialise telemetry")?;
        Ok(Self::with_telemetry(config, store, telemetry))
    }

    #[must_use]
    pub fn with_telemetry(
        config: Config,
        store: Arc<dyn UpdateStore>,
        telemetry: Telemetry,
    ) -> Self {
        let config = Arc::new(config);
        let composer = DigestComposer::new(
            store,
            Arc::new(ScoreBandCategorizer::new()),
            Arc::new(config.digest().clone()),
        )
        .with_metrics(telemetry.metrics());

        Self {
            config,
            telemetry,
            composer: Arc::new(composer),
            schedule: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    #[must_use]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    #[must_use]
    pub fn composer(&self) -> Arc<DigestComposer> {
        Arc::clone(&self.composer)
    }

    /// Compose one digest now with the configured persona and window.
    ///
    /// # Errors
    /// Propagates composition failures.
    pub async fn compose_now(&self) -> Result<DigestPayload> {
        let payload = self
            .composer
            .compose(ComposeRequest::at(Utc::now()))
            .await?;
        Ok(payload)
    }

    /// Start the daily schedule; composed digests arrive on the returned receiver.
    ///
    /// # Errors
    /// Fails when a schedule is already running or the configured time is invalid.
    pub fn start_schedule(&mut self) -> Result<mpsc::Receiver<DigestPayload>> {
        if self.schedule.as_ref().is_some_and(|h| !h.is_finished()) {
            bail!("digest schedule is already running");
        }
        let cadence = DailyCadence::with_utc_offset_hours(
            self.config.schedule_utc_offset_hours(),
            self.config.schedule_hour(),
            self.config.schedule_minute(),
        )
        .context("invalid schedule time")?;

        let (sender, receiver) = mpsc::channel(SCHEDULE_CHANNEL_CAPACITY);
        self.schedule = Some(spawn_daily_digest(
            Arc::clone(&self.composer),
            cadence,
            None,
            sender,
        ));
        info!(
            hour = self.config.schedule_hour(),
            minute = self.config.schedule_minute(),
            utc_offset_hours = self.config.schedule_utc_offset_hours(),
            "digest schedule started"
        );
        Ok(receiver)
    }

    /// Abort the running schedule, if any.
    pub fn stop_schedule(&mut self) {
        if let Some(handle) = self.schedule.take() {
            handle.abort();
        }
    }

    #[must_use]
    pub fn schedule_running(&self) -> bool {
        self.schedule.as_ref().is_some_and(|h| !h.is_finished())
    }
}
