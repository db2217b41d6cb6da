use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tracing::{error, info};
use uuid::Uuid;

use super::cadence::DailyCadence;
use crate::pipeline::{ComposeRequest, DigestComposer, DigestPayload};

/// Owned handle to the running daily digest task.
///
/// Dropping the handle aborts the task.
#[derive(Debug)]
pub struct ScheduleHandle {
    task: JoinHandle<()>,
}

impl ScheduleHandle {
    pub fn abort(&self) {
        self.task.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn the daily digest loop.
///
/// Each composed payload is sent on `sender`; the loop stops once the
/// receiver is dropped.
pub fn spawn_daily_digest(
    composer: Arc<DigestComposer>,
    cadence: DailyCadence,
    persona: Option<String>,
    sender: mpsc::Sender<DigestPayload>,
) -> ScheduleHandle {
    let daemon = DigestDaemon {
        composer,
        cadence,
        persona,
        sender,
    };
    ScheduleHandle {
        task: tokio::spawn(daemon.run()),
    }
}

struct DigestDaemon {
    composer: Arc<DigestComposer>,
    cadence: DailyCadence,
    persona: Option<String>,
    sender: mpsc::Sender<DigestPayload>,
}

impl DigestDaemon {
    async fn run(self) {
        loop {
            let now = Utc::now();
            let next = self.cadence.next_run_from(now);
            let wait = duration_until(next, now);
            info!(
                next_run_utc = %next.to_rfc3339(),
                next_run_local = %next.with_timezone(&self.cadence.timezone()).to_rfc3339(),
                wait_seconds = wait.as_secs(),
                "scheduled daily digest"
            );
            sleep(wait).await;

            let job_id = Uuid::new_v4();
            let mut request = ComposeRequest::at(Utc::now());
            request.persona.clone_from(&self.persona);
            match self.composer.compose(request).await {
                Ok(payload) => {
                    info!(
                        %job_id,
                        digest_id = %payload.digest_id,
                        insights = payload.insights.len(),
                        "scheduled digest composed"
                    );
                    if self.sender.send(payload).await.is_err() {
                        info!(%job_id, "digest receiver closed, stopping schedule");
                        return;
                    }
                }
                Err(err) => error!(%job_id, error = %err, "scheduled digest failed"),
            }
            // Step past the trigger so a fast run is not repeated.
            sleep(Duration::from_secs(1)).await;
        }
    }
}

fn duration_until(next: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (next - now).to_std().unwrap_or(Duration::ZERO)
}
