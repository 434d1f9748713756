//! Eviction worker: the recurring sweep that clears abandoned carts.
//!
//! Each tick pops every due [`EvictionTask`], clears that user's lines and
//! schedules a fresh task `ttl` later. Per-task failures stay inside the tick
//! and are reported as [`TaskOutcome`]s; only [`WorkerHandle::stop`] ends the
//! loop.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    queue::{DelayQueue, EvictionTask},
    store::CartStore,
};

#[derive(Debug, Clone, Copy)]
pub struct EvictionSettings {
    /// Delay added on every (re)schedule.
    pub ttl: Duration,
    /// Time between sweeps.
    pub tick: Duration,
}

impl Default for EvictionSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            tick: Duration::from_secs(1),
        }
    }
}

impl EvictionSettings {
    /// Due time for a task scheduled at `from`.
    pub fn due_after(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        from.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// What happened to one popped payload.
#[derive(Debug)]
pub enum TaskOutcome {
    /// Lines cleared and the next task scheduled.
    Renewed { user_id: Uuid, next_due: i64 },
    /// Clearing failed; the chain for this user is not renewed.
    ClearFailed { user_id: Uuid, error: AppError },
    /// Lines cleared but the follow-up task could not be stored.
    RescheduleFailed { user_id: Uuid, error: AppError },
    /// Payload did not decode; dropped without renewal.
    Malformed { error: AppError },
}

impl TaskOutcome {
    pub fn is_renewed(&self) -> bool {
        matches!(self, TaskOutcome::Renewed { .. })
    }
}

#[derive(Debug, Default)]
pub struct TickReport {
    pub outcomes: Vec<TaskOutcome>,
}

impl TickReport {
    pub fn popped(&self) -> usize {
        self.outcomes.len()
    }

    pub fn renewed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_renewed()).count()
    }
}

pub struct EvictionWorker {
    store: Arc<dyn CartStore>,
    queue: Arc<dyn DelayQueue>,
    settings: EvictionSettings,
}

impl EvictionWorker {
    pub fn new(
        store: Arc<dyn CartStore>,
        queue: Arc<dyn DelayQueue>,
        settings: EvictionSettings,
    ) -> Self {
        Self {
            store,
            queue,
            settings,
        }
    }

    /// Run one sweep as of `now`.
    ///
    /// Fails only when the pop itself fails; nothing has been removed from
    /// the queue in that case.
    pub async fn tick(&self, now: DateTime<Utc>) -> AppResult<TickReport> {
        let payloads = self.queue.pop_due(now.timestamp()).await?;
        let mut report = TickReport {
            outcomes: Vec::with_capacity(payloads.len()),
        };

        for payload in payloads {
            let outcome = self.process(&payload, now).await;
            match &outcome {
                TaskOutcome::Renewed { user_id, next_due } => {
                    tracing::debug!(%user_id, next_due, "cart evicted and renewed");
                }
                TaskOutcome::ClearFailed { user_id, error } => {
                    tracing::warn!(%user_id, error = %error, "failed to clear cart lines");
                }
                TaskOutcome::RescheduleFailed { user_id, error } => {
                    tracing::warn!(%user_id, error = %error, "failed to reschedule eviction");
                }
                TaskOutcome::Malformed { error } => {
                    tracing::warn!(error = %error, "dropping malformed eviction task");
                }
            }
            report.outcomes.push(outcome);
        }

        Ok(report)
    }

    async fn process(&self, payload: &[u8], now: DateTime<Utc>) -> TaskOutcome {
        let task = match EvictionTask::decode(payload) {
            Ok(task) => task,
            Err(error) => return TaskOutcome::Malformed { error },
        };
        let user_id = task.user_id;

        match self.store.clear_lines(user_id).await {
            Ok(cleared) if !cleared.cart_present => {
                tracing::debug!(%user_id, "eviction target has no cart");
            }
            Ok(cleared) => {
                tracing::debug!(%user_id, removed = cleared.removed, "cleared cart lines");
            }
            Err(error) => return TaskOutcome::ClearFailed { user_id, error },
        }

        let next = EvictionTask::new(user_id, self.settings.due_after(now));
        match self.schedule(&next).await {
            Ok(()) => TaskOutcome::Renewed {
                user_id,
                next_due: next.due_at,
            },
            Err(error) => TaskOutcome::RescheduleFailed { user_id, error },
        }
    }

    async fn schedule(&self, task: &EvictionTask) -> AppResult<()> {
        self.queue.schedule(task.encode()?, task.due_at).await
    }

    /// Start the loop on the current runtime.
    pub fn spawn(self) -> WorkerHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let join = tokio::spawn(async move { self.run(token).await });
        WorkerHandle { cancel, join }
    }

    async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.settings.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            tick_ms = self.settings.tick.as_millis() as u64,
            ttl_secs = self.settings.ttl.as_secs(),
            "eviction worker started"
        );

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = interval.tick() => {
                    // Cancellation is only observed between ticks.
                    match self.tick(Utc::now()).await {
                        Ok(report) if report.popped() > 0 => {
                            tracing::debug!(
                                popped = report.popped(),
                                renewed = report.renewed(),
                                "eviction tick finished"
                            );
                        }
                        Ok(_) => {}
                        Err(error) => {
                            tracing::error!(error = %error, "failed to pop due eviction tasks");
                        }
                    }
                }
            }
        }

        tracing::info!("eviction worker stopped");
    }
}

/// Owned handle to a running worker.
pub struct WorkerHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Request a stop and wait for the in-flight tick, if any, to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(err) = self.join.await {
            tracing::error!(error = %err, "eviction worker task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
