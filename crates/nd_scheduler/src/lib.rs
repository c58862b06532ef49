//! Periodic job controller with retries and a failure cooldown.
//!
//! Each [`Scheduler`] drives one [`Job`] on a fixed interval. A failing cycle
//! is retried a few times; when several cycles in a row are abandoned the
//! scheduler pauses for a cooldown period before trying again.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nd_core::Result;
use tokio::sync::{watch, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

pub mod config;
pub mod jobs;
pub mod status;

pub use config::ScheduleConfig;
pub use jobs::{CleanupJob, ScrapeJob};
pub use status::{JsonFileStatusStore, MemoryStatusStore, SchedulerStatus, StatusStore};

#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;

    /// One attempt. Returns how many items were processed.
    async fn run(&self) -> Result<u64>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Pausing(String),
    Paused,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => f.write_str("idle"),
            Phase::Running => f.write_str("running"),
            Phase::Pausing(reason) => write!(f, "pausing ({})", reason),
            Phase::Paused => f.write_str("paused"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Still inside the cooldown window.
    Paused,
    /// Another cycle is in flight.
    Overlap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Succeeded { processed: u64, attempts: u32 },
    Failed { attempts: u32, error: String },
    Skipped(SkipReason),
}

struct State {
    phase: Phase,
    status: SchedulerStatus,
}

/// Clears the in-flight flag when a cycle ends, including when its future is
/// dropped mid-run.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Scheduler {
    job: Arc<dyn Job>,
    config: ScheduleConfig,
    status_store: Arc<dyn StatusStore>,
    state: Mutex<State>,
    in_flight: AtomicBool,
}

impl Scheduler {
    pub fn new(job: Arc<dyn Job>, config: ScheduleConfig, status_store: Arc<dyn StatusStore>) -> Self {
        Self {
            job,
            config,
            status_store,
            state: Mutex::new(State {
                phase: Phase::Idle,
                status: SchedulerStatus::default(),
            }),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn job_name(&self) -> &str {
        self.job.name()
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase.clone()
    }

    pub async fn status(&self) -> SchedulerStatus {
        self.state.lock().await.status.clone()
    }

    /// Restore counters and any pending pause from the status store.
    pub async fn restore(&self) -> Result<()> {
        let status = self.status_store.load().await?;
        let mut state = self.state.lock().await;
        state.phase = if status.is_paused { Phase::Paused } else { Phase::Idle };
        state.status = status;
        Ok(())
    }

    pub async fn run_cycle(&self) -> CycleOutcome {
        self.run_cycle_at(Utc::now()).await
    }

    /// One timer fire, with `now` as the wall-clock time of the fire.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleOutcome {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            warn!(job = self.job.name(), "Previous run still in progress, skipping");
            return CycleOutcome::Skipped(SkipReason::Overlap);
        }
        let _guard = InFlight(&self.in_flight);

        {
            let mut state = self.state.lock().await;
            if let Some(until) = state.status.pause_until.filter(|_| state.status.is_paused) {
                if now < until {
                    info!(job = self.job.name(), %until, "Scheduler is paused");
                    return CycleOutcome::Skipped(SkipReason::Paused);
                }
                state.status.is_paused = false;
                state.status.pause_until = None;
                info!(job = self.job.name(), "Resuming scheduled operations after pause period");
            }
            state.phase = Phase::Running;
            state.status.last_run = Some(now);
            state.status.total_runs += 1;
        }

        let outcome = self.attempt_with_retries().await;

        let status = {
            let mut state = self.state.lock().await;
            match &outcome {
                CycleOutcome::Succeeded { processed, .. } => {
                    state.phase = Phase::Idle;
                    state.status.last_success = Some(now);
                    state.status.consecutive_failures = 0;
                    state.status.total_successes += 1;
                    state.status.articles_stored += processed;
                }
                CycleOutcome::Failed { .. } => {
                    state.status.consecutive_failures += 1;
                    state.status.total_failures += 1;
                    if state.status.consecutive_failures >= self.config.max_consecutive_failures {
                        self.pause(&mut state, now);
                    } else {
                        state.phase = Phase::Idle;
                    }
                }
                CycleOutcome::Skipped(_) => {}
            }
            state.status.clone()
        };

        if let Err(e) = self.status_store.save(&status).await {
            warn!(job = self.job.name(), error = %e, "Failed to save scheduler status");
        }
        if self.config.report_every > 0 && status.total_runs % self.config.report_every == 0 {
            self.report(&status);
        }

        outcome
    }

    async fn attempt_with_retries(&self) -> CycleOutcome {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.job.run().await {
                Ok(processed) => {
                    info!(job = self.job.name(), processed, attempt, "Job run succeeded");
                    return CycleOutcome::Succeeded {
                        processed,
                        attempts: attempt,
                    };
                }
                Err(e) => {
                    error!(job = self.job.name(), attempt, error = %e, "Job attempt failed");
                    last_error = e.to_string();
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.retry_delay()).await;
                    }
                }
            }
        }

        error!(job = self.job.name(), attempts = max_attempts, "Max retries reached, skipping this cycle");
        CycleOutcome::Failed {
            attempts: max_attempts,
            error: last_error,
        }
    }

    fn pause(&self, state: &mut State, now: DateTime<Utc>) {
        let reason = format!("{} consecutive failures", state.status.consecutive_failures);
        state.phase = Phase::Pausing(reason.clone());

        let until = now + self.config.cooldown();
        warn!(job = self.job.name(), %reason, %until, "Too many consecutive failures, pausing");
        state.status.is_paused = true;
        state.status.pause_until = Some(until);
        state.phase = Phase::Paused;
    }

    fn report(&self, status: &SchedulerStatus) {
        info!(
            job = self.job.name(),
            total_runs = status.total_runs,
            success_rate = status.success_rate(),
            articles = status.articles_stored,
            last_success = ?status.last_success,
            paused = status.is_paused,
            "Status report"
        );
    }

    /// Fire on every interval until `shutdown` flips to true (or its sender
    /// goes away). A run in flight at shutdown is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if let Err(e) = self.restore().await {
            warn!(job = self.job.name(), error = %e, "Could not restore scheduler status");
        }

        let period = self.config.interval();
        let start = if self.config.run_immediately {
            Instant::now()
        } else {
            Instant::now() + period
        };
        let mut ticker = tokio::time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(job = self.job.name(), interval_secs = period.as_secs(), "Scheduler started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    // the sender is gone; nobody can ask us to stop any more
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    tokio::select! {
                        outcome = self.run_cycle() => {
                            if let CycleOutcome::Failed { error, .. } = &outcome {
                                error!(job = self.job.name(), %error, "Cycle abandoned");
                            }
                        }
                        _ = shutdown.changed() => {
                            warn!(job = self.job.name(), "Shutdown requested, abandoning run in progress");
                            self.state.lock().await.phase = Phase::Idle;
                        }
                    }
                }
            }
        }

        info!(job = self.job.name(), "Scheduler stopped");
    }
}
