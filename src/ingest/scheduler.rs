// src/ingest/scheduler.rs
//! Periodic driver: Idle → (tick | trigger) → Running → Idle.
//!
//! Cycles run one at a time inside the scheduler task, so they can never
//! overlap. A cycle runs immediately on start. Triggers that arrive while a
//! cycle is running collapse into a single follow-up cycle.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::ingest::{CycleReport, IngestPipeline};

#[async_trait]
pub trait CycleRunner: Send + Sync + 'static {
    async fn run_cycle(&self) -> CycleReport;
}

#[async_trait]
impl CycleRunner for IngestPipeline {
    async fn run_cycle(&self) -> CycleReport {
        IngestPipeline::run_cycle(self).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub interval: Duration,
}

struct Shared {
    trigger: Arc<Notify>,
    pending: Arc<AtomicBool>,
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<SchedulerState>,
    cycles: Arc<AtomicU64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Control handle. Dropping every clone shuts the scheduler down after the
/// current cycle; [`stop`](Self::stop) does so and waits for it.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

pub fn start(runner: Arc<dyn CycleRunner>, cfg: SchedulerCfg) -> SchedulerHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);
    let trigger = Arc::new(Notify::new());
    // Set by `trigger()`, cleared whenever a cycle starts. A permit left in
    // `trigger` after a tick already served the request is ignored.
    let pending = Arc::new(AtomicBool::new(false));
    let cycles = Arc::new(AtomicU64::new(0));
    let interval = cfg.interval.max(Duration::from_millis(1));

    let task = {
        let trigger = Arc::clone(&trigger);
        let pending = Arc::clone(&pending);
        let cycles = Arc::clone(&cycles);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(target: "scheduler", interval_secs = interval.as_secs(), "scheduler started");

            loop {
                let reason = tokio::select! {
                    biased;
                    res = shutdown_rx.changed() => {
                        // Err: every handle is gone.
                        if res.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                    _ = ticker.tick() => "tick",
                    _ = trigger.notified() => {
                        if !pending.load(Ordering::SeqCst) {
                            continue;
                        }
                        "trigger"
                    }
                };

                pending.store(false, Ordering::SeqCst);
                state_tx.send_replace(SchedulerState::Running);
                let r = Arc::clone(&runner);
                // Own task so a panicking cycle is logged instead of killing the loop.
                match tokio::spawn(async move { r.run_cycle().await }).await {
                    Ok(report) => info!(
                        target: "scheduler",
                        reason,
                        inserted = report.inserted,
                        failed = report.sources_failed,
                        "cycle done"
                    ),
                    Err(e) => error!(target: "scheduler", reason, error = %e, "cycle aborted"),
                }
                cycles.fetch_add(1, Ordering::SeqCst);
                state_tx.send_replace(SchedulerState::Idle);
            }

            state_tx.send_replace(SchedulerState::Stopped);
            info!(target: "scheduler", "scheduler stopped");
        })
    };

    SchedulerHandle {
        shared: Arc::new(Shared {
            trigger,
            pending,
            shutdown: shutdown_tx,
            state: state_rx,
            cycles,
            task: Mutex::new(Some(task)),
        }),
    }
}

impl SchedulerHandle {
    /// Ask for a cycle now. Never starts one while another is running.
    pub fn trigger(&self) {
        self.shared.pending.store(true, Ordering::SeqCst);
        self.shared.trigger.notify_one();
    }

    pub fn state(&self) -> SchedulerState {
        *self.shared.state.borrow()
    }

    pub fn cycles_completed(&self) -> u64 {
        self.shared.cycles.load(Ordering::SeqCst)
    }

    /// Stop after the running cycle (if any) and wait for the task to exit.
    pub async fn stop(&self) {
        self.shared.shutdown.send_replace(true);
        let task = self.shared.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(target: "scheduler", error = %e, "scheduler task failed");
            }
        }
    }
}
