//! Cycle scheduler
//!
//! One cycle is a full pass over the inventory:
//!
//! ```text
//!   plan routes ──► spawn one task per endpoint
//!                     │  Fast           ─► fast pool ─► FastProbe
//!                     │  Heavy          ─► heavy pool ─► HeavyProber
//!                     │  FastThenHeavy  ─► fast pool, release, then heavy pool
//!                     ▼
//!   mpsc (index, outcome) in completion order ──► CycleCollector
//!                     ▼
//!   seal (inventory order) ──► metrics, logs ──► SinkSet ──► sleep(interval)
//! ```
//!
//! Cycles never overlap: the next one starts only after the previous
//! snapshot has been handed to every sink and the interval has elapsed.

pub mod collector;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

use crate::config::{Config, MonitorConfig};
use crate::error::Result;
use crate::models::{CycleSnapshot, Endpoint, HeavySettings, ProbeOutcome, ProbeTier};
use crate::output::SinkSet;
use crate::probe::{CyclePlan, FastProbe, HeavyProber, HttpProber, Route, WebDriverClient};

pub use collector::{CycleCollector, SlotError};

// ============================================================================
// Settings and State
// ============================================================================

/// Scheduler timing and pool sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Sleep after a cycle has been handed off
    pub interval: Duration,

    /// Concurrent fast probes
    pub fast_workers: usize,

    /// Concurrent browser sessions
    pub heavy_workers: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            fast_workers: 10,
            heavy_workers: 2,
        }
    }
}

impl From<&MonitorConfig> for SchedulerSettings {
    fn from(monitor: &MonitorConfig) -> Self {
        Self {
            interval: monitor.interval(),
            fast_workers: monitor.fast_workers.max(1),
            heavy_workers: monitor.heavy_workers.max(1),
        }
    }
}

/// Whether a cycle is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Read-only view of the scheduler state, shareable across tasks
#[derive(Debug, Clone, Default)]
pub struct StateHandle {
    running: Arc<AtomicBool>,
}

impl StateHandle {
    pub fn get(&self) -> SchedulerState {
        if self.running.load(Ordering::SeqCst) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    fn set(&self, state: SchedulerState) {
        self.running
            .store(state == SchedulerState::Running, Ordering::SeqCst);
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Runs probe cycles over a fixed inventory
pub struct CycleScheduler {
    endpoints: Arc<[Endpoint]>,
    fast: Arc<dyn FastProbe>,
    heavy: Arc<HeavyProber>,
    sinks: SinkSet,
    settings: SchedulerSettings,
    state: StateHandle,
    cycle: u64,
}

impl CycleScheduler {
    pub fn new(
        endpoints: Vec<Endpoint>,
        fast: Arc<dyn FastProbe>,
        heavy: Arc<HeavyProber>,
        sinks: SinkSet,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            endpoints: endpoints.into(),
            fast,
            heavy,
            sinks,
            settings,
            state: StateHandle::default(),
            cycle: 0,
        }
    }

    /// Wire up the real probers and sinks described by a validated `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let fast = HttpProber::new(config.monitor.fast_timeout())?;
        let driver = WebDriverClient::new(&config.browser)?;
        let heavy = HeavyProber::new(Arc::new(driver))
            .with_settle(config.monitor.settle())
            .with_retry_delay(config.monitor.heavy_retry_delay());
        let sinks = SinkSet::from_config(&config.output)?;

        Ok(Self::new(
            config.resolve_endpoints(),
            Arc::new(fast),
            Arc::new(heavy),
            sinks,
            SchedulerSettings::from(&config.monitor),
        ))
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn settings(&self) -> SchedulerSettings {
        self.settings
    }

    pub fn state(&self) -> SchedulerState {
        self.state.get()
    }

    pub fn state_handle(&self) -> StateHandle {
        self.state.clone()
    }

    /// Number of cycles started so far
    pub fn cycles_run(&self) -> u64 {
        self.cycle
    }

    /// Run one full cycle and hand the sealed snapshot to every sink
    pub async fn run_cycle(&mut self) -> CycleSnapshot {
        self.state.set(SchedulerState::Running);
        self.cycle += 1;
        let cycle = self.cycle;

        let plan = CyclePlan::new(&self.endpoints);
        tracing::info!(
            cycle = cycle,
            endpoints = self.endpoints.len(),
            fast_first = plan.fast_first_count(),
            heavy_only = plan.heavy_only_count(),
            fast_workers = self.settings.fast_workers,
            heavy_workers = self.settings.heavy_workers,
            "Starting cycle"
        );

        let snapshot = self.collect(cycle, &plan).await;

        crate::metrics::record_cycle(&snapshot);
        tracing::info!(
            cycle = cycle,
            up = snapshot.up_count(),
            down = snapshot.down_count(),
            elapsed_ms = snapshot.elapsed_ms,
            "Cycle complete"
        );

        let failures = self.sinks.deliver_all(&snapshot).await;
        if failures > 0 {
            tracing::warn!(cycle = cycle, failures = failures, "Some sinks failed");
        }

        self.state.set(SchedulerState::Idle);
        snapshot
    }

    /// Run cycles until `max_cycles` is reached or `shutdown` resolves
    ///
    /// Shutdown never interrupts a cycle in progress: the current cycle is
    /// finished and handed off first. Returns the number of completed cycles.
    pub async fn run_until<F>(&mut self, max_cycles: Option<u64>, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut completed = 0;

        if max_cycles == Some(0) {
            return completed;
        }

        loop {
            let mut stop = false;
            {
                let cycle = self.run_cycle();
                tokio::pin!(cycle);

                tokio::select! {
                    _ = &mut cycle => {}
                    _ = &mut shutdown => {
                        tracing::info!("Shutdown requested, finishing current cycle");
                        stop = true;
                        (&mut cycle).await;
                    }
                }
            }
            completed += 1;

            if stop {
                break;
            }

            if max_cycles.is_some_and(|max| completed >= max) {
                tracing::info!(cycles = completed, "Cycle limit reached");
                break;
            }

            tracing::debug!(
                interval_secs = self.settings.interval.as_secs(),
                "Sleeping until next cycle"
            );
            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {}
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                }
            }
        }

        completed
    }

    async fn collect(&self, cycle: u64, plan: &CyclePlan) -> CycleSnapshot {
        let total = self.endpoints.len();
        let fast_pool = Arc::new(Semaphore::new(self.settings.fast_workers.max(1)));
        let heavy_pool = Arc::new(Semaphore::new(self.settings.heavy_workers.max(1)));
        let (tx, mut rx) = mpsc::channel::<(usize, ProbeOutcome)>(total.max(1));

        let handles: Vec<JoinHandle<()>> = plan
            .routes()
            .iter()
            .enumerate()
            .map(|(index, route)| {
                let task = ProbeTask {
                    index,
                    route: *route,
                    endpoints: Arc::clone(&self.endpoints),
                    fast: Arc::clone(&self.fast),
                    heavy: Arc::clone(&self.heavy),
                    fast_pool: Arc::clone(&fast_pool),
                    heavy_pool: Arc::clone(&heavy_pool),
                };
                let tx = tx.clone();

                tokio::spawn(async move {
                    let outcome = task.run().await;
                    if tx.send((task.index, outcome)).await.is_err() {
                        tracing::error!(index = task.index, "Result channel closed");
                    }
                })
            })
            .collect();

        drop(tx);

        let mut collector = CycleCollector::new(cycle, total);
        while let Some((index, outcome)) = rx.recv().await {
            if let Some(endpoint) = self.endpoints.get(index) {
                log_outcome(endpoint, &outcome);
            }
            crate::metrics::record_probe(&outcome);

            if let Err(e) = collector.record(index, outcome) {
                tracing::error!(index = index, error = ?e, "Discarding probe outcome");
            }
        }

        let joined = futures::future::join_all(handles).await;
        for (index, result) in joined.into_iter().enumerate() {
            if let Err(e) = result {
                let name = self
                    .endpoints
                    .get(index)
                    .map(|endpoint| endpoint.name.as_str())
                    .unwrap_or_default();
                tracing::error!(
                    endpoint = %name,
                    error = %e,
                    "Probe task crashed; reporting endpoint as not checked"
                );
            }
        }

        collector.seal(&self.endpoints, |index| match plan.route(index) {
            Route::Heavy(_) => ProbeTier::Heavy,
            _ => ProbeTier::Fast,
        })
    }
}

// ============================================================================
// Probe Task
// ============================================================================

/// Everything one spawned probe task needs
struct ProbeTask {
    index: usize,
    route: Route,
    endpoints: Arc<[Endpoint]>,
    fast: Arc<dyn FastProbe>,
    heavy: Arc<HeavyProber>,
    fast_pool: Arc<Semaphore>,
    heavy_pool: Arc<Semaphore>,
}

impl ProbeTask {
    async fn run(&self) -> ProbeOutcome {
        let Some(endpoint) = self.endpoints.get(self.index) else {
            return ProbeOutcome::not_checked(ProbeTier::Fast);
        };

        match self.route {
            Route::Fast => self.run_fast(endpoint).await,
            Route::Heavy(settings) => self.run_heavy(endpoint, settings, None).await,
            Route::FastThenHeavy(_) => {
                let first = self.run_fast(endpoint).await;
                match self.route.escalation(&first) {
                    Some(settings) => {
                        tracing::info!(
                            endpoint = %endpoint.name,
                            error = %first.error_detail,
                            "No response on fast tier, escalating to browser"
                        );
                        let mut outcome =
                            self.run_heavy(endpoint, settings, first.status.code()).await;
                        outcome.latency += first.latency;
                        outcome
                    }
                    None => first,
                }
            }
        }
    }

    /// Fast probe holding a fast-pool permit only for its own duration
    async fn run_fast(&self, endpoint: &Endpoint) -> ProbeOutcome {
        let Ok(_permit) = self.fast_pool.acquire().await else {
            return ProbeOutcome::not_checked(ProbeTier::Fast);
        };
        self.fast.probe(endpoint).await
    }

    /// Heavy probe holding one heavy-pool permit across all attempts
    async fn run_heavy(
        &self,
        endpoint: &Endpoint,
        settings: HeavySettings,
        prior_status: Option<u16>,
    ) -> ProbeOutcome {
        let Ok(_permit) = self.heavy_pool.acquire().await else {
            return ProbeOutcome::not_checked(ProbeTier::Heavy);
        };
        self.heavy.probe(endpoint, settings, prior_status).await
    }
}

fn log_outcome(endpoint: &Endpoint, outcome: &ProbeOutcome) {
    let latency_ms = crate::utils::duration_millis(outcome.latency);

    if outcome.ok {
        tracing::info!(
            endpoint = %endpoint.name,
            tier = outcome.tier.as_str(),
            status = %outcome.status,
            latency_ms = latency_ms,
            attempts = outcome.attempts,
            "ONLINE"
        );
    } else {
        tracing::warn!(
            endpoint = %endpoint.name,
            tier = outcome.tier.as_str(),
            status = %outcome.status,
            latency_ms = latency_ms,
            attempts = outcome.attempts,
            kind = outcome.error_kind.map(|k| k.as_str()).unwrap_or_default(),
            error = %outcome.error_detail,
            "OFFLINE"
        );
    }
}
