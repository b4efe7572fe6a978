//! The execution loop.
//!
//! One task owns the target window. It takes actions off the global queue
//! in arrival order (the queue applies rate-limit admission for sends),
//! runs each with per-attempt and whole-action deadlines, feeds outcomes
//! into the health monitor, and drives recovery itself when the monitor
//! degrades. Nothing else in the process touches the window.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use marionette_core::action::{Action, ExecutionResult, Outcome};
use marionette_core::config::ExecutorConfig;
use marionette_core::control::PauseGate;
use marionette_core::events::DomainEvent;
use marionette_pipeline::limiter::RateLimiter;
use marionette_pipeline::queue::ActionQueue;
use rand::Rng;
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout, Instant};
use tracing::{info, warn};

use crate::driver::ActionDriver;
use crate::health::HealthMonitor;

/// Ring of the most recent execution results, newest last.
pub struct ResultLog {
    inner: Mutex<VecDeque<ExecutionResult>>,
    capacity: usize,
}

impl ResultLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, result: ExecutionResult) {
        if let Ok(mut log) = self.inner.lock() {
            if log.len() >= self.capacity {
                log.pop_front();
            }
            log.push_back(result);
        }
    }

    /// Up to `count` most recent results, newest first.
    pub fn recent(&self, count: usize) -> Vec<ExecutionResult> {
        match self.inner.lock() {
            Ok(log) => log.iter().rev().take(count).cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|log| log.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Executor {
    queue: Arc<ActionQueue>,
    limiter: Arc<RateLimiter>,
    driver: ActionDriver,
    monitor: Arc<HealthMonitor>,
    results: Arc<ResultLog>,
    events: broadcast::Sender<DomainEvent>,
    gate: PauseGate,
    config: ExecutorConfig,
}

impl Executor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: Arc<ActionQueue>,
        limiter: Arc<RateLimiter>,
        driver: ActionDriver,
        monitor: Arc<HealthMonitor>,
        results: Arc<ResultLog>,
        events: broadcast::Sender<DomainEvent>,
        gate: PauseGate,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            queue,
            limiter,
            driver,
            monitor,
            results,
            events,
            gate,
            config,
        }
    }

    /// Drain the queue forever.
    pub async fn run(self: Arc<Self>) {
        info!("Execution loop started");
        loop {
            self.gate.wait_ready().await;
            let action = self.queue.dequeue(&self.limiter).await;
            self.step(action).await;
        }
    }

    /// Execute one action and feed the outcome into health tracking.
    /// Public for tests; `run` is a loop around this.
    pub async fn step(&self, action: Action) {
        if action.kind.is_send() {
            // Humanizing pause before content lands in a conversation,
            // jittered so sends do not tick like a metronome.
            let base = self.config.action_delay_ms;
            let jitter = if base > 0 {
                rand::rng().random_range(0..=base / 2)
            } else {
                0
            };
            sleep(Duration::from_millis(base + jitter)).await;
        }

        let result = self.execute(&action).await;
        self.results.push(result.clone());
        let _ = self.events.send(DomainEvent::ActionExecuted {
            result: result.clone(),
        });

        if result.outcome.is_success() {
            self.monitor.record_success();
        } else if self.monitor.record_failure() {
            self.recover().await;
        }
    }

    async fn execute(&self, action: &Action) -> ExecutionResult {
        let deadline = Instant::now() + Duration::from_millis(self.config.action_timeout_ms);
        let attempt_budget = Duration::from_millis(self.config.attempt_timeout_ms);
        let mut last_error = String::new();

        for attempt in 1..=self.config.max_retries {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(
                    action = action.kind.label(),
                    id = %action.id,
                    attempt,
                    "Action deadline exhausted"
                );
                return ExecutionResult::failure(
                    action,
                    Outcome::TimedOut,
                    attempt - 1,
                    last_error,
                );
            }

            match timeout(attempt_budget.min(remaining), self.driver.perform(action)).await {
                Ok(Ok(())) => return ExecutionResult::success(action, attempt),
                Ok(Err(err)) => {
                    warn!(
                        action = action.kind.label(),
                        id = %action.id,
                        attempt,
                        error = %err,
                        "Attempt failed"
                    );
                    last_error = err.to_string();
                }
                Err(_) => {
                    warn!(
                        action = action.kind.label(),
                        id = %action.id,
                        attempt,
                        "Attempt timed out"
                    );
                    last_error = "attempt timed out".to_string();
                }
            }

            if attempt < self.config.max_retries {
                sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
            }
        }

        ExecutionResult::failure(
            action,
            Outcome::RetryExhausted,
            self.config.max_retries,
            last_error,
        )
    }

    /// Probe the window until it answers or the attempt budget is spent.
    async fn recover(&self) {
        self.monitor.begin_recovery();
        let budget = Duration::from_millis(self.config.attempt_timeout_ms);
        loop {
            let probe = timeout(budget, self.driver.probe()).await;
            match probe {
                Ok(Ok(())) => {
                    info!("Recovery probe succeeded");
                    self.monitor.recovery_succeeded();
                    return;
                }
                Ok(Err(err)) => {
                    warn!(error = %err, "Recovery probe failed");
                    if !self.monitor.attempt_spent() {
                        let artifact = self.driver.login_artifact().await.ok().flatten();
                        self.monitor.recovery_failed(&err.to_string(), artifact).await;
                        return;
                    }
                }
                Err(_) => {
                    warn!("Recovery probe timed out");
                    if !self.monitor.attempt_spent() {
                        self.monitor
                            .recovery_failed("recovery probe timed out", None)
                            .await;
                        return;
                    }
                }
            }
            sleep(Duration::from_secs(self.monitor.cooldown_secs())).await;
        }
    }
}
