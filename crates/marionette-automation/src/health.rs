//! Target health tracking and operator escalation.
//!
//! The monitor is a small state machine fed by the executor:
//!
//! Healthy -> Degraded after `failure_threshold` consecutive failures,
//! Degraded -> Recovering while the executor probes the window,
//! Recovering -> Healthy on a successful probe,
//! Recovering -> Failed once `max_attempts` probes are spent.
//!
//! Entering Failed closes the pause gate and escalates to the operator
//! exactly once per episode. Only an operator resume leaves Failed.

use std::sync::Mutex;

use marionette_core::config::RecoveryConfig;
use marionette_core::control::PauseGate;
use marionette_core::events::DomainEvent;
use marionette_core::types::{HealthState, Timestamp};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::notify::{EscalationPayload, Notifier};

struct Inner {
    state: HealthState,
    consecutive_failures: u32,
    recovery_attempts: u32,
    /// Set when the current Failed episode has already been escalated.
    episode_notified: bool,
}

pub struct HealthMonitor {
    inner: Mutex<Inner>,
    config: RecoveryConfig,
    gate: PauseGate,
    notifier: std::sync::Arc<dyn Notifier>,
    events: broadcast::Sender<DomainEvent>,
}

impl HealthMonitor {
    pub fn new(
        config: RecoveryConfig,
        gate: PauseGate,
        notifier: std::sync::Arc<dyn Notifier>,
        events: broadcast::Sender<DomainEvent>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: HealthState::Healthy,
                consecutive_failures: 0,
                recovery_attempts: 0,
                episode_notified: false,
            }),
            config,
            gate,
            notifier,
            events,
        }
    }

    pub fn state(&self) -> HealthState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// Maximum probe attempts per recovery episode.
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    pub fn cooldown_secs(&self) -> u64 {
        self.config.cooldown_secs
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn transition(&self, inner: &mut Inner, to: HealthState) {
        let from = inner.state;
        if from == to {
            return;
        }
        info!(%from, %to, "Health state changed");
        inner.state = to;
        let _ = self.events.send(DomainEvent::HealthChanged {
            from,
            to,
            timestamp: Timestamp::now(),
        });
    }

    /// Record a successful action. Resets the failure streak and clears a
    /// Degraded state.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = 0;
        if inner.state == HealthState::Degraded {
            self.transition(&mut inner, HealthState::Healthy);
        }
    }

    /// Record a failed action. Returns `true` when the failure streak
    /// just crossed the threshold and the executor should start recovery.
    pub fn record_failure(&self) -> bool {
        let mut inner = self.lock();
        inner.consecutive_failures += 1;
        if inner.state == HealthState::Healthy
            && inner.consecutive_failures >= self.config.failure_threshold
        {
            warn!(
                failures = inner.consecutive_failures,
                threshold = self.config.failure_threshold,
                "Failure threshold crossed"
            );
            self.transition(&mut inner, HealthState::Degraded);
            return true;
        }
        false
    }

    /// Enter Recovering. Called by the executor before its first probe.
    pub fn begin_recovery(&self) {
        let mut inner = self.lock();
        inner.recovery_attempts = 0;
        self.transition(&mut inner, HealthState::Recovering);
    }

    /// Record one spent probe attempt. Returns `true` while more attempts
    /// remain in this episode.
    pub fn attempt_spent(&self) -> bool {
        let mut inner = self.lock();
        inner.recovery_attempts += 1;
        inner.recovery_attempts < self.config.max_attempts
    }

    /// A probe succeeded: the episode is over and the target is healthy.
    pub fn recovery_succeeded(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = 0;
        inner.recovery_attempts = 0;
        self.transition(&mut inner, HealthState::Healthy);
    }

    /// All probe attempts are spent: enter Failed, pause the pipeline,
    /// and escalate to the operator once for this episode.
    pub async fn recovery_failed(&self, reason: &str, artifact_url: Option<String>) {
        let should_notify = {
            let mut inner = self.lock();
            self.transition(&mut inner, HealthState::Failed);
            if inner.episode_notified {
                false
            } else {
                inner.episode_notified = true;
                true
            }
        };
        self.gate.pause();

        if !should_notify {
            return;
        }
        let message = format!("Automation target unrecoverable: {reason}");
        let payload = EscalationPayload {
            message: message.clone(),
            state: HealthState::Failed,
            artifact_url,
            timestamp: Timestamp::now(),
        };
        match self.notifier.notify(&payload).await {
            Ok(()) => {
                let _ = self.events.send(DomainEvent::EscalationSent {
                    message,
                    timestamp: Timestamp::now(),
                });
            }
            Err(err) => {
                // The episode stays marked as notified; repeating a failed
                // escalation on every queued action would spam the channel.
                error!(error = %err, "Escalation delivery failed");
            }
        }
    }

    /// Operator acknowledgment: clear the Failed episode and reopen the
    /// pipeline. Returns `false` if the monitor was not Failed.
    pub fn resume(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != HealthState::Failed {
            return false;
        }
        inner.consecutive_failures = 0;
        inner.recovery_attempts = 0;
        inner.episode_notified = false;
        self.transition(&mut inner, HealthState::Healthy);
        drop(inner);
        self.gate.resume();
        let _ = self.events.send(DomainEvent::OperatorResumed {
            timestamp: Timestamp::now(),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::error::NotifyError;
    use async_trait::async_trait;

    #[derive(Default)]
    struct CountingNotifier {
        sent: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn notify(&self, _payload: &EscalationPayload) -> Result<(), NotifyError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NotifyError::Delivery("down".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn monitor(threshold: u32) -> (HealthMonitor, Arc<CountingNotifier>, PauseGate) {
        let notifier = Arc::new(CountingNotifier::default());
        let gate = PauseGate::new();
        let (events, _) = broadcast::channel(32);
        let monitor = HealthMonitor::new(
            RecoveryConfig {
                failure_threshold: threshold,
                max_attempts: 3,
                cooldown_secs: 0,
            },
            gate.clone(),
            notifier.clone(),
            events,
        );
        (monitor, notifier, gate)
    }

    #[test]
    fn test_threshold_crossing_degrades_once() {
        let (monitor, _, _) = monitor(3);
        assert!(!monitor.record_failure());
        assert!(!monitor.record_failure());
        assert!(monitor.record_failure());
        assert_eq!(monitor.state(), HealthState::Degraded);
        // Further failures while degraded do not re-trigger.
        assert!(!monitor.record_failure());
    }

    #[test]
    fn test_success_resets_streak() {
        let (monitor, _, _) = monitor(3);
        monitor.record_failure();
        monitor.record_failure();
        monitor.record_success();
        assert_eq!(monitor.consecutive_failures(), 0);
        assert!(!monitor.record_failure());
        assert_eq!(monitor.state(), HealthState::Healthy);
    }

    #[test]
    fn test_success_clears_degraded() {
        let (monitor, _, _) = monitor(1);
        monitor.record_failure();
        assert_eq!(monitor.state(), HealthState::Degraded);
        monitor.record_success();
        assert_eq!(monitor.state(), HealthState::Healthy);
    }

    #[test]
    fn test_recovery_success_path() {
        let (monitor, _, _) = monitor(1);
        monitor.record_failure();
        monitor.begin_recovery();
        assert_eq!(monitor.state(), HealthState::Recovering);
        monitor.recovery_succeeded();
        assert_eq!(monitor.state(), HealthState::Healthy);
        assert_eq!(monitor.consecutive_failures(), 0);
    }

    #[test]
    fn test_attempt_budget() {
        let (monitor, _, _) = monitor(1);
        monitor.begin_recovery();
        assert!(monitor.attempt_spent());
        assert!(monitor.attempt_spent());
        assert!(!monitor.attempt_spent());
    }

    #[tokio::test]
    async fn test_failed_pauses_and_escalates_once() {
        let (monitor, notifier, gate) = monitor(1);
        monitor.record_failure();
        monitor.begin_recovery();
        monitor.recovery_failed("probe exhausted", None).await;

        assert_eq!(monitor.state(), HealthState::Failed);
        assert!(gate.is_paused());
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 1);

        // A second failure report in the same episode must not re-notify.
        monitor.recovery_failed("probe exhausted", None).await;
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resume_clears_episode_for_next_escalation() {
        let (monitor, notifier, gate) = monitor(1);
        monitor.recovery_failed("first episode", None).await;
        assert!(monitor.resume());
        assert_eq!(monitor.state(), HealthState::Healthy);
        assert!(!gate.is_paused());

        // A fresh episode escalates again.
        monitor.recovery_failed("second episode", None).await;
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_resume_is_noop_unless_failed() {
        let (monitor, _, _) = monitor(1);
        assert!(!monitor.resume());
        assert_eq!(monitor.state(), HealthState::Healthy);
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_retry() {
        let notifier = Arc::new(CountingNotifier {
            sent: AtomicUsize::new(0),
            fail: true,
        });
        let (events, _) = broadcast::channel(32);
        let monitor = HealthMonitor::new(
            RecoveryConfig {
                failure_threshold: 1,
                max_attempts: 3,
                cooldown_secs: 0,
            },
            PauseGate::new(),
            notifier.clone(),
            events,
        );
        monitor.recovery_failed("boom", None).await;
        monitor.recovery_failed("boom", None).await;
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 1);
    }
}
