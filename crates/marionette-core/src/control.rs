//! Pipeline intake control.
//!
//! The pause gate suspends the poll and execution loops while a Failed
//! health episode is open, and wakes them when an operator resumes.

use tokio::sync::watch;

/// A cloneable gate the long-lived loops check before doing work.
///
/// Pausing is level-triggered: `wait_ready` returns immediately while the
/// gate is open and suspends the caller (without polling) while it is
/// closed.
#[derive(Clone)]
pub struct PauseGate {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl PauseGate {
    /// Create an open gate.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    /// Close the gate; loops block at their next `wait_ready`.
    pub fn pause(&self) {
        let _ = self.tx.send(true);
    }

    /// Reopen the gate, waking every waiting loop.
    pub fn resume(&self) {
        let _ = self.tx.send(false);
    }

    pub fn is_paused(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the gate is open.
    pub async fn wait_ready(&self) {
        let mut rx = self.rx.clone();
        // wait_for returns immediately if the value already matches.
        let _ = rx.wait_for(|paused| !*paused).await;
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_open_gate_passes_immediately() {
        let gate = PauseGate::new();
        assert!(!gate.is_paused());
        tokio::time::timeout(Duration::from_millis(50), gate.wait_ready())
            .await
            .expect("open gate must not block");
    }

    #[tokio::test]
    async fn test_paused_gate_blocks() {
        let gate = PauseGate::new();
        gate.pause();
        assert!(gate.is_paused());
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), gate.wait_ready()).await;
        assert!(blocked.is_err(), "closed gate must block waiters");
    }

    #[tokio::test]
    async fn test_resume_wakes_waiter() {
        let gate = PauseGate::new();
        gate.pause();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait_ready().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        gate.resume();

        tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .expect("resume must wake the waiter")
            .unwrap();
        assert!(!gate.is_paused());
    }

    #[tokio::test]
    async fn test_pause_resume_idempotent() {
        let gate = PauseGate::new();
        gate.resume();
        assert!(!gate.is_paused());
        gate.pause();
        gate.pause();
        assert!(gate.is_paused());
        gate.resume();
        assert!(!gate.is_paused());
    }
}
