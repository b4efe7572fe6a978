//! Global FIFO action buffer.
//!
//! Every handler on every message feeds this one queue, and the executor
//! drains it in strict arrival order. Admission control happens at
//! dequeue time so tokens are only spent when an action is actually about
//! to run, and an idle queue never burns budget.

use std::collections::VecDeque;

use marionette_core::action::Action;
use tokio::sync::{Mutex, Notify};
use tracing::warn;

use crate::limiter::RateLimiter;

/// Bounded FIFO of pending actions.
///
/// Multiple producers, one consumer. The executor is the only caller of
/// [`dequeue`](ActionQueue::dequeue). The dispatch loop enqueues with
/// backpressure so handler-produced actions are never lost; the API uses
/// [`try_enqueue`](ActionQueue::try_enqueue) so a remote caller gets an
/// immediate rejection instead of a hung request.
pub struct ActionQueue {
    inner: Mutex<VecDeque<Action>>,
    notify: Notify,
    space: Notify,
    capacity: usize,
}

impl ActionQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            space: Notify::new(),
            capacity,
        }
    }

    /// Append an action, waiting for a free slot when the queue is at
    /// capacity. An action handed to this method is never dropped.
    pub async fn enqueue(&self, action: Action) {
        loop {
            let freed = self.space.notified();
            {
                let mut queue = self.inner.lock().await;
                if queue.len() < self.capacity {
                    queue.push_back(action);
                    drop(queue);
                    self.notify.notify_one();
                    return;
                }
            }
            warn!(
                action = action.kind.label(),
                capacity = self.capacity,
                "Action queue full, waiting for space"
            );
            freed.await;
        }
    }

    /// Append an action only if a slot is free. Returns `false` and drops
    /// the action when the queue is at capacity.
    pub async fn try_enqueue(&self, action: Action) -> bool {
        let mut queue = self.inner.lock().await;
        if queue.len() >= self.capacity {
            warn!(
                action = action.kind.label(),
                capacity = self.capacity,
                "Action queue full, rejecting action"
            );
            return false;
        }
        queue.push_back(action);
        drop(queue);
        self.notify.notify_one();
        true
    }

    /// Take the next action in arrival order, waiting for one if the
    /// queue is empty.
    ///
    /// Send actions pass the rate limiter before they are popped, so a
    /// long admission wait delays the head of the queue but never
    /// reorders it. Non-send actions are not rate limited.
    pub async fn dequeue(&self, limiter: &RateLimiter) -> Action {
        loop {
            let head_is_send = loop {
                let notified = self.notify.notified();
                {
                    let queue = self.inner.lock().await;
                    if let Some(front) = queue.front() {
                        break front.kind.is_send();
                    }
                }
                notified.await;
            };

            if head_is_send {
                limiter.admit().await;
            }

            let mut queue = self.inner.lock().await;
            if let Some(action) = queue.pop_front() {
                drop(queue);
                self.space.notify_one();
                return action;
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
