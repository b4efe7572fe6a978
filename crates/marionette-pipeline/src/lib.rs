//! Message-to-action pipeline for marionette.
//!
//! Ingests rows from a polled message store, classifies them into typed
//! envelopes, runs them through the priority-ordered handler chain, and
//! buffers the produced actions behind dual token-bucket admission control.

pub mod chain;
pub mod dispatch;
pub mod error;
pub mod factory;
pub mod handler;
pub mod limiter;
pub mod message;
pub mod poller;
pub mod queue;
pub mod store;

pub use chain::{DispatchOutcome, HandlerChain};
pub use dispatch::DispatchLoop;
pub use error::{HandlerError, StoreError};
pub use factory::{Directory, MessageFactory};
pub use handler::{build_records, DispatchContext, Handled, HandlerRecord, MessageHandler};
pub use limiter::{RateLimiter, TokenBucket};
pub use message::{MessageEnvelope, MessageKind, StoreRow};
pub use poller::Poller;
pub use queue::ActionQueue;
pub use store::{InMemoryStore, MessageStore, StoreCursor};
