//! UI automation against the single exclusive chat-client window.
//!
//! The executor drains the action queue and drives the target through a
//! locator and an input surface. Health tracking, recovery, and operator
//! escalation live here too, because only the execution loop is allowed
//! to touch the window.

pub mod driver;
pub mod error;
pub mod executor;
pub mod health;
pub mod locator;
pub mod notify;

pub use driver::ActionDriver;
pub use error::{ExecuteError, LocateError, NotifyError};
pub use executor::{Executor, ResultLog};
pub use health::HealthMonitor;
pub use locator::{InputSurface, LoggingSurface, SidebarLocator, TargetSpec, UiLocator, UiRegion};
pub use notify::{EscalationPayload, LogNotifier, Notifier, WebhookNotifier};
