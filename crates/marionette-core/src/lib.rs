pub mod action;
pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod types;

pub use action::{Action, ActionKind, ExecutionResult, Outcome};
pub use config::MarionetteConfig;
pub use control::PauseGate;
pub use error::{MarionetteError, Result};
pub use events::DomainEvent;
pub use types::*;
