//! HTTP control surface.
//!
//! Remote callers submit actions, watch the event stream over SSE, read
//! health and recent execution results, and clear a Failed episode. The
//! server binds to localhost only.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
