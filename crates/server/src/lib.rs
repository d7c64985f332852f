//! HTTP surface for the hashrush mining node.
//!
//! Routes are thin: each handler reads the caller from the `x-user-id`
//! header, takes the time from the state's clock, calls one
//! [`MiningNode`](hashrush_node::MiningNode) operation and serializes the
//! result. Errors become `{ "error", "reason" }` bodies with a status code
//! chosen by the error's kind.

mod api;
mod config;
mod error;
mod extract;
mod state;

pub use api::router;
pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
pub use extract::{Caller, USER_HEADER};
pub use state::{AppState, Clock};
