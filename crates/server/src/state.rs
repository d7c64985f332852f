//! Shared handler state.

use hashrush_node::MiningNode;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current time, as a duration since the Unix epoch.
pub type Clock = Arc<dyn Fn() -> Duration + Send + Sync>;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub node: MiningNode,
    clock: Clock,
}

impl AppState {
    /// State reading the system clock.
    pub fn new(node: MiningNode) -> Self {
        Self::with_clock(node, Arc::new(system_now))
    }

    /// State reading a caller-supplied clock.
    pub fn with_clock(node: MiningNode, clock: Clock) -> Self {
        Self { node, clock }
    }

    /// Current time.
    pub fn now(&self) -> Duration {
        (self.clock)()
    }
}

fn system_now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}
