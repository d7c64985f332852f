//! Round lifecycle management.
//!
//! There is at most one active round at a time. It is created lazily by
//! the first request that finds none, claimed by exactly one valid proof,
//! and closed exactly once after its settlement has been attached:
//!
//! ```text
//! (none) ──create──▶ Open ──claim──▶ Locked ──attach settlement──▶ Locked* ──close──▶ Closed
//!                      ▲               │
//!                      └───release─────┘  (only before a settlement is attached)
//! ```

mod error;
mod manager;
mod store;

pub use error::RoundError;
pub use manager::RoundLifecycleManager;
pub use store::InMemoryRoundStore;
