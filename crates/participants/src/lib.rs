//! Participant registry.
//!
//! Tracks which miners are active in a round. Entries are keyed by
//! `(round, user)` and every update addresses a single entry, so concurrent
//! heartbeats from different miners never contend on a shared record.
//! Liveness is enforced by heartbeat timeout: an entry not refreshed within
//! the timeout is treated as absent and purged before anyone counts the
//! online pool.

mod error;
mod registry;
mod store;

pub use error::RegistryError;
pub use registry::{HeartbeatOutcome, Joined, ParticipantConfig, ParticipantRegistry, StopReason};
pub use store::InMemoryParticipantStore;
