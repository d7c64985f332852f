//! Mining node.
//!
//! [`MiningNode`] composes the round lifecycle, participant registry,
//! proof verifier, reward distributor, supply ledger and accounts into the
//! request surface a front end talks to: current round, join, heartbeat,
//! submit, leave, plus the read models around them.
//!
//! Every operation takes the current time from the caller and is safe to
//! call from many request handlers at once; all shared state lives behind
//! the store traits of `hashrush-core`.

mod config;
mod error;
mod node;
mod responses;
mod stores;

pub use config::MiningConfig;
pub use error::{ErrorKind, MiningError};
pub use node::MiningNode;
pub use responses::{
    AccountView, ClosedRoundView, CommissionView, HeartbeatReceipt, HistoryEntry, HistoryPage,
    JoinReceipt, MiningStatus, ModeView, Pagination, ParticipationView, PayoutRole, ReferralView,
    RoundView, SubmitReceipt,
};
pub use stores::Stores;

// Re-exported so callers can build configs without depending on every crate.
pub use hashrush_accounts::{EnergyConfig, ReferralConfig};
pub use hashrush_participants::ParticipantConfig;
pub use hashrush_rewards::RewardConfig;
pub use hashrush_supply::SupplyInfo;
pub use hashrush_types::{EmissionSchedule, MiningMode, RoundNumber, Tokens, UserId};
