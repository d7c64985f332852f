//! Reward distribution.
//!
//! Settling a round happens in two steps. [`RewardDistributor::plan`]
//! computes the whole [`Settlement`] (clamped reward, finder and pool
//! shares, referral commissions) from a snapshot of the online pool and
//! the supply headroom. The caller attaches that record to the round, and
//! [`RewardDistributor::apply`] then mints and credits it. Both halves of
//! `apply` are keyed by the round number, so replaying an attached
//! settlement after a failure pays nothing twice.
//!
//! [`Settlement`]: hashrush_types::Settlement

mod distributor;
mod error;
mod split;

pub use distributor::{RewardConfig, RewardDistributor};
pub use error::RewardError;
pub use split::{split_reward, RewardSplit};
