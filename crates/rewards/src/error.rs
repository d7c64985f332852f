//! Reward errors.

use hashrush_accounts::AccountError;
use hashrush_supply::SupplyError;
use hashrush_types::RoundNumber;
use thiserror::Error;

/// Errors from settlement planning and payout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewardError {
    /// Nothing is left to mint.
    #[error("supply exhausted: {0} cannot be rewarded")]
    SupplyExhausted(RoundNumber),

    /// Supply ledger failure.
    #[error(transparent)]
    Supply(#[from] SupplyError),

    /// Account failure.
    #[error(transparent)]
    Account(#[from] AccountError),
}
