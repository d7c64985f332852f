//! Registry errors.

use hashrush_accounts::AccountError;
use hashrush_core::StoreError;
use hashrush_types::{RoundNumber, UserId};
use thiserror::Error;

/// Errors from participant registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The user has no live entry in the round.
    #[error("{user} has not joined {round}")]
    NotJoined {
        /// Round addressed.
        round: RoundNumber,
        /// User addressed.
        user: UserId,
    },

    /// The round closed while the request was in flight.
    #[error("{0} is closed")]
    RoundClosed(RoundNumber),

    /// The account check failed.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// Backend failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}
