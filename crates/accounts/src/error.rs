//! Account errors.

use hashrush_core::StoreError;
use hashrush_types::{MiningMode, UserId};
use thiserror::Error;

/// Errors from account operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    /// No account for this user.
    #[error("{0} is not registered")]
    NotFound(UserId),

    /// The mode has not been unlocked.
    #[error("mode {0} is locked")]
    ModeLocked(MiningMode),

    /// Not enough energy for one tick.
    #[error("insufficient energy: need {required}, have {available}")]
    InsufficientEnergy {
        /// Cost of one tick.
        required: u64,
        /// Energy after regeneration.
        available: u64,
    },

    /// Identity was empty or otherwise unusable.
    #[error("invalid identity: {0:?}")]
    InvalidIdentity(String),

    /// Backend failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}
