//! Round errors.

use hashrush_core::StoreError;
use hashrush_types::RoundNumber;
use thiserror::Error;

/// Errors from round lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundError {
    /// The round does not exist.
    #[error("{0} does not exist")]
    NotFound(RoundNumber),

    /// Backend failure, or a transition the round's state does not allow.
    #[error(transparent)]
    Store(#[from] StoreError),
}
