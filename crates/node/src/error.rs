//! Request-level errors.

use hashrush_accounts::AccountError;
use hashrush_core::StoreError;
use hashrush_participants::RegistryError;
use hashrush_rewards::RewardError;
use hashrush_rounds::RoundError;
use hashrush_supply::SupplyError;
use hashrush_types::{MiningMode, RoundNumber, UnknownMode, UserId};
use thiserror::Error;

/// Broad class of a [`MiningError`], used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or inapplicable input; nothing changed.
    Validation,
    /// The caller lacks an unlock.
    Authorization,
    /// Energy or supply ran out.
    ResourceExhaustion,
    /// Another request got there first; re-read and retry.
    RaceLost,
    /// Storage failure.
    Internal,
}

/// Errors returned by [`MiningNode`](crate::MiningNode) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiningError {
    /// Mode name not recognised.
    #[error("unknown mining mode {0:?}")]
    UnknownMode(String),

    /// Caller has no account.
    #[error("{0} is not registered")]
    NotRegistered(UserId),

    /// Identity unusable for registration.
    #[error("invalid identity")]
    InvalidIdentity,

    /// Caller has no live entry in the active round.
    #[error("{0} is not mining the active round")]
    NotJoined(UserId),

    /// Submitted value or nonce does not meet the round's difficulty.
    #[error("proof for {0} is invalid")]
    InvalidProof(RoundNumber),

    /// The mode has not been unlocked.
    #[error("mode {0} is locked")]
    ModeLocked(MiningMode),

    /// Not enough energy for one tick.
    #[error("insufficient energy: need {required}, have {available}")]
    InsufficientEnergy {
        /// Cost of one tick.
        required: u64,
        /// Available after regeneration.
        available: u64,
    },

    /// No headroom left under the supply cap.
    #[error("supply exhausted")]
    SupplyExhausted,

    /// The round was already claimed by someone else.
    #[error("{0} was already claimed")]
    AlreadyClaimed(RoundNumber),

    /// There is no Open round to submit against.
    #[error("no active round")]
    NoActiveRound,

    /// Storage or invariant failure. The request may be retried.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MiningError {
    /// Broad class of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownMode(_)
            | Self::NotRegistered(_)
            | Self::InvalidIdentity
            | Self::NotJoined(_)
            | Self::InvalidProof(_) => ErrorKind::Validation,
            Self::ModeLocked(_) => ErrorKind::Authorization,
            Self::InsufficientEnergy { .. } | Self::SupplyExhausted => {
                ErrorKind::ResourceExhaustion
            }
            Self::AlreadyClaimed(_) | Self::NoActiveRound => ErrorKind::RaceLost,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnknownMode(_) => "invalid_mode",
            Self::NotRegistered(_) => "not_registered",
            Self::InvalidIdentity => "invalid_identity",
            Self::NotJoined(_) => "not_joined",
            Self::InvalidProof(_) => "invalid",
            Self::ModeLocked(_) => "locked",
            Self::InsufficientEnergy { .. } => "energy",
            Self::SupplyExhausted => "supply_exhausted",
            Self::AlreadyClaimed(_) => "already_claimed",
            Self::NoActiveRound => "no_active_round",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<UnknownMode> for MiningError {
    fn from(e: UnknownMode) -> Self {
        Self::UnknownMode(e.0)
    }
}

impl From<StoreError> for MiningError {
    fn from(e: StoreError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<AccountError> for MiningError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::NotFound(user) => Self::NotRegistered(user),
            AccountError::ModeLocked(mode) => Self::ModeLocked(mode),
            AccountError::InsufficientEnergy {
                required,
                available,
            } => Self::InsufficientEnergy {
                required,
                available,
            },
            AccountError::InvalidIdentity(_) => Self::InvalidIdentity,
            AccountError::Store(e) => e.into(),
        }
    }
}

impl From<RegistryError> for MiningError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotJoined { user, .. } => Self::NotJoined(user),
            RegistryError::RoundClosed(round) => Self::AlreadyClaimed(round),
            RegistryError::Account(e) => e.into(),
            RegistryError::Store(e) => e.into(),
        }
    }
}

impl From<RoundError> for MiningError {
    fn from(e: RoundError) -> Self {
        match e {
            RoundError::NotFound(_) => Self::NoActiveRound,
            RoundError::Store(e) => e.into(),
        }
    }
}

impl From<SupplyError> for MiningError {
    fn from(e: SupplyError) -> Self {
        match e {
            SupplyError::CapExceeded { headroom, .. } if headroom.is_zero() => {
                Self::SupplyExhausted
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<RewardError> for MiningError {
    fn from(e: RewardError) -> Self {
        match e {
            RewardError::SupplyExhausted(_) => Self::SupplyExhausted,
            RewardError::Supply(e) => e.into(),
            RewardError::Account(e) => e.into(),
        }
    }
}
