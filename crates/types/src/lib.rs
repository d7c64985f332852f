//! Core types for the hashrush mining round engine.
//!
//! This crate provides the fundamental types shared by every component:
//!
//! - **Identifiers**: `UserId`, `RoundNumber`
//! - **Digests**: SHA-256 `Digest` with nibble-level difficulty counting
//! - **Amounts**: fixed-point `Tokens`
//! - **Rounds**: `Round`, `RoundStatus`, `Settlement` and friends
//! - **Participants**: ephemeral per-round `ParticipantEntry`
//! - **Accounts**: per-user balances, energy and unlocks
//! - **Emission**: halving reward and difficulty schedule

mod account;
mod digest;
mod emission;
mod identifiers;
mod mode;
mod participant;
mod round;
mod tokens;

pub use account::{Account, DEFAULT_ENERGY};
pub use digest::{Digest, HexError};
pub use emission::EmissionSchedule;
pub use identifiers::{RoundNumber, UserId};
pub use mode::{MiningMode, UnknownMode};
pub use participant::ParticipantEntry;
pub use round::{Commission, Payout, Round, RoundCounters, RoundProof, RoundStatus, Settlement};
pub use tokens::Tokens;
