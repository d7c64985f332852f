//! Core seams for the hashrush mining engine.
//!
//! The components (rounds, participants, accounts, supply, rewards) share
//! state only through the storage traits defined here. Each trait method is
//! one atomic backend operation; the traits are the only place where
//! atomicity is promised, so a backend swap never changes component logic.

mod error;
mod traits;

pub use error::StoreError;
pub use traits::{
    AccountStore, ClaimOutcome, CommissionRecord, Credit, CreditKind, MintOutcome,
    ParticipantStore, ReferralDirectory, RoundStore, SupplySnapshot, SupplyStore,
};
