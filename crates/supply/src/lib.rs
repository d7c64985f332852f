//! Supply ledger: the single monotonic mint counter under a hard cap.
//!
//! Settlements clamp their reward to [`SupplyLedger::headroom`] before
//! minting, and the store refuses any mint that would still push the total
//! over the cap. A mint is keyed by its round number so a retried
//! settlement never mints twice.

mod ledger;
mod store;

pub use ledger::{SupplyError, SupplyInfo, SupplyLedger};
pub use store::InMemorySupplyStore;
