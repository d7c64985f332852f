//! Supply ledger facade over a [`SupplyStore`].

use hashrush_core::{MintOutcome, StoreError, SupplySnapshot, SupplyStore};
use hashrush_types::{RoundNumber, Tokens};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from the supply ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupplyError {
    /// The mint would push the total over the cap.
    #[error("mint of {requested} refused: only {headroom} left under the cap")]
    CapExceeded {
        /// Amount the caller tried to mint.
        requested: Tokens,
        /// Headroom at the time of the attempt.
        headroom: Tokens,
    },

    /// Backend failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Public view of the supply counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyInfo {
    /// Minted so far.
    pub total_minted: Tokens,
    /// Hard cap.
    pub total_supply: Tokens,
    /// Cap minus minted.
    pub remaining: Tokens,
    /// Last round whose settlement was minted.
    pub last_block_number: Option<u64>,
}

impl From<SupplySnapshot> for SupplyInfo {
    fn from(snapshot: SupplySnapshot) -> Self {
        Self {
            total_minted: snapshot.minted,
            total_supply: snapshot.cap,
            remaining: snapshot.headroom(),
            last_block_number: snapshot.last_round.map(|r| r.0),
        }
    }
}

/// The global mint counter.
#[derive(Clone)]
pub struct SupplyLedger {
    store: Arc<dyn SupplyStore>,
}

impl SupplyLedger {
    /// Wrap a supply store.
    pub fn new(store: Arc<dyn SupplyStore>) -> Self {
        Self { store }
    }

    /// Remaining mintable amount.
    pub fn headroom(&self) -> Result<Tokens, SupplyError> {
        Ok(self.store.snapshot()?.headroom())
    }

    /// Atomically add a settlement's payout for `round`.
    ///
    /// Replaying the mint of an already-recorded round is a no-op that
    /// returns the current snapshot. A mint that does not fit under the cap
    /// is refused and nothing is written.
    pub fn record_mint(
        &self,
        round: RoundNumber,
        amount: Tokens,
    ) -> Result<SupplySnapshot, SupplyError> {
        match self.store.mint(round, amount)? {
            MintOutcome::Minted(snapshot) => {
                info!(
                    round = round.0,
                    %amount,
                    minted = %snapshot.minted,
                    headroom = %snapshot.headroom(),
                    "Recorded mint"
                );
                Ok(snapshot)
            }
            MintOutcome::AlreadyRecorded(snapshot) => {
                debug!(round = round.0, %amount, "Mint already recorded for round");
                Ok(snapshot)
            }
            MintOutcome::Refused(snapshot) => {
                warn!(
                    round = round.0,
                    requested = %amount,
                    headroom = %snapshot.headroom(),
                    "Refused mint over supply cap"
                );
                Err(SupplyError::CapExceeded {
                    requested: amount,
                    headroom: snapshot.headroom(),
                })
            }
        }
    }

    /// Current counter values.
    pub fn info(&self) -> Result<SupplyInfo, SupplyError> {
        Ok(self.store.snapshot()?.into())
    }

    /// Raw snapshot.
    pub fn snapshot(&self) -> Result<SupplySnapshot, SupplyError> {
        Ok(self.store.snapshot()?)
    }
}

impl std::fmt::Debug for SupplyLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupplyLedger").finish_non_exhaustive()
    }
}
