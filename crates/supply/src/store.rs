//! In-memory supply counter.

use hashrush_core::{MintOutcome, StoreError, SupplySnapshot, SupplyStore};
use hashrush_types::{RoundNumber, Tokens};
use parking_lot::Mutex;

#[derive(Debug)]
struct Counter {
    minted: Tokens,
    last_round: Option<RoundNumber>,
}

/// Supply counter held behind a single lock.
///
/// The check against the cap and the increment happen under the same
/// guard, so concurrent mints can never jointly exceed the cap.
#[derive(Debug)]
pub struct InMemorySupplyStore {
    cap: Tokens,
    counter: Mutex<Counter>,
}

impl InMemorySupplyStore {
    /// Create an empty counter with the given cap.
    pub fn new(cap: Tokens) -> Self {
        Self::with_minted(cap, Tokens::ZERO)
    }

    /// Create a counter that has already minted `minted`.
    pub fn with_minted(cap: Tokens, minted: Tokens) -> Self {
        Self {
            cap,
            counter: Mutex::new(Counter {
                minted: minted.min(cap),
                last_round: None,
            }),
        }
    }

    fn snapshot_of(&self, counter: &Counter) -> SupplySnapshot {
        SupplySnapshot {
            minted: counter.minted,
            cap: self.cap,
            last_round: counter.last_round,
        }
    }
}

impl SupplyStore for InMemorySupplyStore {
    fn snapshot(&self) -> Result<SupplySnapshot, StoreError> {
        let counter = self.counter.lock();
        Ok(self.snapshot_of(&counter))
    }

    fn mint(&self, round: RoundNumber, amount: Tokens) -> Result<MintOutcome, StoreError> {
        let mut counter = self.counter.lock();

        if counter.last_round.is_some_and(|last| round <= last) {
            return Ok(MintOutcome::AlreadyRecorded(self.snapshot_of(&counter)));
        }

        match counter.minted.checked_add(amount) {
            Some(total) if total <= self.cap => {
                counter.minted = total;
                counter.last_round = Some(round);
                Ok(MintOutcome::Minted(self.snapshot_of(&counter)))
            }
            _ => Ok(MintOutcome::Refused(self.snapshot_of(&counter))),
        }
    }
}
