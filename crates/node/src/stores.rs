//! Backend bundle.

use hashrush_accounts::InMemoryAccountStore;
use hashrush_core::{AccountStore, ParticipantStore, ReferralDirectory, RoundStore, SupplyStore};
use hashrush_participants::InMemoryParticipantStore;
use hashrush_rounds::InMemoryRoundStore;
use hashrush_supply::InMemorySupplyStore;
use hashrush_types::Tokens;
use std::sync::Arc;

/// The storage backends a node runs on.
#[derive(Clone)]
pub struct Stores {
    pub rounds: Arc<dyn RoundStore>,
    pub participants: Arc<dyn ParticipantStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub referrals: Arc<dyn ReferralDirectory>,
    pub supply: Arc<dyn SupplyStore>,
}

impl Stores {
    /// Fresh in-memory backends with the given supply cap.
    pub fn in_memory(cap: Tokens) -> Self {
        Self::in_memory_with_minted(cap, Tokens::ZERO)
    }

    /// In-memory backends whose supply counter starts at `minted`.
    pub fn in_memory_with_minted(cap: Tokens, minted: Tokens) -> Self {
        let accounts = Arc::new(InMemoryAccountStore::new());
        Self {
            rounds: Arc::new(InMemoryRoundStore::new()),
            participants: Arc::new(InMemoryParticipantStore::new()),
            accounts: accounts.clone(),
            referrals: accounts,
            supply: Arc::new(InMemorySupplyStore::with_minted(cap, minted)),
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
