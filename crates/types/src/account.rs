//! Per-user account state.

use crate::{MiningMode, Tokens, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Energy granted to, and capacity of, a fresh account.
pub const DEFAULT_ENERGY: u64 = 2000;

/// A user's balances and unlocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Internal reference.
    pub user: UserId,
    /// External identity; also the hashing input for proofs.
    pub identity: String,
    /// Current energy.
    pub energy: u64,
    /// Energy capacity.
    pub max_energy: u64,
    /// Last time energy was regenerated (since Unix epoch).
    pub last_energy_update: Duration,
    /// Spendable token balance.
    pub tokens: Tokens,
    /// Lifetime rewards from mining (commissions excluded).
    pub total_mined: Tokens,
    /// Modes this user may join with. Only ever grows.
    pub unlocked_modes: BTreeSet<MiningMode>,
    /// Code others use to name this user as their referrer.
    pub referral_code: String,
    /// Referrer, fixed at registration.
    pub referrer: Option<UserId>,
    /// Number of users who registered with this user's code.
    pub referral_count: u64,
    /// Lifetime referral commissions.
    pub referral_earnings: Tokens,
    /// Number of joins.
    pub mining_sessions: u64,
    /// Registration time (since Unix epoch).
    pub created_at: Duration,
}

impl Account {
    /// Create a fresh account with default energy and only `Basic` unlocked.
    pub fn new(user: UserId, identity: impl Into<String>, referral_code: String, now: Duration) -> Self {
        Self {
            user,
            identity: identity.into(),
            energy: DEFAULT_ENERGY,
            max_energy: DEFAULT_ENERGY,
            last_energy_update: now,
            tokens: Tokens::ZERO,
            total_mined: Tokens::ZERO,
            unlocked_modes: BTreeSet::from([MiningMode::Basic]),
            referral_code,
            referrer: None,
            referral_count: 0,
            referral_earnings: Tokens::ZERO,
            mining_sessions: 0,
            created_at: now,
        }
    }

    /// Whether a mode is unlocked.
    pub fn has_unlocked(&self, mode: MiningMode) -> bool {
        self.unlocked_modes.contains(&mode)
    }

    /// Whether the account can pay for one tick in `mode`.
    pub fn can_afford(&self, mode: MiningMode) -> bool {
        self.energy >= mode.energy_cost()
    }
}
