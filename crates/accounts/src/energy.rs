//! Energy: a per-account bucket drained by ticks and refilled by time.
//!
//! Works like a token bucket with whole-second refill: every elapsed whole
//! second adds `regen_per_second` units up to the account's capacity.
//! Partial seconds carry over to the next observation.

use crate::{update_account, AccountError};
use hashrush_core::AccountStore;
use hashrush_types::{Account, MiningMode, UserId};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Energy parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnergyConfig {
    /// Units regained per whole elapsed second.
    pub regen_per_second: u64,
    /// Energy and capacity added by one purchased boost.
    pub boost_amount: u64,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            regen_per_second: 1,
            boost_amount: 2000,
        }
    }
}

impl EnergyConfig {
    /// Set the regeneration rate.
    pub fn with_regen_per_second(mut self, units: u64) -> Self {
        self.regen_per_second = units;
        self
    }

    /// Set the boost amount.
    pub fn with_boost_amount(mut self, amount: u64) -> Self {
        self.boost_amount = amount;
        self
    }
}

/// Apply regeneration to `account` as of `now`. Returns the units gained.
///
/// Zero elapsed whole seconds is a no-op: neither energy nor the marker
/// moves. A clock that appears to run backwards is treated the same way.
pub fn regenerate(account: &mut Account, now: Duration, config: &EnergyConfig) -> u64 {
    let elapsed = now.saturating_sub(account.last_energy_update).as_secs();
    if elapsed == 0 {
        return 0;
    }

    account.last_energy_update += Duration::from_secs(elapsed);
    let before = account.energy;
    account.energy = account
        .energy
        .saturating_add(elapsed.saturating_mul(config.regen_per_second))
        .min(account.max_energy.max(before));
    account.energy - before
}

/// Result of charging one heartbeat tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick was paid; the account after the debit.
    Debited(Account),
    /// Not enough energy; nothing was debited.
    Exhausted(Account),
}

impl TickOutcome {
    /// The account snapshot either way.
    pub fn account(&self) -> &Account {
        match self {
            Self::Debited(account) | Self::Exhausted(account) => account,
        }
    }
}

/// Energy operations over an [`AccountStore`].
#[derive(Clone)]
pub struct EnergyAccount {
    store: Arc<dyn AccountStore>,
    config: EnergyConfig,
}

impl EnergyAccount {
    /// Create over a store.
    pub fn new(store: Arc<dyn AccountStore>, config: EnergyConfig) -> Self {
        Self { store, config }
    }

    /// Energy parameters.
    pub fn config(&self) -> &EnergyConfig {
        &self.config
    }

    /// Regenerate and persist, returning the refreshed account.
    pub fn refresh(&self, user: UserId, now: Duration) -> Result<Account, AccountError> {
        let config = &self.config;
        update_account(&*self.store, user, |account| {
            regenerate(account, now, config);
            account.clone()
        })
    }

    /// Admit a join in `mode`: the mode must be unlocked and the regenerated
    /// balance must cover one tick. Nothing is debited; the session count
    /// is incremented on success.
    pub fn check_join(
        &self,
        user: UserId,
        mode: MiningMode,
        now: Duration,
    ) -> Result<Account, AccountError> {
        let config = &self.config;
        update_account(&*self.store, user, |account| {
            regenerate(account, now, config);
            if !account.has_unlocked(mode) {
                return Err(AccountError::ModeLocked(mode));
            }
            if !account.can_afford(mode) {
                return Err(AccountError::InsufficientEnergy {
                    required: mode.energy_cost(),
                    available: account.energy,
                });
            }
            account.mining_sessions += 1;
            Ok(account.clone())
        })?
    }

    /// Charge one tick in `mode`.
    pub fn debit_tick(
        &self,
        user: UserId,
        mode: MiningMode,
        now: Duration,
    ) -> Result<TickOutcome, AccountError> {
        let config = &self.config;
        let outcome = update_account(&*self.store, user, |account| {
            regenerate(account, now, config);
            if account.can_afford(mode) {
                account.energy -= mode.energy_cost();
                TickOutcome::Debited(account.clone())
            } else {
                TickOutcome::Exhausted(account.clone())
            }
        })?;

        if let TickOutcome::Exhausted(account) = &outcome {
            debug!(
                user = user.0,
                %mode,
                energy = account.energy,
                cost = mode.energy_cost(),
                "Tick refused for lack of energy"
            );
        }
        Ok(outcome)
    }
}

impl std::fmt::Debug for EnergyAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnergyAccount")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
