//! Registration, shop writes and credit batches.

use crate::energy::regenerate;
use crate::referral::generate_referral_code;
use crate::{update_account, AccountError, EnergyConfig, ReferralConfig};
use hashrush_core::{AccountStore, CommissionRecord, Credit, ReferralDirectory, StoreError};
use hashrush_types::{Account, MiningMode, RoundNumber, Tokens, UserId};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Attempts at drawing an unused referral code before giving up.
const CODE_ATTEMPTS: usize = 8;

/// Result of [`AccountBook::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// The account, fresh or existing.
    pub account: Account,
    /// Whether this call created it.
    pub created: bool,
}

/// A user's referral standing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralInfo {
    /// Code others register with.
    pub referral_code: String,
    /// Users who registered with the code.
    pub referral_count: u64,
    /// Lifetime commissions and signup bonuses.
    pub referral_earnings: Tokens,
    /// Commission history, newest first.
    pub commissions: Vec<CommissionRecord>,
}

/// Account lifecycle operations outside the mining loop.
pub struct AccountBook {
    store: Arc<dyn AccountStore>,
    directory: Arc<dyn ReferralDirectory>,
    energy: EnergyConfig,
    referral: ReferralConfig,
    rng: Mutex<ChaCha8Rng>,
}

impl AccountBook {
    /// Create over a store and referral directory, with an entropy-seeded
    /// code generator.
    pub fn new(
        store: Arc<dyn AccountStore>,
        directory: Arc<dyn ReferralDirectory>,
        energy: EnergyConfig,
        referral: ReferralConfig,
    ) -> Self {
        Self::with_rng(store, directory, energy, referral, ChaCha8Rng::from_entropy())
    }

    /// Create with a given code generator (deterministic in tests).
    pub fn with_rng(
        store: Arc<dyn AccountStore>,
        directory: Arc<dyn ReferralDirectory>,
        energy: EnergyConfig,
        referral: ReferralConfig,
        rng: ChaCha8Rng,
    ) -> Self {
        Self {
            store,
            directory,
            energy,
            referral,
            rng: Mutex::new(rng),
        }
    }

    /// Referral parameters.
    pub fn referral_config(&self) -> &ReferralConfig {
        &self.referral
    }

    /// Fetch an account.
    pub fn get(&self, user: UserId) -> Result<Account, AccountError> {
        self.store.get(user)?.ok_or(AccountError::NotFound(user))
    }

    /// Referrer of `user`, if any. Unknown users have none.
    pub fn referrer_of(&self, user: UserId) -> Result<Option<UserId>, AccountError> {
        Ok(self.store.get(user)?.and_then(|a| a.referrer))
    }

    /// Create the account on first authentication, or return the existing
    /// one with its energy regenerated.
    ///
    /// A referral code is honored only at creation: it must resolve to
    /// another user, who is credited the signup bonus. Unknown codes are
    /// ignored.
    pub fn register(
        &self,
        user: UserId,
        identity: &str,
        referral_code: Option<&str>,
        now: Duration,
    ) -> Result<Registration, AccountError> {
        let identity = identity.trim();
        if identity.is_empty() {
            return Err(AccountError::InvalidIdentity(identity.to_string()));
        }

        if self.store.get(user)?.is_some() {
            return self.existing(user, now);
        }

        let referrer = match referral_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => match self.directory.resolve(code)? {
                Some(referrer) if referrer != user => Some(referrer),
                _ => {
                    debug!(user = user.0, code, "Ignoring unusable referral code");
                    None
                }
            },
            None => None,
        };

        let mut inserted = None;
        for _ in 0..CODE_ATTEMPTS {
            let code = generate_referral_code(identity, &mut *self.rng.lock());
            let mut account = Account::new(user, identity, code, now);
            account.referrer = referrer;

            match self.store.insert(account.clone()) {
                Ok(()) => {
                    inserted = Some(account);
                    break;
                }
                Err(e) if e.is_conflict() => {
                    // Either a concurrent registration of the same user won,
                    // or the code collided and we draw again.
                    if self.store.get(user)?.is_some() {
                        return self.existing(user, now);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        let account = inserted.ok_or_else(|| {
            AccountError::Store(StoreError::Conflict(format!(
                "no free referral code for {user} after {CODE_ATTEMPTS} attempts"
            )))
        })?;

        if let Some(referrer) = referrer {
            let bonus = self.referral.signup_bonus;
            let credited = update_account(&*self.store, referrer, |r| {
                r.referral_count += 1;
                r.tokens += bonus;
                r.referral_earnings += bonus;
            });
            match credited {
                Ok(()) => debug!(referrer = referrer.0, referee = user.0, %bonus, "Credited signup bonus"),
                Err(e) => warn!(referrer = referrer.0, referee = user.0, error = %e, "Failed to credit referrer"),
            }
        }

        info!(
            user = user.0,
            code = %account.referral_code,
            referrer = ?referrer.map(|r| r.0),
            "Registered account"
        );
        Ok(Registration {
            account,
            created: true,
        })
    }

    fn existing(&self, user: UserId, now: Duration) -> Result<Registration, AccountError> {
        let energy = &self.energy;
        let account = update_account(&*self.store, user, |account| {
            regenerate(account, now, energy);
            account.clone()
        })?;
        Ok(Registration {
            account,
            created: false,
        })
    }

    /// Add `mode` to the unlocked set. Unlocking twice is a no-op.
    pub fn unlock_mode(&self, user: UserId, mode: MiningMode) -> Result<Account, AccountError> {
        let account = update_account(&*self.store, user, |account| {
            account.unlocked_modes.insert(mode);
            account.clone()
        })?;
        info!(user = user.0, %mode, "Unlocked mode");
        Ok(account)
    }

    /// Apply a purchased energy boost: energy and capacity both grow.
    pub fn boost_energy(&self, user: UserId, now: Duration) -> Result<Account, AccountError> {
        let energy = &self.energy;
        let account = update_account(&*self.store, user, |account| {
            regenerate(account, now, energy);
            account.max_energy = account.max_energy.saturating_add(energy.boost_amount);
            account.energy = account.energy.saturating_add(energy.boost_amount);
            account.clone()
        })?;
        info!(
            user = user.0,
            energy = account.energy,
            max_energy = account.max_energy,
            "Applied energy boost"
        );
        Ok(account)
    }

    /// A user's referral code, counters and commission history.
    pub fn referral_info(&self, user: UserId) -> Result<ReferralInfo, AccountError> {
        let account = self.get(user)?;
        Ok(ReferralInfo {
            referral_code: account.referral_code,
            referral_count: account.referral_count,
            referral_earnings: account.referral_earnings,
            commissions: self.store.commissions(user)?,
        })
    }

    /// Apply a settlement's credit batch. Returns false if `round` was
    /// already credited.
    pub fn credit(&self, round: RoundNumber, credits: &[Credit]) -> Result<bool, AccountError> {
        let applied = self.store.apply_credits(round, credits)?;
        if applied {
            debug!(round = round.0, credits = credits.len(), "Applied credit batch");
        } else {
            debug!(round = round.0, "Credit batch already applied");
        }
        Ok(applied)
    }
}

impl std::fmt::Debug for AccountBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountBook")
            .field("energy", &self.energy)
            .field("referral", &self.referral)
            .finish_non_exhaustive()
    }
}
