//! Settlement planning and payout.

use crate::{split_reward, RewardError};
use hashrush_accounts::AccountBook;
use hashrush_core::{Credit, CreditKind};
use hashrush_supply::{SupplyError, SupplyLedger};
use hashrush_types::{Commission, Payout, Round, Settlement, Tokens, UserId};
use std::sync::Arc;
use tracing::{info, warn};

/// Reward parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardConfig {
    /// Finder's share of the clamped reward when others are online, in
    /// basis points.
    pub finder_share_bps: u32,
    /// Referrer commission on each recipient's reward, in basis points.
    pub commission_bps: u32,
    /// Rounding grid for unclamped payouts, in base units.
    pub payout_quantum: u64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            finder_share_bps: 5_000,
            commission_bps: 1_000,
            payout_quantum: Tokens::UNITS_PER_CENT,
        }
    }
}

impl RewardConfig {
    /// Set the finder's share.
    pub fn with_finder_share_bps(mut self, bps: u32) -> Self {
        self.finder_share_bps = bps.min(10_000);
        self
    }

    /// Set the commission rate.
    pub fn with_commission_bps(mut self, bps: u32) -> Self {
        self.commission_bps = bps.min(10_000);
        self
    }
}

/// Computes and pays settlements.
#[derive(Clone)]
pub struct RewardDistributor {
    config: RewardConfig,
    supply: SupplyLedger,
    accounts: Arc<AccountBook>,
}

impl RewardDistributor {
    /// Create over the supply ledger and account book.
    pub fn new(config: RewardConfig, supply: SupplyLedger, accounts: Arc<AccountBook>) -> Self {
        Self {
            config,
            supply,
            accounts,
        }
    }

    /// Reward parameters.
    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// Compute the settlement of a claimed round.
    ///
    /// `online` is the pool snapshot recorded when the round was claimed;
    /// the finder, if present, is not counted in the pool.
    ///
    /// # Errors
    ///
    /// [`RewardError::SupplyExhausted`] if the headroom is zero. Nothing is
    /// written in that case; the caller rolls the claim back.
    pub fn plan(
        &self,
        round: &Round,
        finder: UserId,
        online: &[UserId],
    ) -> Result<Settlement, RewardError> {
        let headroom = self.supply.headroom()?;
        let capped = round.base_reward.min(headroom);
        if capped.is_zero() {
            warn!(round = round.number.0, "Supply exhausted, nothing to settle");
            return Err(RewardError::SupplyExhausted(round.number));
        }

        let mut pool_members: Vec<UserId> = online
            .iter()
            .copied()
            .filter(|&u| u != finder)
            .collect();
        pool_members.sort();
        pool_members.dedup();

        let split = split_reward(
            capped,
            round.base_reward,
            pool_members.len(),
            self.config.finder_share_bps,
            self.config.payout_quantum,
        );

        let pool: Vec<Payout> = pool_members
            .iter()
            .map(|&user| Payout {
                user,
                amount: split.pool_share_each,
            })
            .filter(|p| !p.amount.is_zero())
            .collect();

        let mut settlement = Settlement {
            round: round.number,
            finder,
            capped_reward: capped,
            finder_reward: split.finder,
            pool_share_each: split.pool_share_each,
            pool_size: pool_members.len(),
            pool,
            commissions: Vec::new(),
        };

        for payout in settlement.payouts().collect::<Vec<_>>() {
            let Some(referrer) = self.accounts.referrer_of(payout.user)? else {
                continue;
            };
            let amount = payout
                .amount
                .scale_bps(self.config.commission_bps, split.quantum);
            if !amount.is_zero() {
                settlement.commissions.push(Commission {
                    referrer,
                    referee: payout.user,
                    amount,
                });
            }
        }

        Ok(settlement)
    }

    /// Mint and credit an attached settlement.
    ///
    /// Both steps are keyed by the settlement's round: re-applying the same
    /// settlement after a partial failure completes whichever step is
    /// missing and repeats neither.
    pub fn apply(&self, settlement: &Settlement) -> Result<(), RewardError> {
        let round = settlement.round;
        let total = settlement.total_paid();

        match self.supply.record_mint(round, total) {
            Ok(_) => {}
            Err(SupplyError::CapExceeded { headroom, .. }) if headroom.is_zero() => {
                return Err(RewardError::SupplyExhausted(round));
            }
            Err(e) => return Err(e.into()),
        }

        let credits = Self::credits(settlement);
        let applied = self.accounts.credit(round, &credits)?;

        if applied {
            info!(
                round = round.0,
                finder = settlement.finder.0,
                finder_reward = %settlement.finder_reward,
                pool = settlement.pool.len(),
                pool_share_each = %settlement.pool_share_each,
                total = %total,
                commissions = settlement.commissions.len(),
                "Settled round"
            );
        }
        Ok(())
    }

    /// The credit batch of a settlement: rewards first, then commissions.
    pub fn credits(settlement: &Settlement) -> Vec<Credit> {
        settlement
            .payouts()
            .map(|p| Credit {
                user: p.user,
                amount: p.amount,
                kind: CreditKind::Reward,
            })
            .chain(settlement.commissions.iter().map(|c| Credit {
                user: c.referrer,
                amount: c.amount,
                kind: CreditKind::Commission { referee: c.referee },
            }))
            .collect()
    }
}

impl std::fmt::Debug for RewardDistributor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewardDistributor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashrush_accounts::{EnergyConfig, InMemoryAccountStore, ReferralConfig};
    use hashrush_supply::InMemorySupplyStore;
    use hashrush_types::{EmissionSchedule, RoundNumber};
    use std::time::Duration;
    use tracing_test::traced_test;

    struct Fixture {
        distributor: RewardDistributor,
        book: Arc<AccountBook>,
        supply: SupplyLedger,
    }

    fn fixture(minted: Tokens) -> Fixture {
        let store = Arc::new(InMemoryAccountStore::new());
        let book = Arc::new(AccountBook::new(
            store.clone(),
            store,
            EnergyConfig::default(),
            ReferralConfig::default().with_signup_bonus(Tokens::ZERO),
        ));
        for user in 1..=4u64 {
            book.register(UserId(user), &format!("{user}000"), None, Duration::ZERO)
                .unwrap();
        }
        let schedule = EmissionSchedule::default();
        let supply = SupplyLedger::new(Arc::new(InMemorySupplyStore::with_minted(
            schedule.total_supply,
            minted,
        )));
        Fixture {
            distributor: RewardDistributor::new(RewardConfig::default(), supply.clone(), book.clone()),
            book,
            supply,
        }
    }

    fn round(n: u64) -> Round {
        Round::new(RoundNumber(n), &EmissionSchedule::default(), Duration::ZERO)
    }

    fn online(users: &[u64]) -> Vec<UserId> {
        users.iter().map(|&u| UserId(u)).collect()
    }

    #[test]
    fn test_plan_splits_between_finder_and_pool() {
        let f = fixture(Tokens::ZERO);
        let settlement = f
            .distributor
            .plan(&round(1), UserId(1), &online(&[1, 2]))
            .unwrap();
        assert_eq!(settlement.capped_reward, Tokens::from_whole(1000));
        assert_eq!(settlement.finder_reward, Tokens::from_whole(500));
        assert_eq!(settlement.pool.len(), 1);
        assert_eq!(settlement.pool_share_each, Tokens::from_whole(500));
        assert!(settlement.commissions.is_empty());
    }

    #[test]
    fn test_plan_solo_finder() {
        let f = fixture(Tokens::ZERO);
        let settlement = f.distributor.plan(&round(101), UserId(1), &[]).unwrap();
        assert_eq!(settlement.finder_reward, Tokens::from_whole(500));
        assert!(settlement.pool.is_empty());
    }

    #[test]
    fn test_plan_adds_commission_per_recipient() {
        let f = fixture(Tokens::ZERO);
        let code = f.book.get(UserId(3)).unwrap().referral_code;
        f.book
            .register(UserId(5), "5000", Some(&code), Duration::ZERO)
            .unwrap();

        let settlement = f
            .distributor
            .plan(&round(1), UserId(5), &online(&[2, 5]))
            .unwrap();
        assert_eq!(settlement.commissions.len(), 1);
        let commission = &settlement.commissions[0];
        assert_eq!(commission.referrer, UserId(3));
        assert_eq!(commission.referee, UserId(5));
        assert_eq!(commission.amount, Tokens::from_whole(50));
        // Commissions are paid on top of the clamped reward.
        assert_eq!(settlement.total_paid(), Tokens::from_whole(1000));
    }

    #[traced_test]
    #[test]
    fn test_plan_refuses_at_zero_headroom() {
        let cap = EmissionSchedule::default().total_supply;
        let f = fixture(cap);
        assert_eq!(
            f.distributor.plan(&round(1), UserId(1), &[]),
            Err(RewardError::SupplyExhausted(RoundNumber(1)))
        );
        assert!(logs_contain("Supply exhausted"));
    }

    #[test]
    fn test_plan_clamps_to_headroom() {
        let cap = EmissionSchedule::default().total_supply;
        let f = fixture(cap.saturating_sub(Tokens::from_units(300_000)));
        let settlement = f
            .distributor
            .plan(&round(1), UserId(1), &online(&[2]))
            .unwrap();
        assert_eq!(settlement.capped_reward, Tokens::from_units(300_000));
        assert_eq!(settlement.total_paid(), Tokens::from_units(300_000));
    }

    #[test]
    fn test_pool_size_counts_members_left_with_nothing() {
        let cap = EmissionSchedule::default().total_supply;
        let f = fixture(cap.saturating_sub(Tokens::from_units(3)));
        let settlement = f
            .distributor
            .plan(&round(1), UserId(1), &online(&[1, 2, 3, 4]))
            .unwrap();
        // Two units go to the finder; one unit cannot be split three ways.
        assert_eq!(settlement.finder_reward, Tokens::from_units(2));
        assert_eq!(settlement.pool_share_each, Tokens::ZERO);
        assert!(settlement.pool.is_empty());
        assert_eq!(settlement.pool_size, 3);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let f = fixture(Tokens::ZERO);
        let settlement = f
            .distributor
            .plan(&round(1), UserId(1), &online(&[1, 2]))
            .unwrap();

        f.distributor.apply(&settlement).unwrap();
        f.distributor.apply(&settlement).unwrap();

        assert_eq!(f.supply.snapshot().unwrap().minted, Tokens::from_whole(1000));
        assert_eq!(f.book.get(UserId(1)).unwrap().tokens, Tokens::from_whole(500));
        assert_eq!(f.book.get(UserId(2)).unwrap().total_mined, Tokens::from_whole(500));
    }
}
