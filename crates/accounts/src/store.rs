//! In-memory account store.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hashrush_core::{
    AccountStore, CommissionRecord, Credit, CreditKind, ReferralDirectory, StoreError,
};
use hashrush_types::{Account, RoundNumber, UserId};
use parking_lot::Mutex;
use std::collections::BTreeSet;

/// Accounts in a sharded map, with a referral-code index.
///
/// Single-account updates lock only that account's shard. Registration and
/// credit batches take their own small locks so that a code is never
/// assigned twice and a round's credits are never applied twice.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: DashMap<UserId, Account>,
    codes: DashMap<String, UserId>,
    commissions: DashMap<UserId, Vec<CommissionRecord>>,
    registration: Mutex<()>,
    credited_rounds: Mutex<BTreeSet<RoundNumber>>,
}

impl InMemoryAccountStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether no account is registered.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn get(&self, user: UserId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(&user).map(|a| a.clone()))
    }

    fn insert(&self, account: Account) -> Result<(), StoreError> {
        let _guard = self.registration.lock();

        if self.codes.contains_key(&account.referral_code) {
            return Err(StoreError::Conflict(format!(
                "referral code {} already assigned",
                account.referral_code
            )));
        }
        match self.accounts.entry(account.user) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "{} already registered",
                account.user
            ))),
            Entry::Vacant(slot) => {
                self.codes.insert(account.referral_code.clone(), account.user);
                slot.insert(account);
                Ok(())
            }
        }
    }

    fn modify(&self, user: UserId, f: &mut dyn FnMut(&mut Account)) -> Result<(), StoreError> {
        let mut account = self
            .accounts
            .get_mut(&user)
            .ok_or_else(|| StoreError::NotFound(format!("{user}")))?;
        f(account.value_mut());
        Ok(())
    }

    fn apply_credits(&self, round: RoundNumber, credits: &[Credit]) -> Result<bool, StoreError> {
        let mut credited = self.credited_rounds.lock();
        if credited.contains(&round) {
            return Ok(false);
        }

        // All-or-nothing: every recipient must exist before anything moves.
        if let Some(missing) = credits
            .iter()
            .find(|c| !self.accounts.contains_key(&c.user))
        {
            return Err(StoreError::NotFound(format!("{}", missing.user)));
        }

        for credit in credits {
            if let Some(mut account) = self.accounts.get_mut(&credit.user) {
                account.tokens += credit.amount;
                match credit.kind {
                    CreditKind::Reward => account.total_mined += credit.amount,
                    CreditKind::Commission { .. } => account.referral_earnings += credit.amount,
                }
            }
            if let CreditKind::Commission { referee } = credit.kind {
                self.commissions
                    .entry(credit.user)
                    .or_default()
                    .push(CommissionRecord {
                        round,
                        referee,
                        amount: credit.amount,
                    });
            }
        }

        credited.insert(round);
        Ok(true)
    }

    fn commissions(&self, referrer: UserId) -> Result<Vec<CommissionRecord>, StoreError> {
        Ok(self
            .commissions
            .get(&referrer)
            .map(|records| records.iter().rev().cloned().collect())
            .unwrap_or_default())
    }
}

impl ReferralDirectory for InMemoryAccountStore {
    fn resolve(&self, code: &str) -> Result<Option<UserId>, StoreError> {
        Ok(self.codes.get(code).map(|user| *user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashrush_types::Tokens;
    use std::time::Duration;

    fn account(user: u64, code: &str) -> Account {
        Account::new(UserId(user), user.to_string(), code.into(), Duration::ZERO)
    }

    #[test]
    fn test_insert_rejects_duplicate_user_and_code() {
        let store = InMemoryAccountStore::new();
        store.insert(account(1, "XH0001AAAA")).unwrap();

        assert!(store.insert(account(1, "XH0001BBBB")).unwrap_err().is_conflict());
        assert!(store.insert(account(2, "XH0001AAAA")).unwrap_err().is_conflict());
        assert_eq!(store.resolve("XH0001AAAA").unwrap(), Some(UserId(1)));
        assert_eq!(store.resolve("XH0001BBBB").unwrap(), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_apply_credits_once_per_round() {
        let store = InMemoryAccountStore::new();
        store.insert(account(1, "A")).unwrap();
        store.insert(account(2, "B")).unwrap();
        let credits = [
            Credit {
                user: UserId(1),
                amount: Tokens::from_whole(500),
                kind: CreditKind::Reward,
            },
            Credit {
                user: UserId(2),
                amount: Tokens::from_whole(50),
                kind: CreditKind::Commission { referee: UserId(1) },
            },
        ];

        assert!(store.apply_credits(RoundNumber(1), &credits).unwrap());
        assert!(!store.apply_credits(RoundNumber(1), &credits).unwrap());

        let finder = store.get(UserId(1)).unwrap().unwrap();
        assert_eq!(finder.tokens, Tokens::from_whole(500));
        assert_eq!(finder.total_mined, Tokens::from_whole(500));

        let referrer = store.get(UserId(2)).unwrap().unwrap();
        assert_eq!(referrer.tokens, Tokens::from_whole(50));
        assert_eq!(referrer.total_mined, Tokens::ZERO);
        assert_eq!(referrer.referral_earnings, Tokens::from_whole(50));

        let records = store.commissions(UserId(2)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].referee, UserId(1));
    }

    #[test]
    fn test_apply_credits_missing_recipient_changes_nothing() {
        let store = InMemoryAccountStore::new();
        store.insert(account(1, "A")).unwrap();
        let credits = [
            Credit {
                user: UserId(1),
                amount: Tokens::from_whole(1),
                kind: CreditKind::Reward,
            },
            Credit {
                user: UserId(3),
                amount: Tokens::from_whole(1),
                kind: CreditKind::Reward,
            },
        ];
        assert!(store.apply_credits(RoundNumber(1), &credits).is_err());
        assert_eq!(store.get(UserId(1)).unwrap().unwrap().tokens, Tokens::ZERO);
        // The round is not marked, so a corrected retry can still apply.
        assert!(store.apply_credits(RoundNumber(1), &credits[..1]).unwrap());
    }
}
