//! Accounts: registration, energy and balance credits.
//!
//! - [`EnergyAccount`]: regeneration, the join check and per-tick debits.
//! - [`AccountBook`]: registration with referral codes, shop writes,
//!   referral info and settlement credit batches.
//! - [`InMemoryAccountStore`]: dashmap-backed [`AccountStore`] and
//!   [`ReferralDirectory`].
//!
//! Every mutation goes through a single [`AccountStore::modify`] call, so an
//! account is never rewritten from a stale read.
//!
//! [`AccountStore`]: hashrush_core::AccountStore
//! [`AccountStore::modify`]: hashrush_core::AccountStore::modify
//! [`ReferralDirectory`]: hashrush_core::ReferralDirectory

mod book;
mod energy;
mod error;
mod referral;
mod store;

pub use book::{AccountBook, ReferralInfo, Registration};
pub use energy::{regenerate, EnergyAccount, EnergyConfig, TickOutcome};
pub use error::AccountError;
pub use referral::{generate_referral_code, ReferralConfig, REFERRAL_PREFIX};
pub use store::InMemoryAccountStore;

use hashrush_core::{AccountStore, StoreError};
use hashrush_types::{Account, UserId};

/// Run `f` as one atomic update of `user`'s account and return its result.
pub(crate) fn update_account<T>(
    store: &dyn AccountStore,
    user: UserId,
    mut f: impl FnMut(&mut Account) -> T,
) -> Result<T, AccountError> {
    let mut out = None;
    store
        .modify(user, &mut |account| out = Some(f(account)))
        .map_err(|e| match e {
            StoreError::NotFound(_) => AccountError::NotFound(user),
            other => AccountError::Store(other),
        })?;
    out.ok_or(AccountError::NotFound(user))
}
