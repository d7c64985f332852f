//! Storage traits for the mining core.
//!
//! Every piece of shared state lives behind one of these traits. The
//! components never read-modify-write a whole record; each trait method is a
//! single atomic operation on the backend, which is what makes the
//! components safe under concurrent request handlers.
//!
//! All methods are synchronous and take the current time from the caller
//! where time matters, so the same component code runs against an
//! in-memory store in tests and against a real backend in production.

use crate::StoreError;
use hashrush_types::{
    Account, ParticipantEntry, Round, RoundNumber, RoundProof, Settlement, Tokens, UserId,
};
use std::time::Duration;

/// Result of a conditional claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This caller performed the Open → Locked transition.
    Claimed(Round),
    /// Another caller (or an earlier attempt) already holds or closed the round.
    AlreadyClaimed(Round),
}

/// Persistent round records.
pub trait RoundStore: Send + Sync {
    /// The round currently Open or Locked, if any.
    fn active(&self) -> Result<Option<Round>, StoreError>;

    /// Fetch a round by number.
    fn get(&self, number: RoundNumber) -> Result<Option<Round>, StoreError>;

    /// Highest round number ever inserted.
    fn highest_number(&self) -> Result<Option<RoundNumber>, StoreError>;

    /// Insert a new round.
    ///
    /// # Errors
    ///
    /// `StoreError::Conflict` if a round with the same number exists, or if
    /// another round is already active.
    fn insert(&self, round: Round) -> Result<(), StoreError>;

    /// Atomically transition an Open, unclaimed round to Locked.
    ///
    /// Tests "still unclaimed" and sets winner, proof, the online snapshot
    /// and status in one operation. Exactly one of any number of concurrent
    /// callers observes `Claimed`; all others observe `AlreadyClaimed` with
    /// nothing written.
    fn claim(
        &self,
        number: RoundNumber,
        winner: UserId,
        proof: RoundProof,
        online: Vec<UserId>,
        now: Duration,
    ) -> Result<ClaimOutcome, StoreError>;

    /// Roll a Locked round held by `winner` back to Open.
    ///
    /// Only succeeds while no settlement is attached. Returns whether the
    /// round was released.
    fn release(&self, number: RoundNumber, winner: UserId) -> Result<bool, StoreError>;

    /// Attach a settlement record to a Locked round held by its finder.
    ///
    /// First writer wins: if a settlement is already attached it is returned
    /// unchanged and `settlement` is discarded.
    fn attach_settlement(
        &self,
        number: RoundNumber,
        settlement: Settlement,
    ) -> Result<Settlement, StoreError>;

    /// Transition a Locked round with an attached settlement to Closed.
    ///
    /// Idempotent: closing an already-Closed round by the same winner
    /// returns the stored round without changing the closure time.
    fn close(&self, number: RoundNumber, winner: UserId, now: Duration)
        -> Result<Round, StoreError>;

    /// Add to a round's aggregate counters without touching any other field.
    ///
    /// A Closed round is final: nothing is written and `false` is returned.
    fn add_counters(
        &self,
        number: RoundNumber,
        attempts: u64,
        participations: u64,
    ) -> Result<bool, StoreError>;

    /// Most recently closed rounds, newest first.
    fn recent_closed(&self, limit: usize) -> Result<Vec<Round>, StoreError>;

    /// Closed rounds whose settlement paid `user` as finder or pool member,
    /// newest first.
    fn closed_paid_to(&self, user: UserId) -> Result<Vec<Round>, StoreError>;
}

/// Ephemeral participant entries keyed by `(round, user)`.
pub trait ParticipantStore: Send + Sync {
    /// Insert or replace the entry for `(entry.round, entry.user)`.
    ///
    /// Returns the replaced entry, if any.
    fn upsert(&self, entry: ParticipantEntry) -> Result<Option<ParticipantEntry>, StoreError>;

    /// Fetch one entry.
    fn get(&self, round: RoundNumber, user: UserId)
        -> Result<Option<ParticipantEntry>, StoreError>;

    /// Set one entry's heartbeat timestamp. Returns false if the entry is gone.
    fn touch(&self, round: RoundNumber, user: UserId, now: Duration) -> Result<bool, StoreError>;

    /// Remove one entry.
    fn remove(&self, round: RoundNumber, user: UserId)
        -> Result<Option<ParticipantEntry>, StoreError>;

    /// Remove one entry only if its heartbeat is still `last_heartbeat`.
    ///
    /// An entry replaced or refreshed since it was read is left alone.
    fn remove_if_unchanged(
        &self,
        round: RoundNumber,
        user: UserId,
        last_heartbeat: Duration,
    ) -> Result<Option<ParticipantEntry>, StoreError>;

    /// All entries of a round, ordered by user.
    fn entries(&self, round: RoundNumber) -> Result<Vec<ParticipantEntry>, StoreError>;

    /// Remove every entry of a round whose last heartbeat is at least
    /// `timeout` before `now`.
    ///
    /// Returns the removed entries.
    fn remove_stale(
        &self,
        round: RoundNumber,
        now: Duration,
        timeout: Duration,
    ) -> Result<Vec<ParticipantEntry>, StoreError>;

    /// Remove every entry of a round. Returns how many were removed.
    fn clear_round(&self, round: RoundNumber) -> Result<usize, StoreError>;
}

/// What a credit counts towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditKind {
    /// Mining reward: tokens and lifetime-mined.
    Reward,
    /// Referral commission: tokens and referral earnings.
    Commission {
        /// Account whose reward generated the commission.
        referee: UserId,
    },
}

/// One balance increase inside a settlement batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credit {
    /// Account credited.
    pub user: UserId,
    /// Amount.
    pub amount: Tokens,
    /// What the credit counts towards.
    pub kind: CreditKind,
}

/// A commission as recorded against the referrer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommissionRecord {
    /// Round whose settlement paid the commission.
    pub round: RoundNumber,
    /// Account whose reward generated it.
    pub referee: UserId,
    /// Amount.
    pub amount: Tokens,
}

/// Per-user accounts.
pub trait AccountStore: Send + Sync {
    /// Fetch an account snapshot.
    fn get(&self, user: UserId) -> Result<Option<Account>, StoreError>;

    /// Insert a new account. `Conflict` if the user or referral code exists.
    fn insert(&self, account: Account) -> Result<(), StoreError>;

    /// Apply `f` to one account as a single atomic update.
    ///
    /// `NotFound` if the account does not exist.
    fn modify(&self, user: UserId, f: &mut dyn FnMut(&mut Account)) -> Result<(), StoreError>;

    /// Apply a settlement's credits as one batch, at most once per round.
    ///
    /// Returns false (and changes nothing) if credits for `round` were
    /// already applied. Commission credits are also recorded for
    /// [`AccountStore::commissions`].
    fn apply_credits(&self, round: RoundNumber, credits: &[Credit]) -> Result<bool, StoreError>;

    /// Commission history of a referrer, newest first.
    fn commissions(&self, referrer: UserId) -> Result<Vec<CommissionRecord>, StoreError>;
}

/// Resolves referral codes to users.
pub trait ReferralDirectory: Send + Sync {
    /// The user owning `code`, if any.
    fn resolve(&self, code: &str) -> Result<Option<UserId>, StoreError>;
}

/// Point-in-time view of the supply counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupplySnapshot {
    /// Total minted by settlements so far.
    pub minted: Tokens,
    /// Hard cap.
    pub cap: Tokens,
    /// Last round whose mint was recorded.
    pub last_round: Option<RoundNumber>,
}

impl SupplySnapshot {
    /// Remaining mintable amount.
    pub fn headroom(&self) -> Tokens {
        self.cap.saturating_sub(self.minted)
    }
}

/// Result of an atomic mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintOutcome {
    /// The amount was added.
    Minted(SupplySnapshot),
    /// A mint for this round (or a later one) was already recorded.
    AlreadyRecorded(SupplySnapshot),
    /// Adding the amount would exceed the cap; nothing was written.
    Refused(SupplySnapshot),
}

/// The singleton supply counter.
pub trait SupplyStore: Send + Sync {
    /// Current counter values.
    fn snapshot(&self) -> Result<SupplySnapshot, StoreError>;

    /// Atomically add `amount` on behalf of `round`.
    ///
    /// Never lets minted exceed cap and never records the same round twice.
    fn mint(&self, round: RoundNumber, amount: Tokens) -> Result<MintOutcome, StoreError>;
}
