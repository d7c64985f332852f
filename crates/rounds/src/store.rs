//! In-memory round store.

use hashrush_core::{ClaimOutcome, RoundStore, StoreError};
use hashrush_types::{Round, RoundNumber, RoundProof, RoundStatus, Settlement, UserId};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::time::Duration;

/// Rounds in an ordered map behind a read-write lock.
///
/// Every conditional transition runs under the write lock, so its check and
/// its write are one atomic step.
#[derive(Debug, Default)]
pub struct InMemoryRoundStore {
    rounds: RwLock<BTreeMap<RoundNumber, Round>>,
}

impl InMemoryRoundStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rounds ever inserted.
    pub fn len(&self) -> usize {
        self.rounds.read().len()
    }

    /// Whether no round was ever inserted.
    pub fn is_empty(&self) -> bool {
        self.rounds.read().is_empty()
    }
}

fn not_found(number: RoundNumber) -> StoreError {
    StoreError::NotFound(format!("{number}"))
}

impl RoundStore for InMemoryRoundStore {
    fn active(&self) -> Result<Option<Round>, StoreError> {
        Ok(self
            .rounds
            .read()
            .values()
            .rev()
            .find(|r| r.is_active())
            .cloned())
    }

    fn get(&self, number: RoundNumber) -> Result<Option<Round>, StoreError> {
        Ok(self.rounds.read().get(&number).cloned())
    }

    fn highest_number(&self) -> Result<Option<RoundNumber>, StoreError> {
        Ok(self.rounds.read().keys().next_back().copied())
    }

    fn insert(&self, round: Round) -> Result<(), StoreError> {
        let mut rounds = self.rounds.write();

        let expected = rounds
            .keys()
            .next_back()
            .map_or(RoundNumber::FIRST, |n| n.next());
        if round.number != expected {
            return Err(StoreError::Conflict(format!(
                "{} is not the next round (expected {expected})",
                round.number
            )));
        }
        if let Some(active) = rounds.values().rev().find(|r| r.is_active()) {
            return Err(StoreError::Conflict(format!(
                "{} is still active",
                active.number
            )));
        }

        rounds.insert(round.number, round);
        Ok(())
    }

    fn claim(
        &self,
        number: RoundNumber,
        winner: UserId,
        proof: RoundProof,
        online: Vec<UserId>,
        now: Duration,
    ) -> Result<ClaimOutcome, StoreError> {
        let mut rounds = self.rounds.write();
        let round = rounds.get_mut(&number).ok_or_else(|| not_found(number))?;

        if round.status != RoundStatus::Open || round.winner.is_some() {
            return Ok(ClaimOutcome::AlreadyClaimed(round.clone()));
        }

        round.status = RoundStatus::Locked;
        round.winner = Some(winner);
        round.proof = Some(proof);
        round.claimed_at = Some(now);
        round.online_at_claim = online;
        Ok(ClaimOutcome::Claimed(round.clone()))
    }

    fn release(&self, number: RoundNumber, winner: UserId) -> Result<bool, StoreError> {
        let mut rounds = self.rounds.write();
        let round = rounds.get_mut(&number).ok_or_else(|| not_found(number))?;

        if round.status != RoundStatus::Locked
            || round.winner != Some(winner)
            || round.settlement.is_some()
        {
            return Ok(false);
        }

        round.status = RoundStatus::Open;
        round.winner = None;
        round.proof = None;
        round.claimed_at = None;
        round.online_at_claim.clear();
        Ok(true)
    }

    fn attach_settlement(
        &self,
        number: RoundNumber,
        settlement: Settlement,
    ) -> Result<Settlement, StoreError> {
        let mut rounds = self.rounds.write();
        let round = rounds.get_mut(&number).ok_or_else(|| not_found(number))?;

        if let Some(existing) = &round.settlement {
            return Ok(existing.clone());
        }
        if round.status != RoundStatus::Locked || round.winner != Some(settlement.finder) {
            return Err(StoreError::Conflict(format!(
                "{number} is not locked by {}",
                settlement.finder
            )));
        }

        round.settlement = Some(settlement.clone());
        Ok(settlement)
    }

    fn close(
        &self,
        number: RoundNumber,
        winner: UserId,
        now: Duration,
    ) -> Result<Round, StoreError> {
        let mut rounds = self.rounds.write();
        let round = rounds.get_mut(&number).ok_or_else(|| not_found(number))?;

        if round.winner != Some(winner) {
            return Err(StoreError::Conflict(format!("{number} is not held by {winner}")));
        }
        match round.status {
            RoundStatus::Closed => Ok(round.clone()),
            RoundStatus::Locked if round.settlement.is_some() => {
                round.status = RoundStatus::Closed;
                round.closed_at = Some(now);
                Ok(round.clone())
            }
            _ => Err(StoreError::Conflict(format!(
                "{number} has no settlement to close with"
            ))),
        }
    }

    fn add_counters(
        &self,
        number: RoundNumber,
        attempts: u64,
        participations: u64,
    ) -> Result<bool, StoreError> {
        let mut rounds = self.rounds.write();
        let round = rounds.get_mut(&number).ok_or_else(|| not_found(number))?;
        if round.status == RoundStatus::Closed {
            return Ok(false);
        }
        round.counters.attempts = round.counters.attempts.saturating_add(attempts);
        round.counters.participations = round
            .counters
            .participations
            .saturating_add(participations);
        Ok(true)
    }

    fn recent_closed(&self, limit: usize) -> Result<Vec<Round>, StoreError> {
        Ok(self
            .rounds
            .read()
            .values()
            .rev()
            .filter(|r| r.status == RoundStatus::Closed)
            .take(limit)
            .cloned()
            .collect())
    }

    fn closed_paid_to(&self, user: UserId) -> Result<Vec<Round>, StoreError> {
        Ok(self
            .rounds
            .read()
            .values()
            .rev()
            .filter(|r| r.status == RoundStatus::Closed)
            .filter(|r| {
                r.settlement
                    .as_ref()
                    .is_some_and(|s| s.reward_for(user).is_some())
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashrush_types::{Digest, EmissionSchedule, Tokens};

    fn round(n: u64) -> Round {
        Round::new(RoundNumber(n), &EmissionSchedule::default(), Duration::ZERO)
    }

    fn proof() -> RoundProof {
        RoundProof {
            nonce: 1,
            digest: Digest::ZERO,
        }
    }

    fn settlement(n: u64, finder: u64) -> Settlement {
        Settlement {
            round: RoundNumber(n),
            finder: UserId(finder),
            capped_reward: Tokens::from_whole(1000),
            finder_reward: Tokens::from_whole(1000),
            pool_share_each: Tokens::ZERO,
            pool_size: 0,
            pool: vec![],
            commissions: vec![],
        }
    }

    #[test]
    fn test_insert_enforces_sequence_and_single_active() {
        let store = InMemoryRoundStore::new();
        assert!(store.insert(round(2)).unwrap_err().is_conflict());
        store.insert(round(1)).unwrap();
        assert!(store.insert(round(1)).unwrap_err().is_conflict());
        assert!(store.insert(round(2)).unwrap_err().is_conflict(), "round 1 still active");
        assert_eq!(store.highest_number().unwrap(), Some(RoundNumber(1)));
    }

    #[test]
    fn test_claim_once() {
        let store = InMemoryRoundStore::new();
        store.insert(round(1)).unwrap();

        let first = store
            .claim(
                RoundNumber(1),
                UserId(1),
                proof(),
                vec![UserId(1), UserId(3)],
                Duration::ZERO,
            )
            .unwrap();
        let ClaimOutcome::Claimed(locked) = first else {
            panic!("first claim must win");
        };
        assert_eq!(locked.status, RoundStatus::Locked);
        assert_eq!(locked.online_at_claim, vec![UserId(1), UserId(3)]);

        let second = store
            .claim(RoundNumber(1), UserId(2), proof(), vec![], Duration::ZERO)
            .unwrap();
        let ClaimOutcome::AlreadyClaimed(r) = second else {
            panic!("second claim must fail");
        };
        assert_eq!(r.winner, Some(UserId(1)));
        assert_eq!(r.online_at_claim, vec![UserId(1), UserId(3)]);
    }

    #[test]
    fn test_release_only_without_settlement() {
        let store = InMemoryRoundStore::new();
        store.insert(round(1)).unwrap();
        store
            .claim(RoundNumber(1), UserId(1), proof(), vec![], Duration::ZERO)
            .unwrap();

        assert!(!store.release(RoundNumber(1), UserId(2)).unwrap());
        assert!(store.release(RoundNumber(1), UserId(1)).unwrap());
        let r = store.get(RoundNumber(1)).unwrap().unwrap();
        assert_eq!(r.status, RoundStatus::Open);
        assert_eq!(r.winner, None);
        assert!(r.online_at_claim.is_empty());

        store
            .claim(RoundNumber(1), UserId(1), proof(), vec![], Duration::ZERO)
            .unwrap();
        store.attach_settlement(RoundNumber(1), settlement(1, 1)).unwrap();
        assert!(!store.release(RoundNumber(1), UserId(1)).unwrap());
    }

    #[test]
    fn test_settlement_first_write_wins_and_close_is_idempotent() {
        let store = InMemoryRoundStore::new();
        store.insert(round(1)).unwrap();
        assert!(store
            .attach_settlement(RoundNumber(1), settlement(1, 1))
            .unwrap_err()
            .is_conflict());
        store
            .claim(RoundNumber(1), UserId(1), proof(), vec![], Duration::ZERO)
            .unwrap();
        assert!(store
            .close(RoundNumber(1), UserId(1), Duration::ZERO)
            .unwrap_err()
            .is_conflict());

        let first = store.attach_settlement(RoundNumber(1), settlement(1, 1)).unwrap();
        let mut other = settlement(1, 1);
        other.finder_reward = Tokens::from_whole(1);
        assert_eq!(store.attach_settlement(RoundNumber(1), other).unwrap(), first);

        let closed = store
            .close(RoundNumber(1), UserId(1), Duration::from_secs(5))
            .unwrap();
        let again = store
            .close(RoundNumber(1), UserId(1), Duration::from_secs(9))
            .unwrap();
        assert_eq!(closed.closed_at, Some(Duration::from_secs(5)));
        assert_eq!(again, closed);
        assert!(store
            .close(RoundNumber(1), UserId(2), Duration::from_secs(9))
            .is_err());

        store.insert(round(2)).unwrap();
        assert_eq!(store.active().unwrap().map(|r| r.number), Some(RoundNumber(2)));
        assert_eq!(store.recent_closed(10).unwrap().len(), 1);
        assert_eq!(store.closed_paid_to(UserId(1)).unwrap().len(), 1);
        assert!(store.closed_paid_to(UserId(2)).unwrap().is_empty());
    }

    #[test]
    fn test_counters_freeze_once_closed() {
        let store = InMemoryRoundStore::new();
        store.insert(round(1)).unwrap();
        assert!(store.add_counters(RoundNumber(1), 2, 1).unwrap());

        store
            .claim(RoundNumber(1), UserId(1), proof(), vec![], Duration::ZERO)
            .unwrap();
        assert!(store.add_counters(RoundNumber(1), 2, 1).unwrap());
        store.attach_settlement(RoundNumber(1), settlement(1, 1)).unwrap();
        store.close(RoundNumber(1), UserId(1), Duration::ZERO).unwrap();

        assert!(!store.add_counters(RoundNumber(1), 2, 1).unwrap());
        let r = store.get(RoundNumber(1)).unwrap().unwrap();
        assert_eq!((r.counters.attempts, r.counters.participations), (4, 2));
    }
}
