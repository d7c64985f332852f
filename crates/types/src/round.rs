//! Round and settlement types.

use crate::{Digest, EmissionSchedule, RoundNumber, Tokens, UserId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle status of a round.
///
/// ```text
/// Open ──claim──▶ Locked ──close──▶ Closed
///   ▲               │
///   └───release─────┘   (settlement refused, round stays unclaimed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    /// Accepting participants and proofs.
    Open,
    /// A winner has claimed the round; settlement in progress.
    Locked,
    /// Settled and final.
    Closed,
}

impl RoundStatus {
    /// Whether a round in this status counts as the active round.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Open | Self::Locked)
    }
}

/// The winning proof recorded at claim time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundProof {
    /// Nonce that produced the digest.
    pub nonce: u64,
    /// Server-computed digest.
    pub digest: Digest,
}

/// Aggregate activity counters for a round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundCounters {
    /// Simulated proof attempts reported through heartbeats.
    pub attempts: u64,
    /// Participation events (joins and heartbeats).
    pub participations: u64,
}

/// A single reward credit paid out of a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// Recipient.
    pub user: UserId,
    /// Amount credited.
    pub amount: Tokens,
}

/// A referral commission paid alongside a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commission {
    /// Account receiving the commission.
    pub referrer: UserId,
    /// Account whose reward generated it.
    pub referee: UserId,
    /// Commission amount.
    pub amount: Tokens,
}

/// The complete, precomputed outcome of settling a round.
///
/// Computed once after the claim and attached to the round before any
/// balance is touched, so a retried settlement replays this record instead
/// of recomputing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Round being settled.
    pub round: RoundNumber,
    /// The finder.
    pub finder: UserId,
    /// Base reward clamped to supply headroom.
    pub capped_reward: Tokens,
    /// Finder's reward.
    pub finder_reward: Tokens,
    /// Per-member pool share.
    pub pool_share_each: Tokens,
    /// Online non-finder participants at claim time, including any whose
    /// share rounded to nothing.
    #[serde(default)]
    pub pool_size: usize,
    /// Pool payouts, one per pool member with a non-zero share.
    pub pool: Vec<Payout>,
    /// Referral commissions.
    pub commissions: Vec<Commission>,
}

impl Settlement {
    /// Sum paid to finder and pool (commissions excluded).
    pub fn total_paid(&self) -> Tokens {
        self.finder_reward + self.pool.iter().map(|p| p.amount).sum::<Tokens>()
    }

    /// Reward paid to a user as finder or pool member, if any.
    pub fn reward_for(&self, user: UserId) -> Option<Tokens> {
        if user == self.finder {
            return Some(self.finder_reward);
        }
        self.pool.iter().find(|p| p.user == user).map(|p| p.amount)
    }

    /// All reward payouts, finder first.
    pub fn payouts(&self) -> impl Iterator<Item = Payout> + '_ {
        std::iter::once(Payout {
            user: self.finder,
            amount: self.finder_reward,
        })
        .chain(self.pool.iter().cloned())
    }
}

/// One proof-discovery round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Sequence number.
    pub number: RoundNumber,
    /// Required leading zero hex digits.
    pub difficulty: u32,
    /// Halving era.
    pub era: u32,
    /// Reward before supply clamping.
    pub base_reward: Tokens,
    /// Lifecycle status.
    pub status: RoundStatus,
    /// Winner, set on claim.
    pub winner: Option<UserId>,
    /// Winning proof, set on claim.
    pub proof: Option<RoundProof>,
    /// Activity counters.
    pub counters: RoundCounters,
    /// Creation time (since Unix epoch).
    pub created_at: Duration,
    /// Claim time (since Unix epoch).
    pub claimed_at: Option<Duration>,
    /// Users online when the round was claimed. Settlement splits the
    /// pool among these, however late it runs.
    #[serde(default)]
    pub online_at_claim: Vec<UserId>,
    /// Closure time (since Unix epoch).
    pub closed_at: Option<Duration>,
    /// Settlement record, attached while Locked.
    pub settlement: Option<Settlement>,
}

impl Round {
    /// Create a fresh Open round with parameters derived from its number.
    pub fn new(number: RoundNumber, schedule: &EmissionSchedule, now: Duration) -> Self {
        Self {
            number,
            difficulty: schedule.difficulty(number),
            era: schedule.era(number),
            base_reward: schedule.reward(number),
            status: RoundStatus::Open,
            winner: None,
            proof: None,
            counters: RoundCounters::default(),
            created_at: now,
            claimed_at: None,
            online_at_claim: Vec::new(),
            closed_at: None,
            settlement: None,
        }
    }

    /// Whether the round is Open or Locked.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Whether a winner has been recorded.
    pub fn is_claimed(&self) -> bool {
        self.winner.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_round_derives_parameters() {
        let schedule = EmissionSchedule::default();
        let round = Round::new(RoundNumber(201), &schedule, Duration::from_secs(5));
        assert_eq!(round.difficulty, 5);
        assert_eq!(round.era, 2);
        assert_eq!(round.base_reward, Tokens::from_whole(250));
        assert_eq!(round.status, RoundStatus::Open);
        assert!(round.is_active());
        assert!(!round.is_claimed());
    }

    #[test]
    fn test_settlement_totals() {
        let settlement = Settlement {
            round: RoundNumber(1),
            finder: UserId(1),
            capped_reward: Tokens::from_whole(1000),
            finder_reward: Tokens::from_whole(500),
            pool_share_each: Tokens::from_whole(250),
            pool_size: 2,
            pool: vec![
                Payout {
                    user: UserId(2),
                    amount: Tokens::from_whole(250),
                },
                Payout {
                    user: UserId(3),
                    amount: Tokens::from_whole(250),
                },
            ],
            commissions: vec![],
        };
        assert_eq!(settlement.total_paid(), Tokens::from_whole(1000));
        assert_eq!(settlement.reward_for(UserId(1)), Some(Tokens::from_whole(500)));
        assert_eq!(settlement.reward_for(UserId(3)), Some(Tokens::from_whole(250)));
        assert_eq!(settlement.reward_for(UserId(9)), None);
        assert_eq!(settlement.payouts().count(), 3);
    }
}
