//! Halving emission and difficulty schedule.
//!
//! Every round parameter is a pure function of the round sequence number:
//!
//! ```text
//! era(n)        = floor((n - 1) / halving_interval)
//! reward(n)     = max(initial_reward / 2^era(n), min_reward)
//! difficulty(n) = min(base + floor((n - 1) / difficulty_step), max)
//! ```

use crate::{RoundNumber, Tokens};
use serde::{Deserialize, Serialize};

/// Emission and difficulty parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionSchedule {
    /// Hard cap on tokens ever minted by settlements.
    pub total_supply: Tokens,

    /// Reward of the first era.
    pub initial_reward: Tokens,

    /// Rounds per halving era.
    pub halving_interval: u64,

    /// Reward floor once halvings have driven the reward below it.
    pub min_reward: Tokens,

    /// Difficulty of the first round.
    pub base_difficulty: u32,

    /// Rounds between difficulty increments.
    pub difficulty_step: u64,

    /// Difficulty ceiling.
    pub max_difficulty: u32,
}

impl Default for EmissionSchedule {
    fn default() -> Self {
        Self {
            total_supply: Tokens::from_whole(1_000_000_000),
            initial_reward: Tokens::from_whole(1000),
            halving_interval: 100,
            min_reward: Tokens::from_cents(1),
            base_difficulty: 4,
            difficulty_step: 200,
            max_difficulty: 10,
        }
    }
}

impl EmissionSchedule {
    /// Halving era of a round.
    pub fn era(&self, round: RoundNumber) -> u32 {
        let era = round.index() / self.halving_interval.max(1);
        u32::try_from(era).unwrap_or(u32::MAX)
    }

    /// Base reward of a round.
    pub fn reward(&self, round: RoundNumber) -> Tokens {
        let halved = self
            .initial_reward
            .units()
            .checked_shr(self.era(round))
            .unwrap_or(0);
        Tokens::from_units(halved).max(self.min_reward)
    }

    /// Required leading zero hex digits for a round.
    pub fn difficulty(&self, round: RoundNumber) -> u32 {
        let steps = round.index() / self.difficulty_step.max(1);
        let steps = u32::try_from(steps).unwrap_or(u32::MAX);
        self.base_difficulty
            .saturating_add(steps)
            .min(self.max_difficulty)
    }
}
