//! Finder / pool arithmetic.

use hashrush_types::Tokens;

/// How a clamped reward divides between finder and pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardSplit {
    /// Finder's reward.
    pub finder: Tokens,
    /// Each pool member's reward.
    pub pool_share_each: Tokens,
    /// Rounding grid used, in base units.
    pub quantum: u64,
}

impl RewardSplit {
    /// Finder plus every pool share.
    pub fn total(&self, pool_size: usize) -> Tokens {
        self.finder + self.pool_share_each.times(pool_size as u64)
    }
}

/// Divide `capped` between the finder and `pool_size` other miners.
///
/// Amounts are rounded to whole cents, except when supply clamping has cut
/// the reward below `base_reward`: then the grid is one base unit so that
/// the last sliver of supply can still be paid out. The finder's share is
/// rounded half-up, pool shares are rounded down, so the total never
/// exceeds `capped`. With an empty pool the finder takes everything.
pub fn split_reward(
    capped: Tokens,
    base_reward: Tokens,
    pool_size: usize,
    finder_share_bps: u32,
    cent_quantum: u64,
) -> RewardSplit {
    let quantum = if capped < base_reward { 1 } else { cent_quantum.max(1) };

    if pool_size == 0 {
        return RewardSplit {
            finder: capped,
            pool_share_each: Tokens::ZERO,
            quantum,
        };
    }

    let finder = capped.scale_bps(finder_share_bps, quantum).min(capped);
    let pool_share_each = capped
        .saturating_sub(finder)
        .split_floor(pool_size as u64, quantum);
    RewardSplit {
        finder,
        pool_share_each,
        quantum,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENT: u64 = Tokens::UNITS_PER_CENT;

    #[test]
    fn test_even_split_with_one_pool_member() {
        let split = split_reward(Tokens::from_whole(1000), Tokens::from_whole(1000), 1, 5000, CENT);
        assert_eq!(split.finder, Tokens::from_whole(500));
        assert_eq!(split.pool_share_each, Tokens::from_whole(500));
        assert_eq!(split.total(1), Tokens::from_whole(1000));
    }

    #[test]
    fn test_solo_finder_takes_all() {
        let split = split_reward(Tokens::from_whole(500), Tokens::from_whole(500), 0, 5000, CENT);
        assert_eq!(split.finder, Tokens::from_whole(500));
        assert_eq!(split.total(0), Tokens::from_whole(500));
    }

    #[test]
    fn test_pool_rounds_down_to_cents() {
        // 500 / 3 = 166.666.. → 166.66 each, 0.02 left unminted.
        let split = split_reward(Tokens::from_whole(1000), Tokens::from_whole(1000), 3, 5000, CENT);
        assert_eq!(split.pool_share_each, Tokens::from_cents(16_666));
        assert_eq!(split.total(3), Tokens::from_cents(99_998));
    }

    #[test]
    fn test_clamped_reward_uses_base_units() {
        let capped = Tokens::from_units(300_000); // 0.003
        let split = split_reward(capped, Tokens::from_whole(1000), 1, 5000, CENT);
        assert_eq!(split.quantum, 1);
        assert_eq!(split.finder, Tokens::from_units(150_000));
        assert_eq!(split.pool_share_each, Tokens::from_units(150_000));
        assert_eq!(split.total(1), capped);

        let solo = split_reward(capped, Tokens::from_whole(1000), 0, 5000, CENT);
        assert_eq!(solo.finder, capped);
    }

    #[test]
    fn test_never_exceeds_capped() {
        for units in [1u64, 2, 3, 7, 999, 1_000_001, 123_456_789] {
            for pool in 0..7usize {
                let capped = Tokens::from_units(units);
                let split = split_reward(capped, Tokens::from_whole(1000), pool, 5000, CENT);
                assert!(split.total(pool) <= capped, "units={units} pool={pool}");
            }
        }
    }
}
