//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable internal user reference.
///
/// Assigned by the authentication layer; the mining core never creates
/// users, it only looks them up.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User({})", self.0)
    }
}

/// Round sequence number.
///
/// Sequence numbers start at 1 and never skip or repeat.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoundNumber(pub u64);

impl RoundNumber {
    /// The first round ever created.
    pub const FIRST: Self = RoundNumber(1);

    /// Get the next round number.
    pub fn next(self) -> Self {
        RoundNumber(self.0 + 1)
    }

    /// Get the previous round number (returns None before the first round).
    pub fn prev(self) -> Option<Self> {
        if self.0 > 1 {
            Some(RoundNumber(self.0 - 1))
        } else {
            None
        }
    }

    /// Zero-based index used by the emission schedule.
    pub fn index(self) -> u64 {
        self.0.saturating_sub(1)
    }
}

impl fmt::Display for RoundNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Round({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_number_next_prev() {
        let round = RoundNumber(10);
        assert_eq!(round.next(), RoundNumber(11));
        assert_eq!(round.prev(), Some(RoundNumber(9)));

        assert_eq!(RoundNumber::FIRST.prev(), None);
        assert_eq!(RoundNumber::FIRST.next(), RoundNumber(2));
    }

    #[test]
    fn test_round_number_index() {
        assert_eq!(RoundNumber(1).index(), 0);
        assert_eq!(RoundNumber(101).index(), 100);
        assert_eq!(RoundNumber(0).index(), 0);
    }

    #[test]
    fn test_user_id_serializes_transparently() {
        let json = serde_json::to_string(&UserId(7)).unwrap();
        assert_eq!(json, "7");
    }
}
