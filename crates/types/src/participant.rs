//! Ephemeral participant entries.

use crate::{MiningMode, RoundNumber, UserId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One miner's presence in one round.
///
/// Entries live only as long as the round and are keyed by
/// `(round, user)`; a user has at most one entry per round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantEntry {
    /// Round the entry belongs to.
    pub round: RoundNumber,
    /// Participant.
    pub user: UserId,
    /// External identity used as hashing input.
    pub identity: String,
    /// Selected mode.
    pub mode: MiningMode,
    /// Join time (since Unix epoch).
    pub joined_at: Duration,
    /// Last heartbeat time (since Unix epoch).
    pub last_heartbeat: Duration,
}

impl ParticipantEntry {
    /// Create an entry whose heartbeat starts at the join time.
    pub fn new(
        round: RoundNumber,
        user: UserId,
        identity: impl Into<String>,
        mode: MiningMode,
        now: Duration,
    ) -> Self {
        Self {
            round,
            user,
            identity: identity.into(),
            mode,
            joined_at: now,
            last_heartbeat: now,
        }
    }

    /// Time since the last heartbeat.
    pub fn heartbeat_age(&self, now: Duration) -> Duration {
        now.saturating_sub(self.last_heartbeat)
    }

    /// Whether the entry is still live under `timeout`.
    pub fn is_live(&self, now: Duration, timeout: Duration) -> bool {
        self.heartbeat_age(now) < timeout
    }
}
