//! Node configuration.

use hashrush_accounts::{EnergyConfig, ReferralConfig};
use hashrush_participants::ParticipantConfig;
use hashrush_rewards::RewardConfig;
use hashrush_types::EmissionSchedule;
use std::time::Duration;

/// Configuration for a [`MiningNode`](crate::MiningNode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningConfig {
    /// Emission and difficulty schedule.
    pub schedule: EmissionSchedule,

    /// Energy regeneration and boosts.
    pub energy: EnergyConfig,

    /// Heartbeat timeout.
    pub participants: ParticipantConfig,

    /// Finder share and commission.
    pub rewards: RewardConfig,

    /// Registration-time referral bonus.
    pub referral: ReferralConfig,

    /// How long a claimed round may stay unsettled before another request
    /// finishes the settlement on the winner's behalf.
    pub settlement_grace: Duration,

    /// Number of closed rounds returned by the recent-rounds view.
    pub recent_rounds: usize,

    /// Upper bound on history page size.
    pub max_page_size: usize,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            schedule: EmissionSchedule::default(),
            energy: EnergyConfig::default(),
            participants: ParticipantConfig::default(),
            rewards: RewardConfig::default(),
            referral: ReferralConfig::default(),
            settlement_grace: Duration::from_secs(5),
            recent_rounds: 10,
            max_page_size: 100,
        }
    }
}

impl MiningConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the emission schedule.
    pub fn with_schedule(mut self, schedule: EmissionSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Set the energy configuration.
    pub fn with_energy(mut self, energy: EnergyConfig) -> Self {
        self.energy = energy;
        self
    }

    /// Set the participant configuration.
    pub fn with_participants(mut self, participants: ParticipantConfig) -> Self {
        self.participants = participants;
        self
    }

    /// Set the heartbeat timeout.
    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.participants = self.participants.with_heartbeat_timeout(timeout);
        self
    }

    /// Set the reward configuration.
    pub fn with_rewards(mut self, rewards: RewardConfig) -> Self {
        self.rewards = rewards;
        self
    }

    /// Set the referral configuration.
    pub fn with_referral(mut self, referral: ReferralConfig) -> Self {
        self.referral = referral;
        self
    }

    /// Set the settlement grace period.
    pub fn with_settlement_grace(mut self, grace: Duration) -> Self {
        self.settlement_grace = grace;
        self
    }

    /// Set the recent-rounds count.
    pub fn with_recent_rounds(mut self, count: usize) -> Self {
        self.recent_rounds = count;
        self
    }
}
