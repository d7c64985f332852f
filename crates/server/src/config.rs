//! Server configuration file.
//!
//! ```toml
//! listen = "0.0.0.0:8080"
//! heartbeat_timeout_secs = 30
//! settlement_grace_secs = 5
//!
//! [schedule]
//! initial_reward = 1000.0
//! halving_interval = 100
//! ```
//!
//! Every key is optional; missing keys take the defaults of
//! [`MiningConfig`].

use hashrush_node::{
    EmissionSchedule, EnergyConfig, MiningConfig, ParticipantConfig, ReferralConfig, RewardConfig,
    Tokens,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds.
    pub listen: SocketAddr,

    /// Emission and difficulty schedule.
    pub schedule: EmissionSchedule,

    /// Seconds without a heartbeat before a miner drops out of the pool.
    pub heartbeat_timeout_secs: u64,

    /// Seconds a claimed round may stay unsettled before another request
    /// finishes it.
    pub settlement_grace_secs: u64,

    /// Energy regained per second.
    pub energy_regen_per_second: u64,

    /// Energy and capacity added by one boost.
    pub energy_boost: u64,

    /// Finder's share of a round reward, in basis points.
    pub finder_share_bps: u32,

    /// Referral commission, in basis points of the referee's reward.
    pub commission_bps: u32,

    /// Bonus credited to a referrer per signup.
    pub signup_bonus: Tokens,

    /// Closed rounds shown by the recent-rounds view.
    pub recent_rounds: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let mining = MiningConfig::default();
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            schedule: mining.schedule,
            heartbeat_timeout_secs: mining.participants.heartbeat_timeout.as_secs(),
            settlement_grace_secs: mining.settlement_grace.as_secs(),
            energy_regen_per_second: mining.energy.regen_per_second,
            energy_boost: mining.energy.boost_amount,
            finder_share_bps: mining.rewards.finder_share_bps,
            commission_bps: mining.rewards.commission_bps,
            signup_bonus: mining.referral.signup_bonus,
            recent_rounds: mining.recent_rounds,
        }
    }
}

impl ServerConfig {
    /// Read and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the mining core cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.finder_share_bps > 10_000 {
            return Err(ConfigError::Invalid(format!(
                "finder_share_bps {} exceeds 10000",
                self.finder_share_bps
            )));
        }
        if self.heartbeat_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat_timeout_secs must be positive".into(),
            ));
        }
        if self.schedule.halving_interval == 0 || self.schedule.difficulty_step == 0 {
            return Err(ConfigError::Invalid(
                "halving_interval and difficulty_step must be positive".into(),
            ));
        }
        Ok(())
    }

    /// The node configuration this file describes.
    pub fn mining_config(&self) -> MiningConfig {
        MiningConfig::new()
            .with_schedule(self.schedule.clone())
            .with_participants(
                ParticipantConfig::default()
                    .with_heartbeat_timeout(Duration::from_secs(self.heartbeat_timeout_secs)),
            )
            .with_settlement_grace(Duration::from_secs(self.settlement_grace_secs))
            .with_energy(
                EnergyConfig::default()
                    .with_regen_per_second(self.energy_regen_per_second)
                    .with_boost_amount(self.energy_boost),
            )
            .with_rewards(
                RewardConfig::default()
                    .with_finder_share_bps(self.finder_share_bps)
                    .with_commission_bps(self.commission_bps),
            )
            .with_referral(ReferralConfig::default().with_signup_bonus(self.signup_bonus))
            .with_recent_rounds(self.recent_rounds)
    }
}
