//! Serializable views returned by the node.
//!
//! Field names are camelCase on the wire. Timestamps are milliseconds since
//! the Unix epoch; token amounts are decimal numbers.

use hashrush_core::CommissionRecord;
use hashrush_types::{
    Account, MiningMode, ParticipantEntry, Round, RoundStatus, Settlement, Tokens, UserId,
};
use serde::Serialize;
use std::time::Duration;

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Snapshot of the active round.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
    pub block_number: u64,
    pub difficulty: u32,
    pub reward: Tokens,
    pub era: u32,
    pub status: RoundStatus,
    pub online_miners: usize,
    pub total_attempts: u64,
    pub total_participations: u64,
    pub created_at: u64,
}

impl RoundView {
    pub(crate) fn new(round: &Round, online_miners: usize) -> Self {
        Self {
            block_number: round.number.0,
            difficulty: round.difficulty,
            reward: round.base_reward,
            era: round.era,
            status: round.status,
            online_miners,
            total_attempts: round.counters.attempts,
            total_participations: round.counters.participations,
            created_at: millis(round.created_at),
        }
    }
}

/// A mode as offered to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeView {
    pub id: MiningMode,
    pub label: &'static str,
    pub energy_cost: u64,
    pub multiplier: u64,
    pub unlocked: bool,
    /// Unlocked and affordable right now.
    pub available: bool,
}

impl ModeView {
    pub(crate) fn new(mode: MiningMode, account: &Account) -> Self {
        let unlocked = account.has_unlocked(mode);
        Self {
            id: mode,
            label: mode.label(),
            energy_cost: mode.energy_cost(),
            multiplier: mode.multiplier(),
            unlocked,
            available: unlocked && account.can_afford(mode),
        }
    }
}

/// Response to a join.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinReceipt {
    pub round: RoundView,
    pub mode: ModeView,
    pub energy: u64,
    pub max_energy: u64,
    pub rejoined: bool,
}

/// Response to a heartbeat.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatReceipt {
    #[serde(rename = "continue")]
    pub keep_going: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub energy: u64,
    pub max_energy: u64,
    pub tokens: Tokens,
}

/// Response to a winning submit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub block_number: u64,
    pub finder_reward: Tokens,
    pub pool_miners_count: usize,
    pub pool_share_each: Tokens,
    pub total_reward: Tokens,
}

impl From<&Settlement> for SubmitReceipt {
    fn from(s: &Settlement) -> Self {
        Self {
            block_number: s.round.0,
            finder_reward: s.finder_reward,
            pool_miners_count: s.pool_size,
            pool_share_each: s.pool_share_each,
            total_reward: s.total_paid(),
        }
    }
}

/// The caller's entry in the active round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationView {
    pub block_number: u64,
    pub mode: MiningMode,
    pub joined_at: u64,
    pub last_heartbeat: u64,
}

impl From<&ParticipantEntry> for ParticipationView {
    fn from(entry: &ParticipantEntry) -> Self {
        Self {
            block_number: entry.round.0,
            mode: entry.mode,
            joined_at: millis(entry.joined_at),
            last_heartbeat: millis(entry.last_heartbeat),
        }
    }
}

/// The caller's mining standing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningStatus {
    pub energy: u64,
    pub max_energy: u64,
    pub tokens: Tokens,
    pub total_mined: Tokens,
    pub mining_sessions: u64,
    pub mining: Option<ParticipationView>,
}

/// A closed round.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedRoundView {
    pub block_number: u64,
    pub difficulty: u32,
    pub reward: Tokens,
    pub mined_by: Option<UserId>,
    pub pool_miners_count: usize,
    pub total_attempts: u64,
    pub total_participations: u64,
    pub completed_at: Option<u64>,
}

impl From<&Round> for ClosedRoundView {
    fn from(round: &Round) -> Self {
        let settlement = round.settlement.as_ref();
        Self {
            block_number: round.number.0,
            difficulty: round.difficulty,
            reward: settlement.map_or(Tokens::ZERO, Settlement::total_paid),
            mined_by: round.winner,
            pool_miners_count: settlement.map_or(0, |s| s.pool_size),
            total_attempts: round.counters.attempts,
            total_participations: round.counters.participations,
            completed_at: round.closed_at.map(millis),
        }
    }
}

/// How a user was paid in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutRole {
    Finder,
    Pool,
}

/// One settlement the user was paid in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub block_number: u64,
    pub role: PayoutRole,
    pub reward: Tokens,
    pub completed_at: Option<u64>,
}

impl HistoryEntry {
    pub(crate) fn for_user(round: &Round, user: UserId) -> Option<Self> {
        let settlement = round.settlement.as_ref()?;
        let reward = settlement.reward_for(user)?;
        Some(Self {
            block_number: round.number.0,
            role: if settlement.finder == user {
                PayoutRole::Finder
            } else {
                PayoutRole::Pool
            },
            reward,
            completed_at: round.closed_at.map(millis),
        })
    }
}

/// Page position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}

/// A page of mining history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPage {
    pub entries: Vec<HistoryEntry>,
    pub pagination: Pagination,
}

/// Account as shown after registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: UserId,
    pub identity: String,
    pub energy: u64,
    pub max_energy: u64,
    pub tokens: Tokens,
    pub total_mined: Tokens,
    pub mining_sessions: u64,
    pub unlocked_modes: Vec<MiningMode>,
    pub referral_code: String,
    pub referral_count: u64,
    pub referral_earnings: Tokens,
    pub is_new_user: bool,
}

impl AccountView {
    pub(crate) fn new(account: Account, is_new_user: bool) -> Self {
        Self {
            id: account.user,
            identity: account.identity,
            energy: account.energy,
            max_energy: account.max_energy,
            tokens: account.tokens,
            total_mined: account.total_mined,
            mining_sessions: account.mining_sessions,
            unlocked_modes: account.unlocked_modes.into_iter().collect(),
            referral_code: account.referral_code,
            referral_count: account.referral_count,
            referral_earnings: account.referral_earnings,
            is_new_user,
        }
    }
}

/// One commission credited to a referrer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionView {
    pub block_number: u64,
    pub referee: UserId,
    pub commission: Tokens,
}

impl From<&CommissionRecord> for CommissionView {
    fn from(record: &CommissionRecord) -> Self {
        Self {
            block_number: record.round.0,
            referee: record.referee,
            commission: record.amount,
        }
    }
}

/// Referral standing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralView {
    pub referral_code: String,
    pub referral_count: u64,
    pub referral_earnings: Tokens,
    pub recent_commissions: Vec<CommissionView>,
}
