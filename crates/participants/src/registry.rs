//! Join, heartbeat, leave and eviction.

use crate::RegistryError;
use hashrush_accounts::{EnergyAccount, TickOutcome};
use hashrush_core::{ParticipantStore, RoundStore};
use hashrush_types::{Account, MiningMode, ParticipantEntry, RoundNumber, UserId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Registry parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantConfig {
    /// An entry not refreshed within this long is absent.
    pub heartbeat_timeout: Duration,
}

impl Default for ParticipantConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout: Duration::from_secs(30),
        }
    }
}

impl ParticipantConfig {
    /// Set the heartbeat timeout.
    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }
}

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    /// The new entry.
    pub entry: ParticipantEntry,
    /// Account after regeneration.
    pub account: Account,
    /// Whether an earlier entry of the same user was replaced.
    pub rejoined: bool,
}

/// Why a miner must stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Not enough energy for another tick.
    Energy,
}

impl StopReason {
    /// Machine-readable reason string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Energy => "energy",
        }
    }
}

/// Result of a heartbeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// Tick paid and liveness refreshed.
    Continue(Account),
    /// The entry was evicted; the miner must stop.
    Stop {
        /// Why.
        reason: StopReason,
        /// Account at eviction.
        account: Account,
    },
}

impl HeartbeatOutcome {
    /// The account snapshot either way.
    pub fn account(&self) -> &Account {
        match self {
            Self::Continue(account) | Self::Stop { account, .. } => account,
        }
    }
}

/// The per-round pool of active miners.
#[derive(Clone)]
pub struct ParticipantRegistry {
    entries: Arc<dyn ParticipantStore>,
    rounds: Arc<dyn RoundStore>,
    energy: EnergyAccount,
    config: ParticipantConfig,
}

impl ParticipantRegistry {
    /// Create over the participant store, the round store (for counters)
    /// and the energy account.
    pub fn new(
        entries: Arc<dyn ParticipantStore>,
        rounds: Arc<dyn RoundStore>,
        energy: EnergyAccount,
        config: ParticipantConfig,
    ) -> Self {
        Self {
            entries,
            rounds,
            energy,
            config,
        }
    }

    /// Registry parameters.
    pub fn config(&self) -> &ParticipantConfig {
        &self.config
    }

    /// Admit `user` to round `seq` in `mode`.
    ///
    /// The account must have unlocked the mode and hold one tick of energy
    /// for it after regeneration. A previous entry for the user in this
    /// round is replaced, never duplicated. If the round closes before the
    /// entry is counted, the entry is withdrawn and the join fails with
    /// [`RegistryError::RoundClosed`].
    pub fn join(
        &self,
        seq: RoundNumber,
        user: UserId,
        identity: &str,
        mode: MiningMode,
        now: Duration,
    ) -> Result<Joined, RegistryError> {
        let account = self.energy.check_join(user, mode, now)?;
        let entry = ParticipantEntry::new(seq, user, identity, mode, now);
        let replaced = self.entries.upsert(entry.clone())?;
        if !self.rounds.add_counters(seq, 0, 1)? {
            self.entries
                .remove_if_unchanged(seq, user, entry.last_heartbeat)?;
            debug!(round = seq.0, user = user.0, "Join lost to round closure");
            return Err(RegistryError::RoundClosed(seq));
        }

        debug!(
            round = seq.0,
            user = user.0,
            %mode,
            rejoined = replaced.is_some(),
            "Participant joined"
        );
        Ok(Joined {
            entry,
            account,
            rejoined: replaced.is_some(),
        })
    }

    /// Charge one tick and refresh liveness.
    ///
    /// An entry that has already timed out is purged and treated as never
    /// joined. If the tick cannot be paid the entry is evicted and the
    /// caller is told to stop. Otherwise the round's counters grow by one
    /// participation and by the mode multiplier in attempts.
    pub fn heartbeat(
        &self,
        seq: RoundNumber,
        user: UserId,
        now: Duration,
    ) -> Result<HeartbeatOutcome, RegistryError> {
        let not_joined = RegistryError::NotJoined { round: seq, user };
        let entry = self.entries.get(seq, user)?.ok_or(not_joined.clone())?;

        if !entry.is_live(now, self.config.heartbeat_timeout) {
            self.entries
                .remove_if_unchanged(seq, user, entry.last_heartbeat)?;
            debug!(round = seq.0, user = user.0, "Heartbeat from timed-out participant");
            return Err(not_joined);
        }

        match self.energy.debit_tick(user, entry.mode, now)? {
            TickOutcome::Exhausted(account) => {
                self.entries
                    .remove_if_unchanged(seq, user, entry.last_heartbeat)?;
                info!(
                    round = seq.0,
                    user = user.0,
                    energy = account.energy,
                    "Evicted participant out of energy"
                );
                Ok(HeartbeatOutcome::Stop {
                    reason: StopReason::Energy,
                    account,
                })
            }
            TickOutcome::Debited(account) => {
                if !self.entries.touch(seq, user, now)? {
                    return Err(not_joined);
                }
                self.rounds.add_counters(seq, entry.mode.multiplier(), 1)?;
                Ok(HeartbeatOutcome::Continue(account))
            }
        }
    }

    /// Remove the user's entry. Returns whether one existed.
    pub fn leave(&self, seq: RoundNumber, user: UserId) -> Result<bool, RegistryError> {
        let removed = self.entries.remove(seq, user)?.is_some();
        debug!(round = seq.0, user = user.0, removed, "Participant left");
        Ok(removed)
    }

    /// Purge entries past the heartbeat timeout.
    pub fn evict_stale(
        &self,
        seq: RoundNumber,
        now: Duration,
    ) -> Result<Vec<ParticipantEntry>, RegistryError> {
        let evicted = self
            .entries
            .remove_stale(seq, now, self.config.heartbeat_timeout)?;
        if !evicted.is_empty() {
            info!(round = seq.0, evicted = evicted.len(), "Evicted stale participants");
        }
        Ok(evicted)
    }

    /// Live entries of a round, after purging stale ones.
    pub fn list_online(
        &self,
        seq: RoundNumber,
        now: Duration,
    ) -> Result<Vec<ParticipantEntry>, RegistryError> {
        self.evict_stale(seq, now)?;
        let timeout = self.config.heartbeat_timeout;
        Ok(self
            .entries
            .entries(seq)?
            .into_iter()
            .filter(|e| e.is_live(now, timeout))
            .collect())
    }

    /// The user's live entry in a round, if any.
    pub fn entry(
        &self,
        seq: RoundNumber,
        user: UserId,
        now: Duration,
    ) -> Result<Option<ParticipantEntry>, RegistryError> {
        let timeout = self.config.heartbeat_timeout;
        Ok(self
            .entries
            .get(seq, user)?
            .filter(|e| e.is_live(now, timeout)))
    }

    /// Drop every entry of a closed round.
    pub fn clear_round(&self, seq: RoundNumber) -> Result<usize, RegistryError> {
        let cleared = self.entries.clear_round(seq)?;
        debug!(round = seq.0, cleared, "Cleared round participants");
        Ok(cleared)
    }
}

impl std::fmt::Debug for ParticipantRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticipantRegistry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryParticipantStore;
    use hashrush_accounts::{AccountError, EnergyConfig, InMemoryAccountStore};
    use hashrush_core::AccountStore;
    use hashrush_rounds::InMemoryRoundStore;
    use hashrush_types::{Digest, EmissionSchedule, Round, RoundProof, Settlement, Tokens};
    use tracing_test::traced_test;

    const ROUND: RoundNumber = RoundNumber(1);

    struct Fixture {
        registry: ParticipantRegistry,
        accounts: Arc<InMemoryAccountStore>,
        rounds: Arc<InMemoryRoundStore>,
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn fixture(energies: &[u64]) -> Fixture {
        let accounts = Arc::new(InMemoryAccountStore::new());
        for (i, &energy) in energies.iter().enumerate() {
            let user = i as u64 + 1;
            let mut account =
                Account::new(UserId(user), user.to_string(), format!("XH{user}"), secs(0));
            account.energy = energy;
            accounts.insert(account).unwrap();
        }
        let rounds = Arc::new(InMemoryRoundStore::new());
        rounds
            .insert(Round::new(ROUND, &EmissionSchedule::default(), secs(0)))
            .unwrap();
        let registry = ParticipantRegistry::new(
            Arc::new(InMemoryParticipantStore::new()),
            rounds.clone(),
            EnergyAccount::new(accounts.clone(), EnergyConfig::default()),
            ParticipantConfig::default(),
        );
        Fixture {
            registry,
            accounts,
            rounds,
        }
    }

    fn solo_settlement() -> Settlement {
        Settlement {
            round: ROUND,
            finder: UserId(1),
            capped_reward: Tokens::from_whole(1000),
            finder_reward: Tokens::from_whole(1000),
            pool_share_each: Tokens::ZERO,
            pool_size: 0,
            pool: vec![],
            commissions: vec![],
        }
    }

    fn counters(f: &Fixture) -> (u64, u64) {
        let round = f.rounds.get(ROUND).unwrap().unwrap();
        (round.counters.attempts, round.counters.participations)
    }

    #[test]
    fn test_rejoin_replaces_entry() {
        let f = fixture(&[2000]);
        let first = f.registry.join(ROUND, UserId(1), "1", MiningMode::Basic, secs(0)).unwrap();
        assert!(!first.rejoined);
        let second = f.registry.join(ROUND, UserId(1), "1", MiningMode::Basic, secs(3)).unwrap();
        assert!(second.rejoined);

        let online = f.registry.list_online(ROUND, secs(3)).unwrap();
        assert_eq!(online.len(), 1);
        assert_eq!(online[0].joined_at, secs(3));
        assert_eq!(counters(&f), (0, 2));
    }

    #[test]
    fn test_join_checks_mode_and_energy() {
        let f = fixture(&[2000, 50]);
        assert_eq!(
            f.registry.join(ROUND, UserId(1), "1", MiningMode::Nitro, secs(0)),
            Err(RegistryError::Account(AccountError::ModeLocked(MiningMode::Nitro)))
        );
        assert!(matches!(
            f.registry.join(ROUND, UserId(2), "2", MiningMode::Basic, secs(0)),
            Err(RegistryError::Account(AccountError::InsufficientEnergy { .. }))
        ));
        assert!(f.registry.list_online(ROUND, secs(0)).unwrap().is_empty());
    }

    #[test]
    fn test_heartbeat_debits_and_counts_multiplier() {
        let f = fixture(&[2000]);
        f.accounts
            .modify(UserId(1), &mut |a| {
                a.unlocked_modes.insert(MiningMode::Super);
            })
            .unwrap();
        f.registry.join(ROUND, UserId(1), "1", MiningMode::Super, secs(0)).unwrap();

        let outcome = f.registry.heartbeat(ROUND, UserId(1), secs(0)).unwrap();
        assert!(matches!(outcome, HeartbeatOutcome::Continue(ref a) if a.energy == 1600));
        assert_eq!(counters(&f), (4, 2));
    }

    #[traced_test]
    #[test]
    fn test_heartbeat_without_energy_evicts() {
        let f = fixture(&[150]);
        f.registry.join(ROUND, UserId(1), "1", MiningMode::Basic, secs(0)).unwrap();

        assert!(matches!(
            f.registry.heartbeat(ROUND, UserId(1), secs(0)).unwrap(),
            HeartbeatOutcome::Continue(_)
        ));
        let outcome = f.registry.heartbeat(ROUND, UserId(1), secs(0)).unwrap();
        assert_eq!(
            outcome,
            HeartbeatOutcome::Stop {
                reason: StopReason::Energy,
                account: outcome.account().clone(),
            }
        );
        assert_eq!(outcome.account().energy, 50);
        assert!(f.registry.entry(ROUND, UserId(1), secs(0)).unwrap().is_none());
        assert!(logs_contain("Evicted participant out of energy"));
    }

    #[test]
    fn test_heartbeat_requires_live_entry() {
        let f = fixture(&[2000]);
        assert_eq!(
            f.registry.heartbeat(ROUND, UserId(1), secs(0)),
            Err(RegistryError::NotJoined {
                round: ROUND,
                user: UserId(1)
            })
        );

        f.registry.join(ROUND, UserId(1), "1", MiningMode::Basic, secs(0)).unwrap();
        assert!(f.registry.heartbeat(ROUND, UserId(1), secs(30)).is_err());
        // No energy was charged for the late heartbeat.
        assert_eq!(f.accounts.get(UserId(1)).unwrap().unwrap().energy, 2000);
    }

    #[test]
    fn test_stale_entries_are_not_online() {
        let f = fixture(&[2000, 2000]);
        f.registry.join(ROUND, UserId(1), "1", MiningMode::Basic, secs(0)).unwrap();
        f.registry.join(ROUND, UserId(2), "2", MiningMode::Basic, secs(0)).unwrap();
        f.registry.heartbeat(ROUND, UserId(2), secs(20)).unwrap();

        let online = f.registry.list_online(ROUND, secs(35)).unwrap();
        assert_eq!(online.len(), 1);
        assert_eq!(online[0].user, UserId(2));
        assert!(f.registry.entry(ROUND, UserId(1), secs(35)).unwrap().is_none());
    }

    #[test]
    fn test_join_into_closed_round_is_withdrawn() {
        let f = fixture(&[2000, 2000]);
        f.registry.join(ROUND, UserId(1), "1", MiningMode::Basic, secs(0)).unwrap();
        f.rounds
            .claim(
                ROUND,
                UserId(1),
                RoundProof {
                    nonce: 0,
                    digest: Digest::ZERO,
                },
                vec![UserId(1)],
                secs(1),
            )
            .unwrap();
        f.rounds.attach_settlement(ROUND, solo_settlement()).unwrap();
        f.rounds.close(ROUND, UserId(1), secs(1)).unwrap();
        f.registry.clear_round(ROUND).unwrap();

        assert_eq!(
            f.registry.join(ROUND, UserId(2), "2", MiningMode::Basic, secs(2)),
            Err(RegistryError::RoundClosed(ROUND))
        );
        assert!(f.registry.list_online(ROUND, secs(2)).unwrap().is_empty());
        assert_eq!(counters(&f), (0, 1));
    }

    #[test]
    fn test_eviction_spares_a_fresh_rejoin() {
        let f = fixture(&[2000]);
        f.registry.join(ROUND, UserId(1), "1", MiningMode::Basic, secs(0)).unwrap();
        let stale = f.registry.entries.get(ROUND, UserId(1)).unwrap().unwrap();

        // The user rejoins between the read and the eviction.
        f.registry.join(ROUND, UserId(1), "1", MiningMode::Basic, secs(40)).unwrap();
        assert!(f
            .registry
            .entries
            .remove_if_unchanged(ROUND, UserId(1), stale.last_heartbeat)
            .unwrap()
            .is_none());
        assert!(f.registry.entry(ROUND, UserId(1), secs(40)).unwrap().is_some());
    }

    #[test]
    fn test_leave_and_clear() {
        let f = fixture(&[2000, 2000]);
        f.registry.join(ROUND, UserId(1), "1", MiningMode::Basic, secs(0)).unwrap();
        f.registry.join(ROUND, UserId(2), "2", MiningMode::Basic, secs(0)).unwrap();

        assert!(f.registry.leave(ROUND, UserId(1)).unwrap());
        assert!(!f.registry.leave(ROUND, UserId(1)).unwrap());
        assert_eq!(f.registry.clear_round(ROUND).unwrap(), 1);
        assert!(f.registry.list_online(ROUND, secs(0)).unwrap().is_empty());
    }
}
