//! In-memory participant store.

use dashmap::DashMap;
use hashrush_core::{ParticipantStore, StoreError};
use hashrush_types::{ParticipantEntry, RoundNumber, UserId};
use std::time::Duration;

/// Participant entries in a sharded map keyed by `(round, user)`.
#[derive(Debug, Default)]
pub struct InMemoryParticipantStore {
    entries: DashMap<(RoundNumber, UserId), ParticipantEntry>,
}

impl InMemoryParticipantStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total entries across all rounds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ParticipantStore for InMemoryParticipantStore {
    fn upsert(&self, entry: ParticipantEntry) -> Result<Option<ParticipantEntry>, StoreError> {
        Ok(self.entries.insert((entry.round, entry.user), entry))
    }

    fn get(
        &self,
        round: RoundNumber,
        user: UserId,
    ) -> Result<Option<ParticipantEntry>, StoreError> {
        Ok(self.entries.get(&(round, user)).map(|e| e.clone()))
    }

    fn touch(&self, round: RoundNumber, user: UserId, now: Duration) -> Result<bool, StoreError> {
        match self.entries.get_mut(&(round, user)) {
            Some(mut entry) => {
                entry.last_heartbeat = entry.last_heartbeat.max(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove(
        &self,
        round: RoundNumber,
        user: UserId,
    ) -> Result<Option<ParticipantEntry>, StoreError> {
        Ok(self.entries.remove(&(round, user)).map(|(_, entry)| entry))
    }

    fn remove_if_unchanged(
        &self,
        round: RoundNumber,
        user: UserId,
        last_heartbeat: Duration,
    ) -> Result<Option<ParticipantEntry>, StoreError> {
        Ok(self
            .entries
            .remove_if(&(round, user), |_, e| e.last_heartbeat == last_heartbeat)
            .map(|(_, entry)| entry))
    }

    fn entries(&self, round: RoundNumber) -> Result<Vec<ParticipantEntry>, StoreError> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.key().0 == round)
            .map(|e| e.value().clone())
            .collect();
        entries.sort_by_key(|e| e.user);
        Ok(entries)
    }

    fn remove_stale(
        &self,
        round: RoundNumber,
        now: Duration,
        timeout: Duration,
    ) -> Result<Vec<ParticipantEntry>, StoreError> {
        let mut removed = Vec::new();
        self.entries.retain(|key, entry| {
            if key.0 == round && !entry.is_live(now, timeout) {
                removed.push(entry.clone());
                false
            } else {
                true
            }
        });
        removed.sort_by_key(|e| e.user);
        Ok(removed)
    }

    fn clear_round(&self, round: RoundNumber) -> Result<usize, StoreError> {
        let mut removed = 0;
        self.entries.retain(|key, _| {
            let keep = key.0 != round;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}
