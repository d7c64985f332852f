//! The single-active-round state machine.

use crate::RoundError;
use hashrush_core::{ClaimOutcome, RoundStore};
use hashrush_types::{EmissionSchedule, Round, RoundNumber, RoundProof, Settlement, UserId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Creates, claims and closes rounds.
#[derive(Clone)]
pub struct RoundLifecycleManager {
    store: Arc<dyn RoundStore>,
    schedule: EmissionSchedule,
}

impl RoundLifecycleManager {
    /// Create over a round store.
    pub fn new(store: Arc<dyn RoundStore>, schedule: EmissionSchedule) -> Self {
        Self { store, schedule }
    }

    /// Emission schedule new rounds are derived from.
    pub fn schedule(&self) -> &EmissionSchedule {
        &self.schedule
    }

    /// The Open or Locked round, without creating one.
    pub fn active_round(&self) -> Result<Option<Round>, RoundError> {
        Ok(self.store.active()?)
    }

    /// Fetch any round.
    pub fn get(&self, seq: RoundNumber) -> Result<Round, RoundError> {
        self.store.get(seq)?.ok_or(RoundError::NotFound(seq))
    }

    /// Return the active round, creating the next one if none exists.
    ///
    /// Concurrent callers race to insert the same sequence number; losing
    /// that race is expected and the loser simply re-reads. Nothing is
    /// written on a lost race, so the loop can retry indefinitely.
    pub fn get_or_create_active_round(&self, now: Duration) -> Result<Round, RoundError> {
        loop {
            if let Some(round) = self.store.active()? {
                return Ok(round);
            }

            let next = self
                .store
                .highest_number()?
                .map_or(RoundNumber::FIRST, RoundNumber::next);
            let round = Round::new(next, &self.schedule, now);

            match self.store.insert(round.clone()) {
                Ok(()) => {
                    info!(
                        round = next.0,
                        difficulty = round.difficulty,
                        era = round.era,
                        reward = %round.base_reward,
                        "Created round"
                    );
                    return Ok(round);
                }
                Err(e) if e.is_conflict() => {
                    debug!(round = next.0, "Lost round creation race, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Attempt the Open → Locked transition for `claimant`.
    ///
    /// Exactly one concurrent claimant observes `Claimed`. `online` is the
    /// pool snapshot the winner's settlement will split.
    pub fn claim_round(
        &self,
        seq: RoundNumber,
        claimant: UserId,
        proof: RoundProof,
        online: Vec<UserId>,
        now: Duration,
    ) -> Result<ClaimOutcome, RoundError> {
        let nonce = proof.nonce;
        let pool = online.len();
        let outcome = self.store.claim(seq, claimant, proof, online, now).map_err(|e| {
            if matches!(e, hashrush_core::StoreError::NotFound(_)) {
                RoundError::NotFound(seq)
            } else {
                RoundError::Store(e)
            }
        })?;

        match &outcome {
            ClaimOutcome::Claimed(_) => {
                info!(round = seq.0, winner = claimant.0, nonce, online = pool, "Round claimed");
            }
            ClaimOutcome::AlreadyClaimed(round) => {
                debug!(
                    round = seq.0,
                    claimant = claimant.0,
                    holder = ?round.winner.map(|w| w.0),
                    "Claim lost"
                );
            }
        }
        Ok(outcome)
    }

    /// Roll an unsettled claim back to Open.
    pub fn release_claim(&self, seq: RoundNumber, winner: UserId) -> Result<bool, RoundError> {
        let released = self.store.release(seq, winner)?;
        if released {
            warn!(round = seq.0, winner = winner.0, "Released claim");
        }
        Ok(released)
    }

    /// Attach the settlement; the first attached settlement is final.
    pub fn attach_settlement(
        &self,
        seq: RoundNumber,
        settlement: Settlement,
    ) -> Result<Settlement, RoundError> {
        Ok(self.store.attach_settlement(seq, settlement)?)
    }

    /// Locked → Closed. Retrying with the same winner returns the closed
    /// round unchanged.
    pub fn close_round(
        &self,
        seq: RoundNumber,
        winner: UserId,
        now: Duration,
    ) -> Result<Round, RoundError> {
        let round = self.store.close(seq, winner, now)?;
        if round.closed_at == Some(now) {
            info!(round = seq.0, winner = winner.0, "Round closed");
        }
        Ok(round)
    }

    /// Most recently closed rounds.
    pub fn recent_closed(&self, limit: usize) -> Result<Vec<Round>, RoundError> {
        Ok(self.store.recent_closed(limit)?)
    }

    /// Closed rounds that paid `user`, newest first.
    pub fn closed_paid_to(&self, user: UserId) -> Result<Vec<Round>, RoundError> {
        Ok(self.store.closed_paid_to(user)?)
    }
}

impl std::fmt::Debug for RoundLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundLifecycleManager")
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}
