//! The mining request surface.

use crate::responses::{
    AccountView, ClosedRoundView, CommissionView, HeartbeatReceipt, HistoryEntry, HistoryPage,
    JoinReceipt, MiningStatus, ModeView, Pagination, ParticipationView, ReferralView, RoundView,
    SubmitReceipt,
};
use crate::{ErrorKind, MiningConfig, MiningError, Stores};
use hashrush_accounts::{AccountBook, EnergyAccount};
use hashrush_core::ClaimOutcome;
use hashrush_participants::{HeartbeatOutcome, ParticipantRegistry};
use hashrush_proof::ProofVerifier;
use hashrush_rewards::{RewardDistributor, RewardError};
use hashrush_rounds::RoundLifecycleManager;
use hashrush_supply::{SupplyInfo, SupplyLedger};
use hashrush_types::{MiningMode, Round, RoundNumber, RoundProof, RoundStatus, Settlement, UserId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Most commissions listed in a referral view.
const RECENT_COMMISSIONS: usize = 100;

/// Composes the mining components behind one request API.
///
/// Cheap to clone; clones share the same stores.
#[derive(Clone)]
pub struct MiningNode {
    config: MiningConfig,
    rounds: RoundLifecycleManager,
    registry: ParticipantRegistry,
    verifier: ProofVerifier,
    distributor: RewardDistributor,
    supply: SupplyLedger,
    energy: EnergyAccount,
    accounts: Arc<AccountBook>,
}

impl MiningNode {
    /// Build a node over the given backends.
    pub fn new(config: MiningConfig, stores: Stores) -> Self {
        let accounts = Arc::new(AccountBook::new(
            stores.accounts.clone(),
            stores.referrals.clone(),
            config.energy.clone(),
            config.referral.clone(),
        ));
        Self::with_account_book(config, stores, accounts)
    }

    /// Wire the components around an account book.
    fn with_account_book(config: MiningConfig, stores: Stores, accounts: Arc<AccountBook>) -> Self {
        let energy = EnergyAccount::new(stores.accounts.clone(), config.energy.clone());
        let supply = SupplyLedger::new(stores.supply.clone());
        let rounds = RoundLifecycleManager::new(stores.rounds.clone(), config.schedule.clone());
        let registry = ParticipantRegistry::new(
            stores.participants.clone(),
            stores.rounds.clone(),
            energy.clone(),
            config.participants.clone(),
        );
        let distributor =
            RewardDistributor::new(config.rewards.clone(), supply.clone(), accounts.clone());

        Self {
            config,
            rounds,
            registry,
            verifier: ProofVerifier::new(),
            distributor,
            supply,
            energy,
            accounts,
        }
    }

    /// Build a node over fresh in-memory backends.
    pub fn in_memory(config: MiningConfig) -> Self {
        let stores = Stores::in_memory(config.schedule.total_supply);
        Self::new(config, stores)
    }

    /// Node configuration.
    pub fn config(&self) -> &MiningConfig {
        &self.config
    }

    /// The proof verifier rounds are checked with.
    pub fn verifier(&self) -> &ProofVerifier {
        &self.verifier
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Mining loop
    // ═══════════════════════════════════════════════════════════════════════

    /// Snapshot of the active round, creating it if none exists.
    pub fn current_round(&self, now: Duration) -> Result<RoundView, MiningError> {
        observe("current_round", None, self.current_round_inner(now))
    }

    fn current_round_inner(&self, now: Duration) -> Result<RoundView, MiningError> {
        let round = self.active_round(now)?;
        let online = self.registry.list_online(round.number, now)?;
        Ok(RoundView::new(&round, online.len()))
    }

    /// Join the active round in `mode`.
    pub fn join(&self, user: UserId, mode: &str, now: Duration) -> Result<JoinReceipt, MiningError> {
        observe("join", Some(user), self.join_inner(user, mode, now))
    }

    fn join_inner(&self, user: UserId, mode: &str, now: Duration) -> Result<JoinReceipt, MiningError> {
        let mode: MiningMode = mode.parse()?;
        let account = self.accounts.get(user)?;

        let round = self.active_round(now)?;
        if round.status != RoundStatus::Open {
            return Err(MiningError::AlreadyClaimed(round.number));
        }

        let joined = self
            .registry
            .join(round.number, user, &account.identity, mode, now)?;
        let round = self.rounds.get(round.number)?;
        let online = self.registry.list_online(round.number, now)?;

        Ok(JoinReceipt {
            round: RoundView::new(&round, online.len()),
            mode: ModeView::new(mode, &joined.account),
            energy: joined.account.energy,
            max_energy: joined.account.max_energy,
            rejoined: joined.rejoined,
        })
    }

    /// Pay one tick and refresh liveness in the active round.
    pub fn heartbeat(&self, user: UserId, now: Duration) -> Result<HeartbeatReceipt, MiningError> {
        observe("heartbeat", Some(user), self.heartbeat_inner(user, now))
    }

    fn heartbeat_inner(&self, user: UserId, now: Duration) -> Result<HeartbeatReceipt, MiningError> {
        let round = self
            .rounds
            .active_round()?
            .ok_or(MiningError::NotJoined(user))?;

        let outcome = self.registry.heartbeat(round.number, user, now)?;
        let account = outcome.account();
        let reason = match &outcome {
            HeartbeatOutcome::Continue(_) => None,
            HeartbeatOutcome::Stop { reason, .. } => Some(reason.as_str()),
        };
        Ok(HeartbeatReceipt {
            keep_going: reason.is_none(),
            reason,
            energy: account.energy,
            max_energy: account.max_energy,
            tokens: account.tokens,
        })
    }

    /// Submit a proof for the active round.
    ///
    /// `value` is the digest the client computed; the server recomputes it
    /// from the round number, `nonce` and the caller's identity and accepts
    /// the proof only if both agree and meet the round difficulty. The first
    /// valid proof claims and settles the round.
    ///
    /// A winner retrying after a failure resumes its own settlement and
    /// receives the same receipt; nothing is paid twice.
    pub fn submit(
        &self,
        user: UserId,
        value: &str,
        nonce: u64,
        now: Duration,
    ) -> Result<SubmitReceipt, MiningError> {
        observe("submit", Some(user), self.submit_inner(user, value, nonce, now))
    }

    fn submit_inner(
        &self,
        user: UserId,
        value: &str,
        nonce: u64,
        now: Duration,
    ) -> Result<SubmitReceipt, MiningError> {
        let account = self.accounts.get(user)?;
        let round = self
            .rounds
            .active_round()?
            .ok_or(MiningError::NoActiveRound)?;

        if round.status == RoundStatus::Locked {
            if round.winner == Some(user) {
                let settlement = self.settle(round, user, now)?;
                return Ok(SubmitReceipt::from(&settlement));
            }
            return Err(MiningError::AlreadyClaimed(round.number));
        }

        let (valid, digest) =
            self.verifier
                .verify(round.number, nonce, &account.identity, round.difficulty);
        if !valid || !value.trim().eq_ignore_ascii_case(&digest.to_hex()) {
            debug!(
                round = round.number.0,
                user = user.0,
                nonce,
                valid,
                "Rejected proof"
            );
            return Err(MiningError::InvalidProof(round.number));
        }

        let proof = RoundProof { nonce, digest };
        match self.claim(round.number, user, proof, now)? {
            ClaimOutcome::Claimed(round) => {
                let settlement = self.settle(round, user, now)?;
                Ok(SubmitReceipt::from(&settlement))
            }
            ClaimOutcome::AlreadyClaimed(round) if round.winner == Some(user) => {
                let settlement = self.settle(round, user, now)?;
                Ok(SubmitReceipt::from(&settlement))
            }
            ClaimOutcome::AlreadyClaimed(round) => Err(MiningError::AlreadyClaimed(round.number)),
        }
    }

    /// Leave the active round. Returns whether an entry was removed.
    pub fn leave(&self, user: UserId) -> Result<bool, MiningError> {
        observe("leave", Some(user), self.leave_inner(user))
    }

    fn leave_inner(&self, user: UserId) -> Result<bool, MiningError> {
        match self.rounds.active_round()? {
            Some(round) => Ok(self.registry.leave(round.number, user)?),
            None => Ok(false),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Settlement
    // ═══════════════════════════════════════════════════════════════════════

    /// Lock the round for `user`, recording who is online right now as the
    /// pool its settlement will split.
    fn claim(
        &self,
        seq: RoundNumber,
        user: UserId,
        proof: RoundProof,
        now: Duration,
    ) -> Result<ClaimOutcome, MiningError> {
        let online = self
            .registry
            .list_online(seq, now)?
            .into_iter()
            .map(|e| e.user)
            .collect();
        Ok(self.rounds.claim_round(seq, user, proof, online, now)?)
    }

    /// The active round, finishing an overdue settlement first.
    fn active_round(&self, now: Duration) -> Result<Round, MiningError> {
        loop {
            let round = self.rounds.get_or_create_active_round(now)?;
            if round.status != RoundStatus::Locked || !self.settlement_overdue(&round, now) {
                return Ok(round);
            }
            let Some(winner) = round.winner else {
                return Ok(round);
            };

            warn!(
                round = round.number.0,
                winner = winner.0,
                attached = round.settlement.is_some(),
                "Finishing interrupted settlement"
            );
            match self.settle(round, winner, now) {
                Ok(_) | Err(MiningError::SupplyExhausted) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn settlement_overdue(&self, round: &Round, now: Duration) -> bool {
        round
            .claimed_at
            .is_none_or(|claimed| now.saturating_sub(claimed) >= self.config.settlement_grace)
    }

    /// Drive a claimed round to Closed.
    ///
    /// Each step is keyed by the round number, so this can be re-run from
    /// any point after the claim: a settlement already attached is replayed
    /// rather than recomputed, the mint and the credit batch are applied at
    /// most once, and closing twice is a no-op. The pool is the one recorded
    /// at claim time, not whoever is still online when this runs.
    fn settle(&self, round: Round, finder: UserId, now: Duration) -> Result<Settlement, MiningError> {
        let seq = round.number;

        let settlement = match round.settlement.clone() {
            Some(existing) => {
                debug!(round = seq.0, "Replaying attached settlement");
                existing
            }
            None => {
                match self.distributor.plan(&round, finder, &round.online_at_claim) {
                    Ok(plan) => self.rounds.attach_settlement(seq, plan)?,
                    Err(RewardError::SupplyExhausted(_)) => {
                        self.rounds.release_claim(seq, finder)?;
                        return Err(MiningError::SupplyExhausted);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        if round.status != RoundStatus::Closed {
            self.distributor.apply(&settlement).map_err(|e| match e {
                // The plan was clamped to headroom; a refusal now means the
                // counter moved underneath an attached settlement.
                RewardError::SupplyExhausted(_) => MiningError::Internal(format!(
                    "settlement of {seq} no longer fits under the supply cap"
                )),
                other => other.into(),
            })?;
            self.rounds.close_round(seq, finder, now)?;
            self.registry.clear_round(seq)?;
        }

        Ok(settlement)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Read models
    // ═══════════════════════════════════════════════════════════════════════

    /// The mode catalog as it applies to `user`.
    pub fn modes(&self, user: UserId, now: Duration) -> Result<Vec<ModeView>, MiningError> {
        observe("modes", Some(user), self.modes_inner(user, now))
    }

    fn modes_inner(&self, user: UserId, now: Duration) -> Result<Vec<ModeView>, MiningError> {
        let account = self.energy.refresh(user, now)?;
        Ok(MiningMode::ALL
            .iter()
            .map(|&mode| ModeView::new(mode, &account))
            .collect())
    }

    /// The caller's balances and current participation.
    pub fn status(&self, user: UserId, now: Duration) -> Result<MiningStatus, MiningError> {
        observe("status", Some(user), self.status_inner(user, now))
    }

    fn status_inner(&self, user: UserId, now: Duration) -> Result<MiningStatus, MiningError> {
        let account = self.energy.refresh(user, now)?;
        let mining = match self.rounds.active_round()? {
            Some(round) => self
                .registry
                .entry(round.number, user, now)?
                .map(|entry| ParticipationView::from(&entry)),
            None => None,
        };

        Ok(MiningStatus {
            energy: account.energy,
            max_energy: account.max_energy,
            tokens: account.tokens,
            total_mined: account.total_mined,
            mining_sessions: account.mining_sessions,
            mining,
        })
    }

    /// The most recently closed rounds, newest first.
    pub fn recent_rounds(&self) -> Result<Vec<ClosedRoundView>, MiningError> {
        let rounds = self
            .rounds
            .recent_closed(self.config.recent_rounds)
            .map_err(MiningError::from);
        observe(
            "recent_rounds",
            None,
            rounds.map(|rounds| rounds.iter().map(ClosedRoundView::from).collect()),
        )
    }

    /// One page of the settlements `user` was paid in. Pages start at 1.
    pub fn history(
        &self,
        user: UserId,
        page: usize,
        limit: usize,
    ) -> Result<HistoryPage, MiningError> {
        observe("history", Some(user), self.history_inner(user, page, limit))
    }

    fn history_inner(
        &self,
        user: UserId,
        page: usize,
        limit: usize,
    ) -> Result<HistoryPage, MiningError> {
        let page = page.max(1);
        let limit = limit.clamp(1, self.config.max_page_size.max(1));

        let all: Vec<HistoryEntry> = self
            .rounds
            .closed_paid_to(user)?
            .iter()
            .filter_map(|round| HistoryEntry::for_user(round, user))
            .collect();
        let total = all.len();
        let entries = all
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();

        Ok(HistoryPage {
            entries,
            pagination: Pagination {
                page,
                limit,
                total,
                pages: total.div_ceil(limit),
            },
        })
    }

    /// Supply counter values.
    pub fn supply_info(&self) -> Result<SupplyInfo, MiningError> {
        observe("supply_info", None, self.supply.info().map_err(Into::into))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accounts
    // ═══════════════════════════════════════════════════════════════════════

    /// Create the caller's account on first authentication, or return it.
    pub fn register(
        &self,
        user: UserId,
        identity: &str,
        referral_code: Option<&str>,
        now: Duration,
    ) -> Result<AccountView, MiningError> {
        let registration = self
            .accounts
            .register(user, identity, referral_code, now)
            .map_err(MiningError::from);
        observe(
            "register",
            Some(user),
            registration.map(|r| AccountView::new(r.account, r.created)),
        )
    }

    /// The caller's referral code, counters and recent commissions.
    pub fn referral_info(&self, user: UserId) -> Result<ReferralView, MiningError> {
        let info = self.accounts.referral_info(user).map_err(MiningError::from);
        observe(
            "referral_info",
            Some(user),
            info.map(|info| ReferralView {
                referral_code: info.referral_code,
                referral_count: info.referral_count,
                referral_earnings: info.referral_earnings,
                recent_commissions: info
                    .commissions
                    .iter()
                    .take(RECENT_COMMISSIONS)
                    .map(CommissionView::from)
                    .collect(),
            }),
        )
    }

    /// Apply an attested mode purchase.
    pub fn unlock_mode(&self, user: UserId, mode: &str) -> Result<AccountView, MiningError> {
        observe("unlock_mode", Some(user), self.unlock_mode_inner(user, mode))
    }

    fn unlock_mode_inner(&self, user: UserId, mode: &str) -> Result<AccountView, MiningError> {
        let mode: MiningMode = mode.parse()?;
        let account = self.accounts.unlock_mode(user, mode)?;
        Ok(AccountView::new(account, false))
    }

    /// Apply an attested energy boost purchase.
    pub fn boost_energy(&self, user: UserId, now: Duration) -> Result<AccountView, MiningError> {
        let account = self
            .accounts
            .boost_energy(user, now)
            .map_err(MiningError::from);
        observe(
            "boost_energy",
            Some(user),
            account.map(|a| AccountView::new(a, false)),
        )
    }
}

impl std::fmt::Debug for MiningNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiningNode")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Log a failed request: internal failures at error level with full
/// context, expected rejections at debug level.
fn observe<T>(
    op: &'static str,
    user: Option<UserId>,
    result: Result<T, MiningError>,
) -> Result<T, MiningError> {
    if let Err(e) = &result {
        let user = user.map(|u| u.0);
        if e.kind() == ErrorKind::Internal {
            error!(op, ?user, error = %e, "Request failed");
        } else {
            debug!(op, ?user, reason = e.reason(), "Request rejected");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashrush_participants::RegistryError;
    use hashrush_types::{EmissionSchedule, Tokens};
    use tracing_test::traced_test;

    fn proof_for(node: &MiningNode, seq: RoundNumber, identity: &str, difficulty: u32) -> RoundProof {
        let (nonce, digest) = node
            .verifier()
            .search(seq, identity, difficulty, 0, u64::MAX)
            .unwrap();
        RoundProof { nonce, digest }
    }

    #[traced_test]
    #[test]
    fn test_overdue_claim_is_finished_by_next_reader() {
        let stores = Stores::in_memory(EmissionSchedule::default().total_supply);
        let node = MiningNode::new(MiningConfig::default(), stores.clone());
        let t = Duration::from_secs(100);
        node.register(UserId(1), "555001", None, t).unwrap();

        let round = node.current_round(t).unwrap();
        let seq = RoundNumber(round.block_number);
        let proof = proof_for(&node, seq, "555001", round.difficulty);
        node.claim(seq, UserId(1), proof, t).unwrap();

        let later = t + node.config().settlement_grace;
        let next = node.current_round(later).unwrap();
        assert_eq!(next.block_number, 2);
        assert!(logs_contain("Finishing interrupted settlement"));
        assert_eq!(
            node.status(UserId(1), later).unwrap().tokens,
            Tokens::from_whole(1000)
        );
    }

    #[test]
    fn test_exhausted_overdue_claim_is_released() {
        let stores = Stores::in_memory(Tokens::ZERO);
        let node = MiningNode::new(MiningConfig::default(), stores.clone());
        let t = Duration::from_secs(100);
        node.register(UserId(1), "555001", None, t).unwrap();

        let round = node.current_round(t).unwrap();
        let seq = RoundNumber(round.block_number);
        let proof = proof_for(&node, seq, "555001", round.difficulty);
        node.claim(seq, UserId(1), proof, t).unwrap();

        let later = t + Duration::from_secs(60);
        let view = node.current_round(later).unwrap();
        assert_eq!(view.block_number, 1);
        assert_eq!(view.status, RoundStatus::Open);
    }

    #[test]
    fn test_late_settlement_pays_pool_online_at_claim() {
        let stores = Stores::in_memory(EmissionSchedule::default().total_supply);
        let node = MiningNode::new(MiningConfig::default(), stores);
        let t = Duration::from_secs(100);
        node.register(UserId(1), "555001", None, t).unwrap();
        node.register(UserId(2), "555002", None, t).unwrap();
        node.join(UserId(2), "basic", t).unwrap();

        let claimed_at = t + Duration::from_secs(25);
        node.join(UserId(1), "basic", claimed_at).unwrap();
        let round = node.current_round(claimed_at).unwrap();
        let seq = RoundNumber(round.block_number);
        let proof = proof_for(&node, seq, "555001", round.difficulty);
        node.claim(seq, UserId(1), proof, claimed_at).unwrap();

        // User 2 has gone stale by the time the settlement is finished.
        let later = claimed_at + Duration::from_secs(6);
        assert_eq!(node.current_round(later).unwrap().block_number, 2);

        let closed = node.recent_rounds().unwrap();
        assert_eq!(closed[0].pool_miners_count, 1);
        assert_eq!(
            node.status(UserId(1), later).unwrap().tokens,
            Tokens::from_whole(500)
        );
        assert_eq!(
            node.status(UserId(2), later).unwrap().tokens,
            Tokens::from_whole(500)
        );
    }

    #[test]
    fn test_join_racing_closure_leaves_nothing_behind() {
        let stores = Stores::in_memory(EmissionSchedule::default().total_supply);
        let node = MiningNode::new(MiningConfig::default(), stores.clone());
        let t = Duration::from_secs(100);
        node.register(UserId(1), "555001", None, t).unwrap();
        node.register(UserId(2), "555002", None, t).unwrap();

        let round = node.current_round(t).unwrap();
        let seq = RoundNumber(round.block_number);
        let proof = proof_for(&node, seq, "555001", round.difficulty);
        node.submit(UserId(1), &proof.digest.to_hex(), proof.nonce, t)
            .unwrap();
        let closed = stores.rounds.get(seq).unwrap().unwrap();

        // A join that passed its Open check before the round closed.
        let result = node
            .registry
            .join(seq, UserId(2), "555002", MiningMode::Basic, t);
        assert!(matches!(result, Err(RegistryError::RoundClosed(n)) if n == seq));
        assert!(node.registry.entry(seq, UserId(2), t).unwrap().is_none());
        assert_eq!(stores.rounds.get(seq).unwrap().unwrap(), closed);
    }
}
