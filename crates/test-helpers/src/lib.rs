//! Test fixtures for hashrush.
//!
//! Provides a node over in-memory stores with deterministic users, a clock
//! helper, and the client half of the proof protocol so tests can submit
//! valid proofs without reimplementing the hashing rule.

use hashrush_core::ClaimOutcome;
use hashrush_node::{MiningConfig, MiningNode, Stores};
use hashrush_proof::ProofVerifier;
use hashrush_types::{Digest, Round, RoundNumber, RoundProof, Settlement, Tokens, UserId};
use std::time::Duration;

/// Nonces tried before a search gives up.
const MAX_SEARCH: u64 = 1 << 28;

/// A point in time `secs` seconds after the epoch.
pub fn at(secs: u64) -> Duration {
    Duration::from_secs(secs)
}

/// Deterministic external identity for a test user.
pub fn identity(user: UserId) -> String {
    format!("{}", 1_000_000 + user.0)
}

/// A node plus direct handles on its stores.
pub struct TestNetwork {
    pub node: MiningNode,
    pub stores: Stores,
}

impl TestNetwork {
    /// Fresh network with the supply cap taken from the schedule.
    pub fn new(config: MiningConfig) -> Self {
        let cap = config.schedule.total_supply;
        Self::with_supply(config, cap, Tokens::ZERO)
    }

    /// Fresh network whose supply counter starts at `minted` of `cap`.
    pub fn with_supply(config: MiningConfig, cap: Tokens, minted: Tokens) -> Self {
        let stores = Stores::in_memory_with_minted(cap, minted);
        let node = MiningNode::new(config, stores.clone());
        Self { node, stores }
    }

    /// Register users `1..=count` and return their ids.
    pub fn register_users(&self, count: u64, now: Duration) -> Vec<UserId> {
        (1..=count)
            .map(UserId)
            .inspect(|&user| {
                self.node
                    .register(user, &identity(user), None, now)
                    .expect("registration should succeed");
            })
            .collect()
    }

    /// Register one user with a referral code.
    pub fn register_referred(&self, user: UserId, code: &str, now: Duration) {
        self.node
            .register(user, &identity(user), Some(code), now)
            .expect("registration should succeed");
    }

    /// The active round as stored, without creating one.
    pub fn active_round(&self) -> Option<Round> {
        self.stores.rounds.active().expect("round store available")
    }

    /// Find a valid proof for `user` in the active round.
    ///
    /// Returns the lowercase hex digest and nonce, ready for submission.
    pub fn solve(&self, user: UserId, now: Duration) -> (String, u64) {
        let round = self
            .node
            .current_round(now)
            .expect("active round available");
        solve(
            RoundNumber(round.block_number),
            &identity(user),
            round.difficulty,
        )
    }

    /// Close rounds directly in the store until `target` is the next round
    /// to be created.
    ///
    /// Skipped rounds carry an empty settlement and mint nothing, so the
    /// supply counter is unaffected.
    pub fn fast_forward(&self, target: RoundNumber, now: Duration) {
        let schedule = self.node.config().schedule.clone();
        let rounds = &self.stores.rounds;
        let filler = UserId(u64::MAX);

        loop {
            let next = rounds
                .highest_number()
                .expect("round store available")
                .map_or(RoundNumber::FIRST, RoundNumber::next);
            if next >= target {
                return;
            }
            rounds
                .insert(Round::new(next, &schedule, now))
                .expect("sequential insert");
            let proof = RoundProof {
                nonce: 0,
                digest: Digest::sha256(b""),
            };
            match rounds
                .claim(next, filler, proof, Vec::new(), now)
                .expect("claim accepted")
            {
                ClaimOutcome::Claimed(_) => {}
                ClaimOutcome::AlreadyClaimed(_) => panic!("fresh round already claimed"),
            }
            rounds
                .attach_settlement(
                    next,
                    Settlement {
                        round: next,
                        finder: filler,
                        capped_reward: Tokens::ZERO,
                        finder_reward: Tokens::ZERO,
                        pool_share_each: Tokens::ZERO,
                        pool_size: 0,
                        pool: vec![],
                        commissions: vec![],
                    },
                )
                .expect("settlement attached");
            rounds.close(next, filler, now).expect("round closed");
        }
    }
}

/// Brute-force a nonce for `identity` in round `seq`.
pub fn solve(seq: RoundNumber, identity: &str, difficulty: u32) -> (String, u64) {
    let (nonce, digest) = ProofVerifier::new()
        .search(seq, identity, difficulty, 0, MAX_SEARCH)
        .expect("a nonce within the search bound");
    (digest.to_hex(), nonce)
}

/// A nonce whose digest does NOT meet `difficulty`, with its digest.
pub fn miss(seq: RoundNumber, identity: &str, difficulty: u32) -> (String, u64) {
    let verifier = ProofVerifier::new();
    (0..MAX_SEARCH)
        .map(|nonce| (nonce, verifier.compute(seq, nonce, identity)))
        .find(|(_, digest)| !verifier.is_valid(digest, difficulty))
        .map(|(nonce, digest)| (digest.to_hex(), nonce))
        .expect("a failing nonce")
}
