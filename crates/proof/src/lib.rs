//! Proof computation and verification.
//!
//! A proof for round `seq` is a nonce such that
//!
//! ```text
//! sha256("{seq}:{nonce}:{identity}")
//! ```
//!
//! rendered as 64 lowercase hex digits starts with at least `difficulty`
//! `'0'` digits. The identity is the submitter's external identity, so a
//! nonce found by one user is worthless to another.
//!
//! Clients search nonces with the same encoding. The server recomputes the
//! digest from scratch and only compares it with the client's value.

use hashrush_types::{Digest, RoundNumber};
use tracing::trace;

/// Stateless verifier for round proofs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProofVerifier;

impl ProofVerifier {
    /// Create a verifier.
    pub fn new() -> Self {
        Self
    }

    /// Compute the digest of a candidate proof.
    pub fn compute(&self, seq: RoundNumber, nonce: u64, identity: &str) -> Digest {
        let preimage = format!("{}:{}:{}", seq.0, nonce, identity);
        Digest::sha256(preimage.as_bytes())
    }

    /// Whether `digest` meets `difficulty` leading zero hex digits.
    pub fn is_valid(&self, digest: &Digest, difficulty: u32) -> bool {
        digest.leading_zero_nibbles() >= difficulty
    }

    /// Recompute the digest and check it against the round difficulty.
    ///
    /// Returns `(valid, digest)`. The digest is returned even when invalid
    /// so callers can report it.
    pub fn verify(
        &self,
        seq: RoundNumber,
        nonce: u64,
        identity: &str,
        difficulty: u32,
    ) -> (bool, Digest) {
        let digest = self.compute(seq, nonce, identity);
        let valid = self.is_valid(&digest, difficulty);
        trace!(round = seq.0, nonce, difficulty, valid, "Verified proof");
        (valid, digest)
    }

    /// Search nonces upward from `start` for one meeting `difficulty`.
    ///
    /// Gives up after `max_attempts` candidates. Used by tools and tests that
    /// play the client side of the protocol.
    pub fn search(
        &self,
        seq: RoundNumber,
        identity: &str,
        difficulty: u32,
        start: u64,
        max_attempts: u64,
    ) -> Option<(u64, Digest)> {
        (0..max_attempts)
            .map(|i| start.wrapping_add(i))
            .map(|nonce| (nonce, self.compute(seq, nonce, identity)))
            .find(|(_, digest)| self.is_valid(digest, difficulty))
    }
}
