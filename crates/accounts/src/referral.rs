//! Referral codes and referral parameters.

use hashrush_types::Tokens;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Prefix of every referral code.
pub const REFERRAL_PREFIX: &str = "XH";

/// Number of identity characters embedded in a code.
const IDENTITY_CHARS: usize = 4;

/// Number of random characters appended to a code.
const RANDOM_CHARS: usize = 4;

/// Registration-time referral parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralConfig {
    /// One-off credit to the referrer when a referee registers.
    pub signup_bonus: Tokens,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            signup_bonus: Tokens::from_whole(500),
        }
    }
}

impl ReferralConfig {
    /// Set the signup bonus.
    pub fn with_signup_bonus(mut self, bonus: Tokens) -> Self {
        self.signup_bonus = bonus;
        self
    }
}

/// Build a referral code: prefix, last four identity characters, then four
/// random uppercase alphanumerics.
pub fn generate_referral_code<R: Rng + ?Sized>(identity: &str, rng: &mut R) -> String {
    let chars: Vec<char> = identity.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(IDENTITY_CHARS)..]
        .iter()
        .collect();
    let random: String = (0..RANDOM_CHARS)
        .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_uppercase())
        .collect();
    format!("{REFERRAL_PREFIX}{tail}{random}")
}
