//! Fixed-point token amounts.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// A token amount stored as an integer count of base units.
///
/// One token is `10^8` base units. Display and JSON use the decimal form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tokens(u64);

impl Tokens {
    /// Decimal places carried by the base unit.
    pub const DECIMALS: u32 = 8;

    /// Base units per whole token.
    pub const UNITS_PER_TOKEN: u64 = 100_000_000;

    /// Base units per hundredth of a token.
    pub const UNITS_PER_CENT: u64 = Self::UNITS_PER_TOKEN / 100;

    /// Zero tokens.
    pub const ZERO: Self = Self(0);

    /// Create from a raw count of base units.
    pub const fn from_units(units: u64) -> Self {
        Self(units)
    }

    /// Create from a whole number of tokens.
    pub const fn from_whole(tokens: u64) -> Self {
        Self(tokens * Self::UNITS_PER_TOKEN)
    }

    /// Create from hundredths of a token.
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents * Self::UNITS_PER_CENT)
    }

    /// Create from a float, rounding to the nearest base unit.
    ///
    /// Negative and non-finite inputs become zero.
    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() || value <= 0.0 {
            return Self::ZERO;
        }
        Self((value * Self::UNITS_PER_TOKEN as f64).round() as u64)
    }

    /// Raw count of base units.
    pub const fn units(self) -> u64 {
        self.0
    }

    /// Approximate float value, for display and JSON.
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / Self::UNITS_PER_TOKEN as f64
    }

    /// Check for zero.
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Subtract, clamping at zero.
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Add, returning None on overflow.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Round half-up to a multiple of `quantum` base units.
    pub fn round_to(self, quantum: u64) -> Self {
        if quantum <= 1 {
            return self;
        }
        let q = u128::from(quantum);
        let rounded = (u128::from(self.0) + q / 2) / q * q;
        Self(rounded.min(u128::from(u64::MAX)) as u64)
    }

    /// Round down to a multiple of `quantum` base units.
    pub fn floor_to(self, quantum: u64) -> Self {
        if quantum <= 1 {
            return self;
        }
        Self(self.0 / quantum * quantum)
    }

    /// Multiply by a ratio in basis points, rounding half-up to `quantum`.
    pub fn scale_bps(self, bps: u32, quantum: u64) -> Self {
        let quantum = quantum.max(1);
        let num = u128::from(self.0) * u128::from(bps);
        let den = 10_000u128 * u128::from(quantum);
        let steps = (num + den / 2) / den;
        Self((steps * u128::from(quantum)).min(u128::from(u64::MAX)) as u64)
    }

    /// Split evenly across `parts`, rounding each part down to `quantum`.
    pub fn split_floor(self, parts: u64, quantum: u64) -> Self {
        if parts == 0 {
            return Self::ZERO;
        }
        Self(self.0 / parts).floor_to(quantum)
    }

    /// Multiply by a small integer count.
    pub fn times(self, count: u64) -> Self {
        Self(self.0.saturating_mul(count))
    }
}

impl Add for Tokens {
    type Output = Tokens;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Tokens {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Tokens {
    type Output = Tokens;

    fn sub(self, rhs: Self) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

impl Sum for Tokens {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Tokens::ZERO, |acc, t| acc + t)
    }
}

impl fmt::Display for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::UNITS_PER_TOKEN;
        let frac = self.0 % Self::UNITS_PER_TOKEN;
        if frac % Self::UNITS_PER_CENT == 0 {
            write!(f, "{}.{:02}", whole, frac / Self::UNITS_PER_CENT)
        } else {
            let digits = format!("{:08}", frac);
            write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
        }
    }
}

impl Serialize for Tokens {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Tokens {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ok(Tokens::from_f64(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Tokens::from_whole(1000).to_string(), "1000.00");
        assert_eq!(Tokens::from_cents(50).to_string(), "0.50");
        assert_eq!(Tokens::from_units(300_000).to_string(), "0.003");
        assert_eq!(Tokens::from_units(97_656_250).to_string(), "0.9765625");
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(Tokens::from_f64(0.003), Tokens::from_units(300_000));
        assert_eq!(Tokens::from_f64(-1.0), Tokens::ZERO);
        assert_eq!(Tokens::from_f64(f64::NAN), Tokens::ZERO);
    }

    #[test]
    fn test_rounding() {
        let cent = Tokens::UNITS_PER_CENT;
        // 166.666... rounds to 166.67 half-up, 166.66 floored
        let third = Tokens::from_whole(500).split_floor(3, 1);
        assert_eq!(third.round_to(cent), Tokens::from_cents(16_667));
        assert_eq!(third.floor_to(cent), Tokens::from_cents(16_666));
        assert_eq!(Tokens::from_whole(500).split_floor(3, cent), Tokens::from_cents(16_666));
    }

    #[test]
    fn test_scale_bps() {
        let cent = Tokens::UNITS_PER_CENT;
        assert_eq!(
            Tokens::from_whole(1000).scale_bps(5_000, cent),
            Tokens::from_whole(500)
        );
        // 0.005 rounds half-up to 0.01
        assert_eq!(
            Tokens::from_cents(1).scale_bps(5_000, cent),
            Tokens::from_cents(1)
        );
        // Unit precision keeps sub-cent amounts
        assert_eq!(
            Tokens::from_units(300_000).scale_bps(5_000, 1),
            Tokens::from_units(150_000)
        );
    }

    #[test]
    fn test_saturating_math() {
        assert_eq!(Tokens::from_whole(1) - Tokens::from_whole(2), Tokens::ZERO);
        let total: Tokens = [Tokens::from_whole(1), Tokens::from_cents(50)]
            .into_iter()
            .sum();
        assert_eq!(total, Tokens::from_cents(150));
    }
}
