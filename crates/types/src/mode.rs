//! Mining modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mining intensity selected by a participant when joining a round.
///
/// Higher modes cost more energy per tick and contribute proportionally
/// more simulated attempts to the round. Everything above `Basic` must be
/// unlocked through the shop before use.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MiningMode {
    Basic,
    Turbo,
    Super,
    Nitro,
}

impl MiningMode {
    /// All modes, cheapest first.
    pub const ALL: [MiningMode; 4] = [
        MiningMode::Basic,
        MiningMode::Turbo,
        MiningMode::Super,
        MiningMode::Nitro,
    ];

    /// Energy debited per heartbeat tick.
    pub fn energy_cost(self) -> u64 {
        match self {
            Self::Basic => 100,
            Self::Turbo => 200,
            Self::Super => 400,
            Self::Nitro => 800,
        }
    }

    /// Attempt multiplier.
    pub fn multiplier(self) -> u64 {
        match self {
            Self::Basic => 1,
            Self::Turbo => 2,
            Self::Super => 4,
            Self::Nitro => 8,
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Turbo => "Turbo",
            Self::Super => "Super",
            Self::Nitro => "Nitro",
        }
    }

    /// Wire identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Turbo => "turbo",
            Self::Super => "super",
            Self::Nitro => "nitro",
        }
    }
}

impl fmt::Display for MiningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown mining mode: {0}")]
pub struct UnknownMode(pub String);

impl FromStr for MiningMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "turbo" => Ok(Self::Turbo),
            "super" => Ok(Self::Super),
            "nitro" => Ok(Self::Nitro),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modes() {
        assert_eq!("basic".parse::<MiningMode>(), Ok(MiningMode::Basic));
        assert_eq!("NITRO".parse::<MiningMode>(), Ok(MiningMode::Nitro));
        assert_eq!(
            "warp".parse::<MiningMode>(),
            Err(UnknownMode("warp".to_string()))
        );
    }

    #[test]
    fn test_costs_scale_with_multiplier() {
        for mode in MiningMode::ALL {
            assert_eq!(mode.energy_cost(), 100 * mode.multiplier());
        }
    }
}
