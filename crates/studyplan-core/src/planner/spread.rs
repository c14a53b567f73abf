use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::BlocksPerWeek;

/// Density tier for a study plan.
///
/// Controls how many blocks are proposed per week, never the block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spread {
    Light,
    #[default]
    Balanced,
    Intensive,
}

impl Spread {
    /// Weekly block target for this tier.
    pub fn blocks_per_week(&self, table: &BlocksPerWeek) -> u32 {
        match self {
            Self::Light => table.light,
            Self::Balanced => table.balanced,
            Self::Intensive => table.intensive,
        }
    }

    /// Fewest blocks a plan may contain before it is reported as unworkable.
    pub fn min_blocks(&self) -> usize {
        match self {
            Self::Light => 2,
            Self::Balanced | Self::Intensive => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Balanced => "balanced",
            Self::Intensive => "intensive",
        }
    }
}

impl fmt::Display for Spread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Spread {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "balanced" => Ok(Self::Balanced),
            "intensive" => Ok(Self::Intensive),
            other => Err(format!(
                "unknown spread '{other}' (expected light, balanced or intensive)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tiers_map_to_two_four_six() {
        let table = BlocksPerWeek::default();
        assert_eq!(Spread::Light.blocks_per_week(&table), 2);
        assert_eq!(Spread::Balanced.blocks_per_week(&table), 4);
        assert_eq!(Spread::Intensive.blocks_per_week(&table), 6);
    }

    #[test]
    fn min_blocks_per_tier() {
        assert_eq!(Spread::Light.min_blocks(), 2);
        assert_eq!(Spread::Balanced.min_blocks(), 4);
        assert_eq!(Spread::Intensive.min_blocks(), 4);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Intensive".parse::<Spread>(), Ok(Spread::Intensive));
        assert!("heavy".parse::<Spread>().is_err());
    }
}
