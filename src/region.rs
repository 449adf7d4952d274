//! Regions and chip tiers, the two closed key sets over which the market is defined.
use anyhow::{Context, Result};
use std::str::FromStr;
use strum::{Display, EnumCount, EnumString};

/// A trading region.
///
/// The set of regions is fixed. Supply-security metrics are always measured from the point of
/// view of the US with respect to imports from CN.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumCount)]
pub enum Region {
    /// The United States
    #[strum(serialize = "US")]
    UnitedStates,
    /// China
    #[strum(serialize = "CN")]
    China,
    /// Rest of the world
    #[strum(serialize = "ROW")]
    RestOfWorld,
}

impl Region {
    /// All regions, in index order
    pub const ALL: [Region; Region::COUNT] =
        [Region::UnitedStates, Region::China, Region::RestOfWorld];

    /// Position of the region in fixed-size maps
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// A capability tier for traded chips.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumCount)]
pub enum Tier {
    /// High-end (leading-edge) chips
    #[strum(serialize = "H")]
    High,
    /// Mid-range chips
    #[strum(serialize = "M")]
    Mid,
    /// Low-end (legacy) chips
    #[strum(serialize = "L")]
    Low,
}

impl Tier {
    /// All tiers, in index order
    pub const ALL: [Tier; Tier::COUNT] = [Tier::High, Tier::Mid, Tier::Low];

    /// Position of the tier in fixed-size maps
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Parse a region from its short name (e.g. "US")
pub fn parse_region(s: &str) -> Result<Region> {
    Region::from_str(s.trim()).with_context(|| format!("Unknown region: {s}"))
}

/// Parse a tier from its short name (e.g. "H")
pub fn parse_tier(s: &str) -> Result<Tier> {
    Tier::from_str(s.trim()).with_context(|| format!("Unknown chip tier: {s}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;

    #[test]
    fn test_index_order() {
        for (i, region) in Region::ALL.into_iter().enumerate() {
            assert_eq!(region.index(), i);
        }
        for (i, tier) in Tier::ALL.into_iter().enumerate() {
            assert_eq!(tier.index(), i);
        }
    }

    #[rstest]
    #[case("US", Region::UnitedStates)]
    #[case("CN", Region::China)]
    #[case(" ROW ", Region::RestOfWorld)]
    fn test_parse_region(#[case] input: &str, #[case] expected: Region) {
        assert_eq!(parse_region(input).unwrap(), expected);
    }

    #[test]
    fn test_parse_region_unknown() {
        assert_error!(parse_region("EU"), "Unknown region: EU");
    }

    #[rstest]
    #[case("H", Tier::High)]
    #[case("M", Tier::Mid)]
    #[case("L", Tier::Low)]
    fn test_parse_tier(#[case] input: &str, #[case] expected: Tier) {
        assert_eq!(parse_tier(input).unwrap(), expected);
    }

    #[test]
    fn test_display() {
        assert_eq!(Region::RestOfWorld.to_string(), "ROW");
        assert_eq!(Tier::Mid.to_string(), "M");
    }
}
