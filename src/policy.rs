//! Trade-policy regimes (tariffs and subsidies) and the named policy scenarios.
use crate::maps::{RegionTierMap, TradeMap};
use crate::region::{Region, Tier};
use anyhow::{Context, Result};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Ad-valorem tariff rates, keyed by importer, tier and exporter.
///
/// Domestic trade is never tariffed: [`TariffSchedule::rate`] is zero whenever the importer and
/// exporter are the same region.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TariffSchedule(TradeMap<f64>);

impl TariffSchedule {
    /// A schedule with no tariffs
    pub fn free_trade() -> Self {
        Self::default()
    }

    /// A schedule with the same rate on every cross-region flow
    pub fn uniform(rate: f64) -> Self {
        Self(TradeMap::from_fn(|origin, destination, _| {
            if origin == destination { 0.0 } else { rate }
        }))
    }

    /// Set the rate charged by `importer` on `tier` chips from `exporter`.
    ///
    /// Rates for domestic flows are ignored.
    pub fn set(&mut self, importer: Region, tier: Tier, exporter: Region, rate: f64) {
        if importer != exporter {
            self.0[(exporter, importer, tier)] = rate;
        }
    }

    /// The rate charged by `importer` on `tier` chips from `exporter`
    pub fn rate(&self, importer: Region, tier: Tier, exporter: Region) -> f64 {
        if importer == exporter {
            0.0
        } else {
            self.0[(exporter, importer, tier)]
        }
    }
}

/// Per-unit production subsidies, keyed by region and tier
pub type SubsidySchedule = RegionTierMap<f64>;

/// The trade policy in force for a single period
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PolicyRegime {
    /// Tariffs on cross-region flows
    pub tariffs: TariffSchedule,
    /// Production subsidies
    pub subsidies: SubsidySchedule,
}

impl PolicyRegime {
    /// No tariffs and no subsidies
    pub fn free_trade() -> Self {
        Self::default()
    }

    /// The total subsidy outlay for the given production
    pub fn subsidy_cost(&self, production: &RegionTierMap<f64>) -> f64 {
        RegionTierMap::<f64>::keys()
            .map(|key| self.subsidies[key] * production[key])
            .sum()
    }
}

impl From<TariffSchedule> for PolicyRegime {
    fn from(tariffs: TariffSchedule) -> Self {
        Self {
            tariffs,
            subsidies: SubsidySchedule::default(),
        }
    }
}

/// A named policy scenario.
///
/// Each scenario maps a simulation year to a [`PolicyRegime`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Scenario {
    /// Free trade except for an embargo on US high-end exports to CN
    Baseline,
    /// Escalating reciprocal tariffs between the US and CN, with a 10% floor on all trade
    TariffOnly,
    /// Baseline plus US tariffs on CN imports and ramped US subsidies
    TariffPlusSubsidy,
    /// Tariffs on CN mid/low-end imports only, ramping over time
    DiffByChip,
    /// Baseline tariffs with the ramped US subsidies
    SubsidyOnly,
}

/// Parse a scenario from its name (e.g. "tariff_only")
pub fn parse_scenario(s: &str) -> Result<Scenario> {
    Scenario::from_str(s.trim()).with_context(|| {
        let names: Vec<_> = Scenario::iter().map(|scenario| scenario.to_string()).collect();
        format!("Unknown scenario: {s} (valid scenarios: {})", names.join(", "))
    })
}

impl Scenario {
    /// The policy regime in force in `year`.
    ///
    /// # Arguments
    ///
    /// * `year` - Simulation year
    /// * `prohibitive_tariff` - Tariff rate used to represent an export control
    pub fn policy(self, year: u32, prohibitive_tariff: f64) -> PolicyRegime {
        match self {
            Self::Baseline => baseline_tariffs(prohibitive_tariff).into(),
            Self::TariffOnly => escalating_tariffs(year).into(),
            Self::TariffPlusSubsidy => {
                let mut tariffs = baseline_tariffs(prohibitive_tariff);
                tariffs.set(Region::UnitedStates, Tier::High, Region::China, 0.05);
                tariffs.set(Region::UnitedStates, Tier::Mid, Region::China, 0.15);
                tariffs.set(Region::UnitedStates, Tier::Low, Region::China, 0.20);
                PolicyRegime {
                    tariffs,
                    subsidies: us_subsidies(year),
                }
            }
            Self::DiffByChip => tiered_tariffs(year).into(),
            Self::SubsidyOnly => PolicyRegime {
                tariffs: baseline_tariffs(prohibitive_tariff),
                subsidies: us_subsidies(year),
            },
        }
    }
}

/// Zero tariffs except for an embargo on high-end chips from the US into CN
fn baseline_tariffs(prohibitive_tariff: f64) -> TariffSchedule {
    let mut tariffs = TariffSchedule::free_trade();
    tariffs.set(Region::China, Tier::High, Region::UnitedStates, prohibitive_tariff);
    tariffs
}

/// 10% on all trade, with an extra US<->CN tariff of 20pp rising by 10pp a year after 2024,
/// capped at 70pp
fn escalating_tariffs(year: u32) -> TariffSchedule {
    let mut extra = 0.20;
    if year >= 2025 {
        extra = (extra + 0.10 * f64::from(year - 2024)).min(0.70);
    }

    let mut tariffs = TariffSchedule::uniform(0.10);
    for tier in Tier::ALL {
        tariffs.set(Region::UnitedStates, tier, Region::China, 0.10 + extra);
        tariffs.set(Region::China, tier, Region::UnitedStates, 0.10 + extra);
    }
    tariffs
}

/// No tariffs on high-end chips; a ramped US tariff on CN mid/low-end imports
fn tiered_tariffs(year: u32) -> TariffSchedule {
    let ramp = match year {
        ..2025 => 0.10,
        2025..2027 => 0.20,
        2027..2029 => 0.30,
        _ => 0.40,
    };

    let mut tariffs = TariffSchedule::free_trade();
    for tier in [Tier::Mid, Tier::Low] {
        tariffs.set(Region::UnitedStates, tier, Region::China, ramp);
    }
    tariffs
}

/// US subsidies for high and mid-range chips, ramped over time
fn us_subsidies(year: u32) -> SubsidySchedule {
    let (high, mid) = match year {
        ..2025 => (0.10, 0.06),
        2025..2027 => (0.12, 0.07),
        _ => (0.15, 0.08),
    };

    let mut subsidies = SubsidySchedule::default();
    subsidies[(Region::UnitedStates, Tier::High)] = high;
    subsidies[(Region::UnitedStates, Tier::Mid)] = mid;
    subsidies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    const PROHIBITIVE: f64 = 10.0;

    #[test]
    fn test_domestic_tariff_always_zero() {
        let mut tariffs = TariffSchedule::uniform(0.3);
        tariffs.set(Region::China, Tier::High, Region::China, 0.9);
        for region in Region::ALL {
            for tier in Tier::ALL {
                assert_eq!(tariffs.rate(region, tier, region), 0.0);
            }
        }
        assert_eq!(
            tariffs.rate(Region::China, Tier::High, Region::RestOfWorld),
            0.3
        );
    }

    #[test]
    fn test_set_is_directional() {
        let mut tariffs = TariffSchedule::free_trade();
        tariffs.set(Region::UnitedStates, Tier::Low, Region::China, 0.5);
        assert_eq!(
            tariffs.rate(Region::UnitedStates, Tier::Low, Region::China),
            0.5
        );
        assert_eq!(
            tariffs.rate(Region::China, Tier::Low, Region::UnitedStates),
            0.0
        );
    }

    #[test]
    fn test_baseline_embargo() {
        let policy = Scenario::Baseline.policy(2024, PROHIBITIVE);
        assert_eq!(
            policy
                .tariffs
                .rate(Region::China, Tier::High, Region::UnitedStates),
            PROHIBITIVE
        );
        assert_eq!(
            policy
                .tariffs
                .rate(Region::UnitedStates, Tier::High, Region::China),
            0.0
        );
        assert_eq!(policy.subsidies, SubsidySchedule::default());
    }

    #[rstest]
    #[case(2023, 0.30)]
    #[case(2024, 0.30)]
    #[case(2025, 0.40)]
    #[case(2028, 0.70)]
    #[case(2029, 0.80)]
    #[case(2035, 0.80)]
    fn test_tariff_only_escalation(#[case] year: u32, #[case] expected: f64) {
        let policy = Scenario::TariffOnly.policy(year, PROHIBITIVE);
        for tier in Tier::ALL {
            assert_approx_eq!(
                f64,
                policy
                    .tariffs
                    .rate(Region::UnitedStates, tier, Region::China),
                expected,
                epsilon = 1e-12
            );
            assert_approx_eq!(
                f64,
                policy
                    .tariffs
                    .rate(Region::China, tier, Region::UnitedStates),
                expected,
                epsilon = 1e-12
            );
            assert_approx_eq!(
                f64,
                policy
                    .tariffs
                    .rate(Region::RestOfWorld, tier, Region::China),
                0.10
            );
        }
    }

    #[rstest]
    #[case(2024, 0.10, 0.06)]
    #[case(2025, 0.12, 0.07)]
    #[case(2026, 0.12, 0.07)]
    #[case(2027, 0.15, 0.08)]
    fn test_subsidy_ramp(#[case] year: u32, #[case] high: f64, #[case] mid: f64) {
        for scenario in [Scenario::TariffPlusSubsidy, Scenario::SubsidyOnly] {
            let policy = scenario.policy(year, PROHIBITIVE);
            assert_eq!(policy.subsidies[(Region::UnitedStates, Tier::High)], high);
            assert_eq!(policy.subsidies[(Region::UnitedStates, Tier::Mid)], mid);
            assert_eq!(policy.subsidies[(Region::UnitedStates, Tier::Low)], 0.0);
            assert_eq!(policy.subsidies[(Region::China, Tier::High)], 0.0);
        }
    }

    #[test]
    fn test_subsidy_only_uses_baseline_tariffs() {
        let policy = Scenario::SubsidyOnly.policy(2026, PROHIBITIVE);
        assert_eq!(
            policy.tariffs,
            Scenario::Baseline.policy(2026, PROHIBITIVE).tariffs
        );
    }

    #[test]
    fn test_tariff_plus_subsidy_tariffs() {
        let tariffs = Scenario::TariffPlusSubsidy.policy(2024, PROHIBITIVE).tariffs;
        assert_eq!(
            tariffs.rate(Region::UnitedStates, Tier::High, Region::China),
            0.05
        );
        assert_eq!(
            tariffs.rate(Region::UnitedStates, Tier::Mid, Region::China),
            0.15
        );
        assert_eq!(
            tariffs.rate(Region::UnitedStates, Tier::Low, Region::China),
            0.20
        );
        assert_eq!(
            tariffs.rate(Region::China, Tier::High, Region::UnitedStates),
            PROHIBITIVE
        );
    }

    #[rstest]
    #[case(2024, 0.10)]
    #[case(2025, 0.20)]
    #[case(2027, 0.30)]
    #[case(2029, 0.40)]
    fn test_diff_by_chip_ramp(#[case] year: u32, #[case] expected: f64) {
        let tariffs = Scenario::DiffByChip.policy(year, PROHIBITIVE).tariffs;
        assert_eq!(
            tariffs.rate(Region::UnitedStates, Tier::High, Region::China),
            0.0
        );
        assert_eq!(
            tariffs.rate(Region::UnitedStates, Tier::Mid, Region::China),
            expected
        );
        assert_eq!(
            tariffs.rate(Region::UnitedStates, Tier::Low, Region::China),
            expected
        );
        assert_eq!(
            tariffs.rate(Region::China, Tier::Low, Region::UnitedStates),
            0.0
        );
    }

    #[test]
    fn test_subsidy_cost() {
        let policy = Scenario::SubsidyOnly.policy(2024, PROHIBITIVE);
        let production = RegionTierMap::splat(10.0);
        assert_approx_eq!(f64, policy.subsidy_cost(&production), 1.6, epsilon = 1e-12);
    }

    #[rstest]
    #[case("baseline", Scenario::Baseline)]
    #[case("tariff_only", Scenario::TariffOnly)]
    #[case("tariff_plus_subsidy", Scenario::TariffPlusSubsidy)]
    #[case("diff_by_chip", Scenario::DiffByChip)]
    #[case("subsidy_only", Scenario::SubsidyOnly)]
    fn test_parse_scenario(#[case] name: &str, #[case] expected: Scenario) {
        assert_eq!(parse_scenario(name).unwrap(), expected);
        assert_eq!(expected.to_string(), name);
    }

    #[test]
    fn test_parse_scenario_unknown() {
        assert_error!(
            parse_scenario("embargo"),
            "Unknown scenario: embargo (valid scenarios: baseline, tariff_only, \
            tariff_plus_subsidy, diff_by_chip, subsidy_only)"
        );
    }
}
