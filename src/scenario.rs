//! Per-scenario settings for demand growth, technology feedback and R&D cost multipliers.
//!
//! Settings are resolved in layers. Values given in the model file (or by a sensitivity factor)
//! take precedence over the built-in defaults for the scenario, which in turn take precedence
//! over the global fallbacks.
use crate::maps::RegionTierMap;
use crate::policy::Scenario;
use crate::region::{Region, Tier};
use serde::Deserialize;

/// Tech feedback scale used when neither the model nor the built-in table sets one
const FALLBACK_TECH_FEEDBACK: f64 = 1.0;

/// Optional overrides for a single scenario
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct ScenarioOverrides {
    /// Annual growth rate applied to demand scales
    pub demand_growth: Option<f64>,
    /// Multiplier on the effect of technology growth on supply shifters
    pub tech_feedback: Option<f64>,
    /// Multipliers applied to reported R&D spending, keyed by region and tier
    #[serde(default)]
    pub rd_multipliers: RegionTierMap<Option<f64>>,
}

impl ScenarioOverrides {
    /// The built-in overrides for `scenario`
    pub fn defaults(scenario: Scenario) -> Self {
        let (demand_growth, tech_feedback) = match scenario {
            Scenario::Baseline => (Some(0.02), Some(1.0)),
            Scenario::TariffOnly => (Some(0.0), Some(2.0)),
            Scenario::TariffPlusSubsidy => (Some(0.025), Some(1.5)),
            Scenario::DiffByChip => (Some(0.012), Some(1.3)),
            Scenario::SubsidyOnly => (None, None),
        };

        let mut rd_multipliers = RegionTierMap::default();
        match scenario {
            Scenario::TariffOnly => {
                rd_multipliers[(Region::UnitedStates, Tier::High)] = Some(0.70);
                rd_multipliers[(Region::UnitedStates, Tier::Mid)] = Some(0.85);
            }
            Scenario::TariffPlusSubsidy => {
                rd_multipliers[(Region::UnitedStates, Tier::High)] = Some(1.10);
                rd_multipliers[(Region::UnitedStates, Tier::Mid)] = Some(1.05);
            }
            _ => {}
        }

        Self {
            demand_growth,
            tech_feedback,
            rd_multipliers,
        }
    }

    /// Layer `other` on top of `self`, with values in `other` taking precedence
    pub fn merged_with(&self, other: &Self) -> Self {
        Self {
            demand_growth: other.demand_growth.or(self.demand_growth),
            tech_feedback: other.tech_feedback.or(self.tech_feedback),
            rd_multipliers: RegionTierMap::from_fn(|region, tier| {
                other.rd_multipliers[(region, tier)].or(self.rd_multipliers[(region, tier)])
            }),
        }
    }
}

/// Fully resolved settings for one scenario run
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScenarioSettings {
    /// Annual growth rate applied to demand scales
    pub demand_growth: f64,
    /// Multiplier on the effect of technology growth on supply shifters
    pub tech_feedback_scale: f64,
    /// Multipliers applied to reported R&D spending (1.0 means no adjustment)
    pub rd_multipliers: RegionTierMap<f64>,
}

impl ScenarioSettings {
    /// Settings with no scenario-specific adjustments
    pub fn neutral(demand_growth: f64) -> Self {
        Self {
            demand_growth,
            tech_feedback_scale: FALLBACK_TECH_FEEDBACK,
            rd_multipliers: RegionTierMap::splat(1.0),
        }
    }

    /// Resolve the settings for `scenario`.
    ///
    /// # Arguments
    ///
    /// * `scenario` - The scenario being run
    /// * `overrides` - Overrides from the model file (and any sensitivity factor)
    /// * `fallback_demand_growth` - Demand growth used if no other value is given
    pub fn resolve(
        scenario: Scenario,
        overrides: &ScenarioOverrides,
        fallback_demand_growth: f64,
    ) -> Self {
        let layered = ScenarioOverrides::defaults(scenario).merged_with(overrides);
        Self {
            demand_growth: layered.demand_growth.unwrap_or(fallback_demand_growth),
            tech_feedback_scale: layered.tech_feedback.unwrap_or(FALLBACK_TECH_FEEDBACK),
            rd_multipliers: RegionTierMap::from_fn(|region, tier| {
                layered.rd_multipliers[(region, tier)].unwrap_or(1.0)
            }),
        }
    }
}
