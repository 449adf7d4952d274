//! Fixtures for tests
use crate::maps::{RegionTierMap, TierMap, TradeMap};
use crate::model::calibration::armington_with_domestic_bias;
use crate::model::{Calibration, Model, ModelParameters};
use crate::region::{Region, Tier};
use indexmap::IndexMap;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Build a map from per-region rows of (H, M, L) values
fn by_region(us: [f64; 3], cn: [f64; 3], row: [f64; 3]) -> RegionTierMap<f64> {
    RegionTierMap::from_fn(|region, tier| match region {
        Region::UnitedStates => us[tier.index()],
        Region::China => cn[tier.index()],
        Region::RestOfWorld => row[tier.index()],
    })
}

#[fixture]
pub fn calibration() -> Calibration {
    Calibration {
        armington: armington_with_domestic_bias(0.5).unwrap(),
        sigma: TierMap::from_fn(|tier| match tier {
            Tier::High => 3.0,
            Tier::Mid => 2.5,
            Tier::Low => 2.0,
        }),
        base_price: TierMap::splat(1.0),
        demand_scale: by_region(
            [100.0, 150.0, 200.0],
            [80.0, 160.0, 260.0],
            [120.0, 150.0, 220.0],
        ),
        demand_elasticity: RegionTierMap::from_fn(|_, tier| match tier {
            Tier::High => 1.2,
            Tier::Mid => 1.3,
            Tier::Low => 1.5,
        }),
        supply_shifter: by_region(
            [140.0, 120.0, 150.0],
            [60.0, 180.0, 300.0],
            [120.0, 160.0, 250.0],
        ),
        supply_elasticity: RegionTierMap::splat(1.0),
        technology: by_region([1.0, 1.0, 1.0], [0.6, 0.85, 1.0], [0.9, 0.9, 0.9]),
        rd_intensity: by_region(
            [0.15, 0.10, 0.05],
            [0.10, 0.08, 0.04],
            [0.12, 0.08, 0.04],
        ),
    }
}

/// A calibration in which every region is identical
#[fixture]
pub fn symmetric_calibration() -> Calibration {
    Calibration {
        armington: armington_with_domestic_bias(0.5).unwrap(),
        sigma: TierMap::splat(2.5),
        base_price: TierMap::splat(1.2),
        demand_scale: RegionTierMap::splat(100.0),
        demand_elasticity: RegionTierMap::splat(1.5),
        supply_shifter: RegionTierMap::splat(100.0),
        supply_elasticity: RegionTierMap::splat(1.0),
        technology: RegionTierMap::splat(1.0),
        rd_intensity: RegionTierMap::splat(0.1),
    }
}

#[fixture]
pub fn parameters() -> ModelParameters {
    toml::from_str("years = [2024, 2025, 2026, 2027]").unwrap()
}

#[fixture]
pub fn model(parameters: ModelParameters, calibration: Calibration) -> Model {
    Model {
        parameters,
        calibration,
        scenario_overrides: IndexMap::new(),
        sensitivity: IndexMap::new(),
    }
}

/// A single-year model with a single active tier traded between the US and CN only.
///
/// ROW and the mid and low tiers have no supply or demand. The calibration is in equilibrium at
/// the base price.
#[fixture]
pub fn two_region_model(parameters: ModelParameters) -> Model {
    let parameters = ModelParameters {
        years: vec![2024],
        ..parameters
    };
    let active = |region: Region, tier: Tier| region != Region::RestOfWorld && tier == Tier::High;

    let armington = TradeMap::from_fn(|origin, destination, _| {
        match (origin, destination) {
            (Region::RestOfWorld, Region::RestOfWorld) => 1.0,
            (Region::RestOfWorld, _) | (_, Region::RestOfWorld) => 0.0,
            _ => 0.5,
        }
    });
    let calibration = Calibration {
        armington,
        sigma: TierMap::splat(2.0),
        base_price: TierMap::splat(1.0),
        demand_scale: RegionTierMap::from_fn(|r, t| if active(r, t) { 100.0 } else { 0.0 }),
        demand_elasticity: RegionTierMap::splat(1.5),
        supply_shifter: RegionTierMap::from_fn(|r, t| if active(r, t) { 100.0 } else { 0.0 }),
        supply_elasticity: RegionTierMap::splat(1.0),
        technology: RegionTierMap::splat(1.0),
        rd_intensity: RegionTierMap::splat(0.1),
    };

    Model {
        parameters,
        calibration,
        scenario_overrides: IndexMap::new(),
        sensitivity: IndexMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    fn test_fixtures_valid(calibration: Calibration, symmetric_calibration: Calibration) {
        assert!(calibration.validate().is_ok());
        assert!(symmetric_calibration.validate().is_ok());
    }

    #[rstest::rstest]
    fn test_two_region_model_valid(two_region_model: Model) {
        assert!(two_region_model.parameters.validate().is_ok());
        assert!(two_region_model.calibration.validate().is_ok());
    }
}
