//! Calibrated market parameters, represented by the `[calibration]` section of `model.toml`.
use crate::maps::{RegionTierMap, TierMap, TradeMap};
use crate::region::{Region, Tier};
use crate::simulation::equilibrium::MarketParameters;
use anyhow::{Error, Result, bail, ensure};
use float_cmp::approx_eq;
use serde::Deserialize;

/// Tolerance when checking that Armington weights sum to one
const ARMINGTON_SUM_TOLERANCE: f64 = 1e-6;

/// Raw contents of the `[calibration]` section
#[derive(Debug, Deserialize)]
struct CalibrationRaw {
    sigma: TierMap<f64>,
    base_price: TierMap<f64>,
    demand_scale: RegionTierMap<f64>,
    demand_elasticity: RegionTierMap<f64>,
    supply_shifter: RegionTierMap<f64>,
    supply_elasticity: RegionTierMap<f64>,
    technology: RegionTierMap<f64>,
    rd_intensity: RegionTierMap<f64>,
    domestic_share: Option<f64>,
    armington: Option<TradeMap<f64>>,
}

/// Calibrated parameters of the chip market in the base year
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "CalibrationRaw")]
pub struct Calibration {
    /// Armington preference weights, keyed by (origin, destination, tier)
    pub armington: TradeMap<f64>,
    /// CES substitution elasticity between origins, per tier
    pub sigma: TierMap<f64>,
    /// Initial producer price, per tier
    pub base_price: TierMap<f64>,
    /// Demand scale (A), per region and tier
    pub demand_scale: RegionTierMap<f64>,
    /// Price elasticity of demand (epsilon), per region and tier
    pub demand_elasticity: RegionTierMap<f64>,
    /// Supply shifter (gamma), per region and tier
    pub supply_shifter: RegionTierMap<f64>,
    /// Supply elasticity (eta), per region and tier
    pub supply_elasticity: RegionTierMap<f64>,
    /// Initial technology level, per region and tier
    pub technology: RegionTierMap<f64>,
    /// Share of sales spent on R&D, per region and tier
    pub rd_intensity: RegionTierMap<f64>,
}

impl TryFrom<CalibrationRaw> for Calibration {
    type Error = Error;

    fn try_from(raw: CalibrationRaw) -> Result<Self> {
        let armington = match (raw.domestic_share, raw.armington) {
            (Some(share), None) => armington_with_domestic_bias(share)?,
            (None, Some(weights)) => weights,
            (Some(_), Some(_)) => bail!("Cannot specify both domestic_share and armington"),
            (None, None) => bail!("One of domestic_share or armington must be specified"),
        };

        Ok(Self {
            armington,
            sigma: raw.sigma,
            base_price: raw.base_price,
            demand_scale: raw.demand_scale,
            demand_elasticity: raw.demand_elasticity,
            supply_shifter: raw.supply_shifter,
            supply_elasticity: raw.supply_elasticity,
            technology: raw.technology,
            rd_intensity: raw.rd_intensity,
        })
    }
}

/// Symmetric Armington weights with a bias towards domestic supply.
///
/// Each destination gives weight `domestic_share` to its own production and splits the
/// remainder evenly between the other regions.
pub fn armington_with_domestic_bias(domestic_share: f64) -> Result<TradeMap<f64>> {
    ensure!(
        (0.0..=1.0).contains(&domestic_share),
        "domestic_share must be between 0 and 1"
    );

    let import_share = (1.0 - domestic_share) / (Region::ALL.len() - 1) as f64;
    Ok(TradeMap::from_fn(|origin, destination, _| {
        if origin == destination {
            domestic_share
        } else {
            import_share
        }
    }))
}

/// Check that every value in a map satisfies `predicate`
fn check_all<F>(name: &str, map: &RegionTierMap<f64>, requirement: &str, predicate: F) -> Result<()>
where
    F: Fn(f64) -> bool,
{
    for ((region, tier), &value) in map.iter() {
        ensure!(
            value.is_finite() && predicate(value),
            "{name} for region {region}, chip tier {tier} must be {requirement} (got {value})"
        );
    }

    Ok(())
}

impl Calibration {
    /// Validate calibrated parameters after reading in file
    pub fn validate(&self) -> Result<()> {
        for ((origin, destination, tier), &weight) in self.armington.iter() {
            ensure!(
                weight.is_finite() && weight >= 0.0,
                "Armington weight for {origin} -> {destination}, chip tier {tier} must be \
                non-negative"
            );
        }
        for destination in Region::ALL {
            for tier in Tier::ALL {
                let total = self.armington.total_to(destination, tier);
                ensure!(
                    approx_eq!(f64, total, 1.0, epsilon = ARMINGTON_SUM_TOLERANCE),
                    "Armington weights for destination {destination}, chip tier {tier} must sum \
                    to one (got {total})"
                );
            }
        }

        for tier in Tier::ALL {
            let sigma = self.sigma[tier];
            ensure!(
                sigma.is_finite() && sigma > 0.0 && sigma != 1.0,
                "sigma for chip tier {tier} must be positive and not equal to one"
            );
            let price = self.base_price[tier];
            ensure!(
                price.is_finite() && price > 0.0,
                "base_price for chip tier {tier} must be positive"
            );
        }

        check_all("demand_scale", &self.demand_scale, "non-negative", |v| v >= 0.0)?;
        check_all("demand_elasticity", &self.demand_elasticity, "positive", |v| v > 0.0)?;
        check_all("supply_shifter", &self.supply_shifter, "non-negative", |v| v >= 0.0)?;
        check_all("supply_elasticity", &self.supply_elasticity, "non-negative", |v| v >= 0.0)?;
        check_all("technology", &self.technology, "positive", |v| v > 0.0)?;
        check_all("rd_intensity", &self.rd_intensity, "non-negative", |v| v >= 0.0)?;

        Ok(())
    }

    /// Market parameters for the base year
    pub fn market_parameters(&self) -> MarketParameters {
        MarketParameters {
            armington: self.armington,
            sigma: self.sigma,
            demand_scale: self.demand_scale,
            demand_elasticity: self.demand_elasticity,
            supply_shifter: self.supply_shifter,
            supply_elasticity: self.supply_elasticity,
            base_price: self.base_price,
        }
    }
}
