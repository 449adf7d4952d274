//! Defines the `ModelParameters` struct, which represents the `[parameters]` section of
//! `model.toml`.
use crate::input::is_sorted_and_unique;
use crate::maps::TierMap;
use crate::region::Tier;
use crate::simulation::equilibrium::SolverSettings;
use anyhow::{Result, ensure};
use serde::Deserialize;

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_discount_factor, f64, 0.97);
define_param_default!(default_security_weight, f64, 1.0);
define_param_default!(default_tech_gap_weight, f64, 0.5);
define_param_default!(default_tech_feedback_coefficient, f64, 0.5);
define_param_default!(default_demand_growth_rate, f64, 0.02);
define_param_default!(default_epsilon, f64, 1e-9);
define_param_default!(default_min_price, f64, 0.05);
define_param_default!(default_damping, f64, 0.3);
define_param_default!(default_max_iterations, u32, 200);
define_param_default!(default_tolerance, f64, 1e-4);
define_param_default!(default_prohibitive_tariff, f64, 10.0);

/// Default technology-progress coefficients
fn default_tech_progress() -> TierMap<f64> {
    TierMap::from_fn(|tier| match tier {
        Tier::High => 0.08,
        Tier::Mid => 0.05,
        Tier::Low => 0.03,
    })
}

/// Default weights of per-tier supply security in the national security index
fn default_security_weights() -> TierMap<f64> {
    TierMap::from_fn(|tier| match tier {
        Tier::High => 0.5,
        Tier::Mid => 0.3,
        Tier::Low => 0.2,
    })
}

/// Global model constants
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// The years to simulate, in order
    pub years: Vec<u32>,
    /// Per-period discount factor applied to the objective
    #[serde(default = "default_discount_factor")]
    pub discount_factor: f64,
    /// Weight of the national security index relative to welfare in the objective
    #[serde(default = "default_security_weight")]
    pub security_weight: f64,
    /// Weight of the high-end technology gap in the national security index
    #[serde(default = "default_tech_gap_weight")]
    pub tech_gap_weight: f64,
    /// How strongly technology growth feeds back into supply shifters
    #[serde(default = "default_tech_feedback_coefficient")]
    pub tech_feedback_coefficient: f64,
    /// Demand growth used for scenarios without a specific value
    #[serde(default = "default_demand_growth_rate")]
    pub demand_growth_rate: f64,
    /// Small number guarding divisions
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Lower bound for producer prices
    #[serde(default = "default_min_price")]
    pub min_price: f64,
    /// Fraction of the relative market gap applied to prices at each solver iteration
    #[serde(default = "default_damping")]
    pub damping: f64,
    /// Maximum number of solver iterations per period
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Solver tolerance on the maximum relative supply-demand gap
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Tariff rate used to represent an export control
    #[serde(default = "default_prohibitive_tariff")]
    pub prohibitive_tariff: f64,
    /// Technology-progress coefficients per tier
    #[serde(default = "default_tech_progress")]
    pub tech_progress: TierMap<f64>,
    /// Weights of per-tier supply security in the national security index
    #[serde(default = "default_security_weights")]
    pub security_weights: TierMap<f64>,
}

/// Check that the `years` parameter is valid
fn check_years(years: &[u32]) -> Result<()> {
    ensure!(!years.is_empty(), "`years` is empty");

    ensure!(
        is_sorted_and_unique(years),
        "`years` must be composed of unique values in order"
    );

    Ok(())
}

/// Check that the `discount_factor` parameter is valid
fn check_discount_factor(value: f64) -> Result<()> {
    ensure!(
        value > 0.0 && value <= 1.0,
        "discount_factor must be greater than zero and at most one"
    );

    Ok(())
}

/// Check that a parameter is a finite number greater than zero
fn check_positive(name: &str, value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value > 0.0,
        "{name} must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that a parameter is a finite number greater than or equal to zero
fn check_non_negative(name: &str, value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be a finite number greater than or equal to zero"
    );

    Ok(())
}

impl ModelParameters {
    /// Validate parameters after reading in file
    pub fn validate(&self) -> Result<()> {
        check_years(&self.years)?;
        check_discount_factor(self.discount_factor)?;
        check_positive("epsilon", self.epsilon)?;
        check_positive("min_price", self.min_price)?;
        check_non_negative("tolerance", self.tolerance)?;
        check_non_negative("prohibitive_tariff", self.prohibitive_tariff)?;
        check_non_negative("tech_feedback_coefficient", self.tech_feedback_coefficient)?;

        ensure!(
            self.damping > 0.0 && self.damping <= 1.0,
            "damping must be greater than zero and at most one"
        );
        ensure!(self.max_iterations > 0, "max_iterations cannot be zero");
        ensure!(
            self.security_weight.is_finite() && self.tech_gap_weight.is_finite(),
            "security_weight and tech_gap_weight must be finite"
        );
        ensure!(
            self.demand_growth_rate > -1.0,
            "demand_growth_rate must be greater than -1"
        );

        for (tier, &value) in self.tech_progress.iter() {
            check_non_negative(&format!("tech_progress for tier {tier}"), value)?;
        }
        for (tier, &value) in self.security_weights.iter() {
            ensure!(
                value.is_finite(),
                "security_weights for tier {tier} must be finite"
            );
        }

        Ok(())
    }

    /// Settings for the static equilibrium solver
    pub fn solver_settings(&self) -> SolverSettings {
        SolverSettings {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            damping: self.damping,
            min_price: self.min_price,
            epsilon: self.epsilon,
        }
    }
}
