//! Code for simulation models.
use crate::input::{input_err_msg, read_toml};
use crate::policy::{Scenario, parse_scenario};
use crate::scenario::{ScenarioOverrides, ScenarioSettings};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Deserialize;
use std::path::Path;

pub mod calibration;
pub use calibration::Calibration;
pub mod parameters;
pub use parameters::ModelParameters;

const MODEL_FILE_NAME: &str = "model.toml";

/// Model definition
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// Global model constants
    pub parameters: ModelParameters,
    /// Calibrated base-year market
    pub calibration: Calibration,
    /// Scenario overrides given in the model file
    pub scenario_overrides: IndexMap<Scenario, ScenarioOverrides>,
    /// Named sensitivity factors, each giving extra overrides per scenario
    pub sensitivity: IndexMap<String, IndexMap<Scenario, ScenarioOverrides>>,
}

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize)]
struct ModelFile {
    parameters: ModelParameters,
    calibration: Calibration,
    #[serde(default)]
    scenarios: IndexMap<String, ScenarioOverrides>,
    #[serde(default)]
    sensitivity: IndexMap<String, IndexMap<String, ScenarioOverrides>>,
}

/// Check that scenario overrides are valid
fn check_overrides(overrides: &ScenarioOverrides) -> Result<()> {
    if let Some(growth) = overrides.demand_growth {
        ensure!(
            growth.is_finite() && growth > -1.0,
            "demand_growth must be greater than -1"
        );
    }
    if let Some(scale) = overrides.tech_feedback {
        ensure!(scale.is_finite(), "tech_feedback must be finite");
    }
    for ((region, tier), multiplier) in overrides.rd_multipliers.iter() {
        if let Some(multiplier) = multiplier {
            ensure!(
                multiplier.is_finite() && *multiplier >= 0.0,
                "R&D multiplier for region {region}, chip tier {tier} must be non-negative"
            );
        }
    }

    Ok(())
}

/// Convert scenario names to [`Scenario`]s and validate the overrides
fn parse_scenario_overrides(
    raw: IndexMap<String, ScenarioOverrides>,
) -> Result<IndexMap<Scenario, ScenarioOverrides>> {
    raw.into_iter()
        .map(|(name, overrides)| -> Result<_> {
            let scenario = parse_scenario(&name)?;
            check_overrides(&overrides)
                .with_context(|| format!("Invalid overrides for scenario {scenario}"))?;
            Ok((scenario, overrides))
        })
        .try_collect()
}

impl Model {
    /// Read a model from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
        let file_path = model_dir.as_ref().join(MODEL_FILE_NAME);
        let model_file: ModelFile = read_toml(&file_path)?;

        model_file
            .parameters
            .validate()
            .with_context(|| input_err_msg(&file_path))?;
        model_file
            .calibration
            .validate()
            .with_context(|| input_err_msg(&file_path))?;
        let scenario_overrides = parse_scenario_overrides(model_file.scenarios)
            .with_context(|| input_err_msg(&file_path))?;
        let sensitivity = model_file
            .sensitivity
            .into_iter()
            .map(|(name, factor)| -> Result<_> {
                let factor = parse_scenario_overrides(factor)
                    .with_context(|| format!("Invalid sensitivity factor {name}"))?;
                Ok((name, factor))
            })
            .try_collect::<_, IndexMap<_, _>, _>()
            .with_context(|| input_err_msg(&file_path))?;

        Ok(Model {
            parameters: model_file.parameters,
            calibration: model_file.calibration,
            scenario_overrides,
            sensitivity,
        })
    }

    /// Iterate over the simulated years
    pub fn iter_years(&self) -> impl Iterator<Item = u32> + '_ {
        self.parameters.years.iter().copied()
    }

    /// The overrides given in the model file for `scenario`, if any
    pub fn overrides_for(&self, scenario: Scenario) -> ScenarioOverrides {
        self.scenario_overrides
            .get(&scenario)
            .copied()
            .unwrap_or_default()
    }

    /// Fully resolved settings for `scenario`, with `overrides` layered on the built-in defaults
    pub fn scenario_settings(
        &self,
        scenario: Scenario,
        overrides: &ScenarioOverrides,
    ) -> ScenarioSettings {
        ScenarioSettings::resolve(scenario, overrides, self.parameters.demand_growth_rate)
    }
}
