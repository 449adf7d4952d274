//! The module responsible for writing output data to disk.
use crate::policy::Scenario;
use crate::simulation::{PeriodRecord, ScenarioResult};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "chiptrade_results";

/// The output file name for the summary of discounted objectives
const SUMMARY_FILE_NAME: &str = "summary.csv";

/// The output file name for sensitivity results
const SENSITIVITY_FILE_NAME: &str = "sensitivity.csv";

/// The output file name for solver diagnostics
const SOLVER_DIAGNOSTICS_FILE_NAME: &str = "debug_solver.csv";

/// Get the model name from the specified directory path
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model specified at `model_dir`.
///
/// Returns true if an existing, non-empty directory will be overwritten.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    // If the folder already exists, then delete it
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. \
            Please delete the folder or pass the --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in a per-scenario time series CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct PeriodRow {
    scenario: String,
    year: u32,
    nsi: f64,
    welfare: f64,
    consumer_surplus: f64,
    producer_surplus: f64,
    government_revenue: f64,
    subsidy_cost: f64,
    rd_cost: f64,
    objective: f64,
    gap_h: f64,
    security_h: f64,
    security_m: f64,
    security_l: f64,
    us_production_h: f64,
    us_production_m: f64,
    us_production_l: f64,
    us_imports_from_cn_h: f64,
    us_imports_from_cn_m: f64,
    us_imports_from_cn_l: f64,
    us_import_share_from_cn_h: f64,
    us_import_share_from_cn_m: f64,
    us_import_share_from_cn_l: f64,
}

impl PeriodRow {
    /// Create a new [`PeriodRow`]
    fn new(scenario: &str, record: &PeriodRecord) -> Self {
        use crate::region::Tier::{High, Low, Mid};

        let welfare = &record.welfare;
        Self {
            scenario: scenario.to_string(),
            year: record.year,
            nsi: record.national_security_index,
            welfare: welfare.total(),
            consumer_surplus: welfare.consumer_surplus,
            producer_surplus: welfare.producer_surplus,
            government_revenue: welfare.government_revenue,
            subsidy_cost: welfare.subsidy_cost,
            rd_cost: welfare.rd_cost,
            objective: record.objective,
            gap_h: record.tech_gap,
            security_h: record.security[High],
            security_m: record.security[Mid],
            security_l: record.security[Low],
            us_production_h: record.us_production[High],
            us_production_m: record.us_production[Mid],
            us_production_l: record.us_production[Low],
            us_imports_from_cn_h: record.us_imports_from_cn[High],
            us_imports_from_cn_m: record.us_imports_from_cn[Mid],
            us_imports_from_cn_l: record.us_imports_from_cn[Low],
            us_import_share_from_cn_h: record.cn_import_share[High],
            us_import_share_from_cn_m: record.cn_import_share[Mid],
            us_import_share_from_cn_l: record.cn_import_share[Low],
        }
    }
}

/// Represents a row in the summary CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SummaryRow {
    scenario: String,
    discounted_objective: f64,
    cumulative_welfare: f64,
}

/// Represents a row in the sensitivity CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SensitivityRow {
    factor: String,
    scenario: String,
    discounted_objective: f64,
}

/// Represents a row in the solver diagnostics CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SolverDiagnosticsRow {
    scenario: String,
    year: u32,
    iterations: u32,
    max_gap: f64,
    converged: bool,
}

/// An object for writing simulation results to file
pub struct DataWriter {
    output_path: PathBuf,
    summary_writer: csv::Writer<File>,
    solver_writer: Option<csv::Writer<File>>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let solver_writer = if save_debug_info {
            Some(new_writer(SOLVER_DIAGNOSTICS_FILE_NAME)?)
        } else {
            None
        };

        Ok(Self {
            output_path: output_path.to_path_buf(),
            summary_writer: new_writer(SUMMARY_FILE_NAME)?,
            solver_writer,
        })
    }

    /// Write the time series for a scenario to its own CSV file and add it to the summary
    pub fn write_scenario(&mut self, result: &ScenarioResult) -> Result<()> {
        let file_path = self.output_path.join(format!("{}.csv", result.label));
        let mut writer = csv::Writer::from_path(&file_path)?;
        for record in &result.records {
            writer.serialize(PeriodRow::new(&result.label, record))?;
        }
        writer.flush()?;

        self.summary_writer.serialize(SummaryRow {
            scenario: result.label.clone(),
            discounted_objective: result.discounted_objective,
            cumulative_welfare: result.cumulative_welfare().total(),
        })?;

        if let Some(wtr) = &mut self.solver_writer {
            for record in &result.records {
                wtr.serialize(SolverDiagnosticsRow {
                    scenario: result.label.clone(),
                    year: record.year,
                    iterations: record.diagnostics.iterations,
                    max_gap: record.diagnostics.max_gap,
                    converged: record.diagnostics.converged,
                })?;
            }
        }

        Ok(())
    }

    /// Write the discounted objectives for each sensitivity factor and scenario
    pub fn write_sensitivity(
        &mut self,
        results: &IndexMap<String, IndexMap<Scenario, ScenarioResult>>,
    ) -> Result<()> {
        let mut writer = csv::Writer::from_path(self.output_path.join(SENSITIVITY_FILE_NAME))?;
        for (factor, by_scenario) in results {
            for (scenario, result) in by_scenario {
                writer.serialize(SensitivityRow {
                    factor: factor.clone(),
                    scenario: scenario.to_string(),
                    discounted_objective: result.discounted_objective,
                })?;
            }
        }
        writer.flush()?;

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.summary_writer.flush()?;
        if let Some(wtr) = &mut self.solver_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}
