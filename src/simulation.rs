//! Functionality for running the chip trade simulation.
use crate::maps::{RegionTierMap, TierMap};
use crate::model::Model;
use crate::output::DataWriter;
use crate::policy::{PolicyRegime, Scenario};
use crate::region::{Region, Tier};
use crate::scenario::{ScenarioOverrides, ScenarioSettings};
use anyhow::Result;
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::path::Path;

pub mod dynamics;
use dynamics::{
    Welfare, national_security_index, sales, supply_security, tech_gap, update_technology,
    welfare,
};
pub mod equilibrium;
use equilibrium::{MarketParameters, SolverDiagnostics, solve};

/// The outcome of a single simulated year
#[derive(Clone, Debug, PartialEq)]
pub struct PeriodRecord {
    /// The simulated year
    pub year: u32,
    /// National security index
    pub national_security_index: f64,
    /// Welfare breakdown
    pub welfare: Welfare,
    /// Undiscounted objective: welfare plus weighted security index
    pub objective: f64,
    /// Technology levels at the end of the year
    pub technology: RegionTierMap<f64>,
    /// Per-tier supply security of the US
    pub security: TierMap<f64>,
    /// Log ratio of US to CN high-end technology
    pub tech_gap: f64,
    /// US production
    pub us_production: TierMap<f64>,
    /// US imports from CN
    pub us_imports_from_cn: TierMap<f64>,
    /// Share of US consumption imported from CN
    pub cn_import_share: TierMap<f64>,
    /// How the equilibrium solver fared
    pub diagnostics: SolverDiagnostics,
}

/// The full history of a scenario run
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioResult {
    /// Name of the scenario (or policy function) which was run
    pub label: String,
    /// One record per simulated year, in order
    pub records: Vec<PeriodRecord>,
    /// Sum of discounted objectives over all years
    pub discounted_objective: f64,
}

impl ScenarioResult {
    /// Undiscounted welfare summed over all years
    pub fn cumulative_welfare(&self) -> Welfare {
        self.records
            .iter()
            .fold(Welfare::default(), |total, record| total + record.welfare)
    }
}

/// State carried from one year to the next
struct SimulationState {
    technology: RegionTierMap<f64>,
    supply_shifter: RegionTierMap<f64>,
    demand_scale: RegionTierMap<f64>,
}

/// Run the model with an arbitrary policy schedule.
///
/// # Arguments
///
/// * `model` - The model to run
/// * `label` - Name used for this run in logs and results
/// * `policy_fn` - Gives the policy in force for each year
/// * `settings` - Demand growth, technology feedback and R&D cost settings
pub fn run_with_policy<F>(
    model: &Model,
    label: &str,
    policy_fn: F,
    settings: &ScenarioSettings,
) -> ScenarioResult
where
    F: Fn(u32) -> PolicyRegime,
{
    let params = &model.parameters;
    let calibration = &model.calibration;
    let base_market = calibration.market_parameters();
    let solver_settings = params.solver_settings();
    let eps = params.epsilon;

    let mut state = SimulationState {
        technology: calibration.technology,
        supply_shifter: calibration.supply_shifter,
        demand_scale: calibration.demand_scale,
    };
    let mut records = Vec::with_capacity(params.years.len());
    let mut discounted_objective = 0.0;
    let mut discount = 1.0;

    for year in model.iter_years() {
        let policy = policy_fn(year);

        state.demand_scale = RegionTierMap::from_fn(|region, tier| {
            state.demand_scale[(region, tier)] * (1.0 + settings.demand_growth)
        });
        let market = MarketParameters {
            demand_scale: state.demand_scale,
            supply_shifter: state.supply_shifter,
            ..base_market
        };
        let eq = solve(&market, &policy, &solver_settings);
        if !eq.diagnostics.converged {
            warn!(
                "Equilibrium solver did not converge for {label} in {year} ({})",
                eq.diagnostics
            );
        }

        // R&D multipliers only affect reported costs, not technology growth
        let update = update_technology(
            &state.technology,
            &sales(&eq.prices, &eq.production),
            &calibration.rd_intensity,
            &params.tech_progress,
            eps,
        );
        let rd_cost: f64 = update
            .rd_spending
            .iter()
            .map(|(key, spending)| spending * settings.rd_multipliers[key])
            .sum();

        let security = supply_security(&eq.flows, &eq.consumption, eps);
        let gap = tech_gap(&update.technology, eps);
        let nsi = national_security_index(
            &security,
            gap,
            &params.security_weights,
            params.tech_gap_weight,
        );
        let welfare = welfare(
            &eq,
            &market.demand_elasticity,
            &market.supply_elasticity,
            policy.subsidy_cost(&eq.production),
            rd_cost,
        );

        let objective = welfare.total() + params.security_weight * nsi;
        discounted_objective += discount * objective;
        discount *= params.discount_factor;
        info!(
            "{label} {year}: welfare = {:.2}, NSI = {nsi:.4}, objective = {objective:.2}",
            welfare.total()
        );

        let us_imports_from_cn =
            TierMap::from_fn(|tier| eq.flows[(Region::China, Region::UnitedStates, tier)]);
        records.push(PeriodRecord {
            year,
            national_security_index: nsi,
            welfare,
            objective,
            technology: update.technology,
            security,
            tech_gap: gap,
            us_production: eq.production.region(Region::UnitedStates),
            us_imports_from_cn,
            cn_import_share: TierMap::from_fn(|tier| {
                us_imports_from_cn[tier] / eq.consumption[(Region::UnitedStates, tier)].max(eps)
            }),
            diagnostics: eq.diagnostics,
        });

        // Technology growth feeds into next year's supply
        let feedback = settings.tech_feedback_scale * params.tech_feedback_coefficient;
        state.supply_shifter = RegionTierMap::from_fn(|region, tier| {
            let key = (region, tier);
            let ratio = update.technology[key] / (state.technology[key] + eps);
            state.supply_shifter[key] * (1.0 + feedback * (ratio - 1.0))
        });
        state.technology = update.technology;
        debug!(
            "{label} {year}: high-end supply shifters US = {:.3}, CN = {:.3}",
            state.supply_shifter[(Region::UnitedStates, Tier::High)],
            state.supply_shifter[(Region::China, Tier::High)]
        );
    }

    ScenarioResult {
        label: label.to_string(),
        records,
        discounted_objective,
    }
}

/// Run a named policy scenario.
///
/// # Arguments
///
/// * `model` - The model to run
/// * `scenario` - The scenario to run
/// * `overrides` - Overrides layered on top of the built-in settings for the scenario
pub fn run_scenario(
    model: &Model,
    scenario: Scenario,
    overrides: &ScenarioOverrides,
) -> ScenarioResult {
    let settings = model.scenario_settings(scenario, overrides);
    let prohibitive_tariff = model.parameters.prohibitive_tariff;
    run_with_policy(
        model,
        &scenario.to_string(),
        |year| scenario.policy(year, prohibitive_tariff),
        &settings,
    )
}

/// Run each of the given scenarios with the overrides from the model file
pub fn run_all_scenarios(
    model: &Model,
    scenarios: &[Scenario],
) -> IndexMap<Scenario, ScenarioResult> {
    scenarios
        .iter()
        .map(|&scenario| {
            info!("Running scenario: {scenario}");
            let result = run_scenario(model, scenario, &model.overrides_for(scenario));
            (scenario, result)
        })
        .collect()
}

/// Run every scenario once for each sensitivity factor.
///
/// The overrides for each factor are layered on top of the overrides from the model file.
pub fn run_sensitivity(
    model: &Model,
    factors: &IndexMap<String, IndexMap<Scenario, ScenarioOverrides>>,
    scenarios: &[Scenario],
) -> IndexMap<String, IndexMap<Scenario, ScenarioResult>> {
    factors
        .iter()
        .map(|(name, factor)| {
            info!("Running sensitivity factor: {name}");
            let results = scenarios
                .iter()
                .map(|&scenario| {
                    let mut overrides = model.overrides_for(scenario);
                    if let Some(factor_overrides) = factor.get(&scenario) {
                        overrides = overrides.merged_with(factor_overrides);
                    }
                    (scenario, run_scenario(model, scenario, &overrides))
                })
                .collect();
            (name.clone(), results)
        })
        .collect()
}

/// Run the simulation and write results to `output_path`.
///
/// # Arguments
///
/// * `model` - The model to run
/// * `scenarios` - The scenarios to run
/// * `output_path` - The folder to which output files will be written
/// * `debug_model` - Whether to write additional information (e.g. solver diagnostics) to CSV
pub fn run(
    model: &Model,
    scenarios: &[Scenario],
    output_path: &Path,
    debug_model: bool,
) -> Result<()> {
    let mut writer = DataWriter::create(output_path, debug_model)?;

    for (scenario, result) in run_all_scenarios(model, scenarios) {
        info!(
            "Scenario {scenario}: discounted objective = {:.2}",
            result.discounted_objective
        );
        writer.write_scenario(&result)?;
    }

    if !model.sensitivity.is_empty() {
        let results = run_sensitivity(model, &model.sensitivity, scenarios);
        writer.write_sensitivity(&results)?;
    }

    writer.flush()
}
