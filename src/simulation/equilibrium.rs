//! The single-period partial-equilibrium solver.
//!
//! Producer prices are found by damped tâtonnement. At each iteration, demand in every destination
//! is aggregated over origins with a CES composite price and split between origins with Armington
//! shares. Each producer price is then moved in proportion to the relative gap between its supply
//! and the quantity shipped from it.
use crate::maps::{RegionTierMap, TierMap, TradeMap};
use crate::policy::PolicyRegime;
use crate::region::Region;
use derive_more::Display;
use log::{debug, trace};

/// Calibrated market parameters for a single period
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarketParameters {
    /// Armington preference weights, keyed by (origin, destination, tier)
    pub armington: TradeMap<f64>,
    /// CES substitution elasticity between origins, per tier
    pub sigma: TierMap<f64>,
    /// Demand scale (A), per region and tier
    pub demand_scale: RegionTierMap<f64>,
    /// Price elasticity of demand (epsilon), per region and tier
    pub demand_elasticity: RegionTierMap<f64>,
    /// Supply shifter (gamma), per region and tier
    pub supply_shifter: RegionTierMap<f64>,
    /// Supply elasticity (eta), per region and tier
    pub supply_elasticity: RegionTierMap<f64>,
    /// Starting producer price, per tier
    pub base_price: TierMap<f64>,
}

/// Numerical settings for the solver
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverSettings {
    /// Maximum number of price updates
    pub max_iterations: u32,
    /// Iteration stops once the maximum absolute relative gap falls below this value
    pub tolerance: f64,
    /// Fraction of the relative gap applied to prices at each update
    pub damping: f64,
    /// Lower bound for producer prices
    pub min_price: f64,
    /// Small number guarding divisions
    pub epsilon: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-4,
            damping: 0.3,
            min_price: 0.05,
            epsilon: 1e-9,
        }
    }
}

/// How the solver fared for a single period
#[derive(Clone, Copy, Debug, PartialEq, Display)]
#[display("{iterations} iterations, max relative gap {max_gap:.3e}, converged: {converged}")]
pub struct SolverDiagnostics {
    /// Number of price updates performed
    pub iterations: u32,
    /// Maximum absolute relative gap at the returned prices
    pub max_gap: f64,
    /// Whether the tolerance was met before the iteration limit
    pub converged: bool,
}

/// The market outcome for a single period
#[derive(Clone, Debug, PartialEq)]
pub struct Equilibrium {
    /// Producer prices
    pub prices: RegionTierMap<f64>,
    /// Tariff-inclusive prices paid by each destination for each origin's chips
    pub tariff_prices: TradeMap<f64>,
    /// CES composite price faced by consumers in each destination
    pub consumption_price: RegionTierMap<f64>,
    /// Quantity produced
    pub production: RegionTierMap<f64>,
    /// Quantity shipped along each route, including domestic sales
    pub flows: TradeMap<f64>,
    /// Quantity consumed
    pub consumption: RegionTierMap<f64>,
    /// Tariff revenue collected on cross-region flows
    pub government_revenue: f64,
    /// Convergence information
    pub diagnostics: SolverDiagnostics,
}

/// Everything implied by a given producer price vector
struct MarketState {
    tariff_prices: TradeMap<f64>,
    consumption_price: RegionTierMap<f64>,
    consumption: RegionTierMap<f64>,
    flows: TradeMap<f64>,
    production: RegionTierMap<f64>,
}

/// The CES weight of a single origin: `beta * price^(1 - sigma)`
fn ces_weight(beta: f64, price: f64, sigma: f64) -> f64 {
    if beta == 0.0 {
        0.0
    } else {
        beta * price.powf(1.0 - sigma)
    }
}

/// Prices paid by each destination, including the destination's tariff on the origin
pub fn tariff_inclusive_prices(
    prices: &RegionTierMap<f64>,
    policy: &PolicyRegime,
) -> TradeMap<f64> {
    TradeMap::from_fn(|origin, destination, tier| {
        prices[(origin, tier)] * (1.0 + policy.tariffs.rate(destination, tier, origin))
    })
}

/// CES composite prices for each destination and tier.
///
/// A destination with no weight on any origin has a composite price of zero.
pub fn composite_prices(
    armington: &TradeMap<f64>,
    tariff_prices: &TradeMap<f64>,
    sigma: &TierMap<f64>,
) -> RegionTierMap<f64> {
    RegionTierMap::from_fn(|destination, tier| {
        let sigma = sigma[tier];
        let total: f64 = Region::ALL
            .iter()
            .map(|&origin| {
                let key = (origin, destination, tier);
                ces_weight(armington[key], tariff_prices[key], sigma)
            })
            .sum();

        if total > 0.0 {
            total.powf(1.0 / (1.0 - sigma))
        } else {
            0.0
        }
    })
}

/// The share of each destination's consumption sourced from each origin.
///
/// Shares for a given (destination, tier) sum to one, unless all of its weights are zero, in which
/// case they are all zero.
pub fn armington_shares(
    armington: &TradeMap<f64>,
    tariff_prices: &TradeMap<f64>,
    sigma: &TierMap<f64>,
) -> TradeMap<f64> {
    let weights = TradeMap::from_fn(|origin, destination, tier| {
        let key = (origin, destination, tier);
        ces_weight(armington[key], tariff_prices[key], sigma[tier])
    });

    TradeMap::from_fn(|origin, destination, tier| {
        let total = weights.total_to(destination, tier);
        if total == 0.0 {
            0.0
        } else {
            weights[(origin, destination, tier)] / total
        }
    })
}

/// Quantity supplied at the given prices, including any per-unit subsidy
pub fn supply(
    prices: &RegionTierMap<f64>,
    market: &MarketParameters,
    policy: &PolicyRegime,
) -> RegionTierMap<f64> {
    RegionTierMap::from_fn(|region, tier| {
        let key = (region, tier);
        let price = prices[key] + policy.subsidies[key];
        market.supply_shifter[key] * price.powf(market.supply_elasticity[key])
    })
}

impl MarketState {
    /// Evaluate demand, trade and supply at the given producer prices
    fn evaluate(
        prices: &RegionTierMap<f64>,
        market: &MarketParameters,
        policy: &PolicyRegime,
    ) -> Self {
        let tariff_prices = tariff_inclusive_prices(prices, policy);
        let consumption_price = composite_prices(&market.armington, &tariff_prices, &market.sigma);
        let consumption = RegionTierMap::from_fn(|region, tier| {
            let key = (region, tier);
            let price = consumption_price[key];
            if price > 0.0 {
                market.demand_scale[key] * price.powf(-market.demand_elasticity[key])
            } else {
                0.0
            }
        });

        let shares = armington_shares(&market.armington, &tariff_prices, &market.sigma);
        let flows = TradeMap::from_fn(|origin, destination, tier| {
            shares[(origin, destination, tier)] * consumption[(destination, tier)]
        });

        Self {
            tariff_prices,
            consumption_price,
            consumption,
            flows,
            production: supply(prices, market, policy),
        }
    }

    /// Relative gap between supply and shipments for each producer
    fn relative_gaps(&self, epsilon: f64) -> RegionTierMap<f64> {
        RegionTierMap::from_fn(|region, tier| {
            let supplied = self.production[(region, tier)];
            let shipped = self.flows.total_from(region, tier);
            (supplied - shipped) / (supplied + epsilon)
        })
    }
}

/// The largest absolute value in `gaps`
fn max_abs(gaps: &RegionTierMap<f64>) -> f64 {
    gaps.iter().map(|(_, gap)| gap.abs()).fold(0.0, f64::max)
}

/// Perform a single damped price update.
///
/// Returns the new prices and the maximum absolute relative gap measured at the old prices.
pub fn step(
    prices: &RegionTierMap<f64>,
    market: &MarketParameters,
    policy: &PolicyRegime,
    settings: &SolverSettings,
) -> (RegionTierMap<f64>, f64) {
    let gaps = MarketState::evaluate(prices, market, policy).relative_gaps(settings.epsilon);
    let new_prices = RegionTierMap::from_fn(|region, tier| {
        let key = (region, tier);
        (prices[key] * (1.0 - settings.damping * gaps[key])).max(settings.min_price)
    });

    (new_prices, max_abs(&gaps))
}

/// Total tariff revenue on cross-region flows
fn government_revenue(
    prices: &RegionTierMap<f64>,
    flows: &TradeMap<f64>,
    policy: &PolicyRegime,
) -> f64 {
    flows
        .iter()
        .filter(|((origin, destination, _), _)| origin != destination)
        .map(|((origin, destination, tier), flow)| {
            policy.tariffs.rate(destination, tier, origin) * prices[(origin, tier)] * flow
        })
        .sum()
}

/// Solve for the market equilibrium under the given policy.
///
/// Failing to converge within `settings.max_iterations` is not an error: the state at the last
/// price vector is returned and [`SolverDiagnostics::converged`] is false.
pub fn solve(
    market: &MarketParameters,
    policy: &PolicyRegime,
    settings: &SolverSettings,
) -> Equilibrium {
    let mut prices = RegionTierMap::from_fn(|_, tier| market.base_price[tier]);
    let mut iterations = 0;
    let mut converged = false;
    while iterations < settings.max_iterations {
        let (new_prices, max_gap) = step(&prices, market, policy, settings);
        prices = new_prices;
        iterations += 1;
        trace!("Solver iteration {iterations}: max relative gap {max_gap:.3e}");

        if max_gap < settings.tolerance {
            converged = true;
            break;
        }
    }

    let state = MarketState::evaluate(&prices, market, policy);
    let diagnostics = SolverDiagnostics {
        iterations,
        max_gap: max_abs(&state.relative_gaps(settings.epsilon)),
        converged,
    };
    debug!("Solver finished: {diagnostics}");

    Equilibrium {
        government_revenue: government_revenue(&prices, &state.flows, policy),
        prices,
        tariff_prices: state.tariff_prices,
        consumption_price: state.consumption_price,
        production: state.production,
        flows: state.flows,
        consumption: state.consumption,
        diagnostics,
    }
}
