//! Between-period dynamics and per-period indicators: R&D-driven technology growth, supply
//! security, the technology gap, the national security index and welfare.
use super::equilibrium::Equilibrium;
use crate::maps::{RegionTierMap, TierMap, TradeMap};
use crate::region::{Region, Tier};
use derive_more::Add;

/// Sales revenue (price times quantity produced) per region and tier
pub fn sales(prices: &RegionTierMap<f64>, production: &RegionTierMap<f64>) -> RegionTierMap<f64> {
    RegionTierMap::from_fn(|region, tier| prices[(region, tier)] * production[(region, tier)])
}

/// The outcome of a technology update
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TechnologyUpdate {
    /// Technology levels after the update
    pub technology: RegionTierMap<f64>,
    /// R&D spending which drove the update
    pub rd_spending: RegionTierMap<f64>,
}

/// Update technology levels from this period's R&D spending.
///
/// R&D spending is a fixed share of sales. Each producer's technology then grows in proportion to
/// its R&D spending relative to world sales of the tier.
///
/// # Arguments
///
/// * `previous` - Technology levels at the start of the period
/// * `sales` - Sales revenue for the period
/// * `rd_intensity` - Share of sales spent on R&D
/// * `progress` - Technology-progress coefficient per tier
/// * `epsilon` - Small number guarding the division by world sales
pub fn update_technology(
    previous: &RegionTierMap<f64>,
    sales: &RegionTierMap<f64>,
    rd_intensity: &RegionTierMap<f64>,
    progress: &TierMap<f64>,
    epsilon: f64,
) -> TechnologyUpdate {
    let world_sales = sales.sum_over_regions();
    let rd_spending = RegionTierMap::from_fn(|region, tier| {
        rd_intensity[(region, tier)] * sales[(region, tier)]
    });
    let technology = RegionTierMap::from_fn(|region, tier| {
        let key = (region, tier);
        previous[key] * (1.0 + progress[tier] * rd_spending[key] / (world_sales[tier] + epsilon))
    });

    TechnologyUpdate {
        technology,
        rd_spending,
    }
}

/// The share of US consumption of each tier not sourced from CN.
///
/// The result is not clamped and may be negative if imports exceed consumption.
pub fn supply_security(
    flows: &TradeMap<f64>,
    consumption: &RegionTierMap<f64>,
    epsilon: f64,
) -> TierMap<f64> {
    TierMap::from_fn(|tier| {
        let risky_imports = flows[(Region::China, Region::UnitedStates, tier)];
        1.0 - risky_imports / consumption[(Region::UnitedStates, tier)].max(epsilon)
    })
}

/// Log ratio of US to CN high-end technology
pub fn tech_gap(technology: &RegionTierMap<f64>, epsilon: f64) -> f64 {
    let us = technology[(Region::UnitedStates, Tier::High)];
    let cn = technology[(Region::China, Tier::High)];
    ((us + epsilon) / (cn + epsilon)).ln()
}

/// Weighted sum of per-tier supply security plus the weighted technology gap
pub fn national_security_index(
    security: &TierMap<f64>,
    gap: f64,
    security_weights: &TierMap<f64>,
    tech_gap_weight: f64,
) -> f64 {
    let weighted_security: f64 = security
        .iter()
        .map(|(tier, security)| security_weights[tier] * security)
        .sum();

    weighted_security + tech_gap_weight * gap
}

/// Breakdown of welfare for a single period
#[derive(Clone, Copy, Debug, Default, PartialEq, Add)]
pub struct Welfare {
    /// Isoelastic consumer surplus
    pub consumer_surplus: f64,
    /// Producer surplus implied by the supply curves
    pub producer_surplus: f64,
    /// Tariff revenue
    pub government_revenue: f64,
    /// Outlay on production subsidies
    pub subsidy_cost: f64,
    /// R&D spending, as reported for cost accounting
    pub rd_cost: f64,
}

impl Welfare {
    /// Net welfare: surpluses plus revenue, less subsidy and R&D costs
    pub fn total(&self) -> f64 {
        self.consumer_surplus + self.producer_surplus + self.government_revenue
            - self.subsidy_cost
            - self.rd_cost
    }
}

/// Calculate welfare for a solved period.
///
/// Consumer surplus is only counted where demand is price elastic (elasticity above one), as it is
/// unbounded otherwise.
pub fn welfare(
    eq: &Equilibrium,
    demand_elasticity: &RegionTierMap<f64>,
    supply_elasticity: &RegionTierMap<f64>,
    subsidy_cost: f64,
    rd_cost: f64,
) -> Welfare {
    let consumer_surplus = RegionTierMap::<f64>::keys()
        .filter(|&key| demand_elasticity[key] > 1.0)
        .map(|key| eq.consumption[key] * eq.consumption_price[key] / (demand_elasticity[key] - 1.0))
        .sum();
    let producer_surplus = RegionTierMap::<f64>::keys()
        .map(|key| {
            let eta = supply_elasticity[key];
            eta / (eta + 1.0) * eq.prices[key] * eq.production[key]
        })
        .sum();

    Welfare {
        consumer_surplus,
        producer_surplus,
        government_revenue: eq.government_revenue,
        subsidy_cost,
        rd_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::calibration;
    use crate::model::Calibration;
    use crate::policy::PolicyRegime;
    use crate::simulation::equilibrium::{SolverSettings, solve};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_sales() {
        let prices = RegionTierMap::splat(2.0);
        let production = RegionTierMap::from_fn(|region, _| (region.index() + 1) as f64);
        let sales = sales(&prices, &production);
        assert_eq!(sales[(Region::UnitedStates, Tier::High)], 2.0);
        assert_eq!(sales[(Region::RestOfWorld, Tier::Low)], 6.0);
    }

    #[rstest]
    #[case(RegionTierMap::splat(1.0))]
    #[case(RegionTierMap::from_fn(|r, t| (r.index() * 3 + t.index()) as f64 * 50.0))]
    #[case(RegionTierMap::splat(0.0))]
    fn test_technology_non_decreasing(#[case] sales: RegionTierMap<f64>) {
        let previous = RegionTierMap::from_fn(|region, _| 0.5 + region.index() as f64);
        let update = update_technology(
            &previous,
            &sales,
            &RegionTierMap::splat(0.1),
            &TierMap::splat(0.05),
            EPS,
        );
        for (key, &technology) in update.technology.iter() {
            assert!(technology >= previous[key]);
            assert!(update.rd_spending[key] >= 0.0);
        }
    }

    #[test]
    fn test_update_technology_values() {
        // A single producer with all world sales grows by phi * intensity
        let mut sales = RegionTierMap::splat(0.0);
        sales[(Region::UnitedStates, Tier::High)] = 100.0;
        let mut progress = TierMap::splat(0.0);
        progress[Tier::High] = 0.5;
        let update = update_technology(
            &RegionTierMap::splat(2.0),
            &sales,
            &RegionTierMap::splat(0.2),
            &progress,
            EPS,
        );
        assert_approx_eq!(f64, update.rd_spending[(Region::UnitedStates, Tier::High)], 20.0);
        assert_approx_eq!(
            f64,
            update.technology[(Region::UnitedStates, Tier::High)],
            2.0 * (1.0 + 0.5 * 0.2),
            epsilon = 1e-9
        );
        assert_eq!(update.technology[(Region::China, Tier::High)], 2.0);
        assert_eq!(update.technology[(Region::UnitedStates, Tier::Low)], 2.0);
    }

    #[test]
    fn test_update_technology_no_world_sales() {
        // Tiers with no sales anywhere keep their technology level
        let progress = TierMap::splat(0.5);
        let update = update_technology(
            &RegionTierMap::splat(1.5),
            &RegionTierMap::splat(0.0),
            &RegionTierMap::splat(0.2),
            &progress,
            EPS,
        );
        for (_, &technology) in update.technology.iter() {
            assert!(technology.is_finite());
            assert_eq!(technology, 1.5);
        }
        assert_eq!(update.rd_spending, RegionTierMap::splat(0.0));
    }

    #[test]
    fn test_supply_security() {
        let mut flows = TradeMap::splat(0.0);
        flows[(Region::China, Region::UnitedStates, Tier::High)] = 25.0;
        flows[(Region::China, Region::UnitedStates, Tier::Low)] = 10.0;
        let mut consumption = RegionTierMap::splat(100.0);
        consumption[(Region::UnitedStates, Tier::Low)] = 0.0;

        let security = supply_security(&flows, &consumption, EPS);
        assert_approx_eq!(f64, security[Tier::High], 0.75);
        assert_approx_eq!(f64, security[Tier::Mid], 1.0);

        // Not clamped when consumption is negligible
        assert!(security[Tier::Low] < 0.0);
        assert!(security[Tier::Low].is_finite());
    }

    #[rstest]
    #[case(1.0, 1.0, 0.0)]
    #[case(2.0, 1.0, 2.0_f64.ln())]
    #[case(1.0, 2.0, -(2.0_f64.ln()))]
    fn test_tech_gap(#[case] us: f64, #[case] cn: f64, #[case] expected: f64) {
        let mut technology = RegionTierMap::splat(1.0);
        technology[(Region::UnitedStates, Tier::High)] = us;
        technology[(Region::China, Tier::High)] = cn;
        assert_approx_eq!(f64, tech_gap(&technology, EPS), expected, epsilon = 1e-8);
    }

    #[test]
    fn test_nsi_full_security_equals_weight_sum() {
        let weights = TierMap::from_fn(|tier| match tier {
            Tier::High => 0.5,
            Tier::Mid => 0.3,
            Tier::Low => 0.2,
        });
        let nsi = national_security_index(&TierMap::splat(1.0), 0.0, &weights, 0.7);
        assert_approx_eq!(f64, nsi, weights.sum());
    }

    #[test]
    fn test_nsi_tech_gap_term() {
        let weights = TierMap::splat(0.0);
        let nsi = national_security_index(&TierMap::splat(1.0), 2.0, &weights, 0.25);
        assert_approx_eq!(f64, nsi, 0.5);
    }

    #[rstest]
    fn test_welfare(calibration: Calibration) {
        let market = calibration.market_parameters();
        let eq = solve(&market, &PolicyRegime::free_trade(), &SolverSettings::default());
        let welfare = welfare(
            &eq,
            &market.demand_elasticity,
            &market.supply_elasticity,
            3.0,
            4.0,
        );
        assert!(welfare.consumer_surplus > 0.0);
        assert!(welfare.producer_surplus > 0.0);
        assert_eq!(welfare.government_revenue, 0.0);
        assert_approx_eq!(
            f64,
            welfare.total(),
            welfare.consumer_surplus + welfare.producer_surplus - 7.0,
            epsilon = 1e-9
        );
    }

    #[rstest]
    fn test_welfare_inelastic_demand_omitted(calibration: Calibration) {
        let mut market = calibration.market_parameters();
        market.demand_elasticity = RegionTierMap::splat(0.8);
        let eq = solve(&market, &PolicyRegime::free_trade(), &SolverSettings::default());
        let welfare = welfare(&eq, &market.demand_elasticity, &market.supply_elasticity, 0.0, 0.0);
        assert_eq!(welfare.consumer_surplus, 0.0);
    }

    #[test]
    fn test_welfare_add() {
        let a = Welfare {
            consumer_surplus: 1.0,
            producer_surplus: 2.0,
            government_revenue: 3.0,
            subsidy_cost: 0.5,
            rd_cost: 0.5,
        };
        let sum = a + a;
        assert_eq!(sum.consumer_surplus, 2.0);
        assert_eq!(sum.total(), 10.0);
    }
}
