use feedmix_solver::{ShadowPrice, Solution, SolutionStatus};
use serde::{Deserialize, Serialize};

use crate::builder::{BoundKind, MixProblem, RowKind};
use crate::error::{FeedMixError, Result};
use crate::model::{FeedItem, Nutrient, NutrientBounds, Nutrients, Range};

/// Tolerance for checking achieved nutrients against their bounds
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Fractions below this are rounding noise and count as unused
const FRACTION_EPSILON: f64 = 1e-9;

/// Weights for the efficiency score, one per nutrient
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EfficiencyPolicy {
    pub protein_weight: f64,
    pub energy_weight: f64,
    pub fiber_weight: f64,
}

impl Default for EfficiencyPolicy {
    fn default() -> Self {
        Self {
            protein_weight: 1.0,
            energy_weight: 1.0,
            fiber_weight: 1.0,
        }
    }
}

impl EfficiencyPolicy {
    pub fn new(protein_weight: f64, energy_weight: f64, fiber_weight: f64) -> Result<Self> {
        let policy = Self {
            protein_weight,
            energy_weight,
            fiber_weight,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn weight(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Protein => self.protein_weight,
            Nutrient::Energy => self.energy_weight,
            Nutrient::Fiber => self.fiber_weight,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let weights = Nutrient::ALL.map(|n| self.weight(n));
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(FeedMixError::InvalidPolicy(
                "weights must be finite and non-negative".to_string(),
            ));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(FeedMixError::InvalidPolicy("at least one weight must be positive".to_string()));
        }
        Ok(())
    }

    /// 100 when every nutrient sits on its range midpoint, 0 when every
    /// nutrient is at or beyond a bound
    pub fn score(&self, achieved: &Nutrients, bounds: &NutrientBounds) -> f64 {
        let mut total_weight = 0.0;
        let mut weighted_distance = 0.0;
        for nutrient in Nutrient::ALL {
            let weight = self.weight(nutrient);
            total_weight += weight;
            weighted_distance += weight * centering_distance(achieved.get(nutrient), bounds.range(nutrient));
        }
        if total_weight <= 0.0 {
            return 0.0;
        }
        (100.0 * (1.0 - weighted_distance / total_weight)).clamp(0.0, 100.0)
    }
}

/// Distance from the range midpoint in half-widths, capped at 1
fn centering_distance(value: f64, range: Range) -> f64 {
    let offset = (value - range.midpoint()).abs();
    let half_width = range.half_width();
    if half_width <= 0.0 {
        return if offset <= FEASIBILITY_TOLERANCE { 0.0 } else { 1.0 };
    }
    (offset / half_width).min(1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub feed_id: String,
    /// Share of the blend by mass, 0..=1
    pub mass_fraction: f64,
    /// Daily mass of this feed
    pub mass_amount: f64,
    /// Daily cost of this feed
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutrientViolation {
    pub nutrient: Nutrient,
    pub bound: BoundKind,
    pub required: f64,
    pub actual: f64,
    pub amount: f64,
    pub description: String,
}

/// An optimized blend. Infeasible blends carry the least-violating
/// allocation for diagnostics and must not be fed as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixSolution {
    pub feasible: bool,
    /// Every input feed, in input order
    pub allocations: Vec<Allocation>,
    pub total_intake: f64,
    /// Daily cost of the whole ration
    pub total_cost: f64,
    /// Cost per unit mass of blend
    pub cost_per_unit: f64,
    pub achieved_nutrients: Nutrients,
    pub efficiency_score: f64,
    /// Violated bounds, worst first (empty when feasible)
    pub violations: Vec<NutrientViolation>,
    pub binding_constraints: Vec<String>,
    pub shadow_prices: Vec<ShadowPrice>,
}

impl MixSolution {
    /// Allocations with a non-zero share
    pub fn used_allocations(&self) -> impl Iterator<Item = &Allocation> {
        self.allocations.iter().filter(|a| a.mass_fraction > FRACTION_EPSILON)
    }

    pub fn distinct_feeds(&self) -> usize {
        self.used_allocations().count()
    }

    pub fn allocation(&self, feed_id: &str) -> Option<&Allocation> {
        self.allocations.iter().find(|a| a.feed_id == feed_id)
    }

    /// Why no valid mix exists, one line per violated bound
    pub fn explain(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.description.clone()).collect()
    }
}

pub fn format_solution(
    problem: &MixProblem,
    bounds: &NutrientBounds,
    feeds: &[FeedItem],
    solution: &Solution,
    policy: &EfficiencyPolicy,
) -> Result<MixSolution> {
    let feasible = match solution.status {
        SolutionStatus::Optimal => true,
        SolutionStatus::Infeasible => false,
        status => return Err(FeedMixError::SolverFailed(status)),
    };
    if solution.values.len() != feeds.len() {
        return Err(FeedMixError::SolverFailed(solution.status));
    }

    // The fractions row is hard even in the least-violating blend, so both
    // outcomes are cleaned and renormalized the same way
    let mut fractions: Vec<f64> = solution
        .values
        .iter()
        .map(|&v| if v > FRACTION_EPSILON { v } else { 0.0 })
        .collect();
    let sum: f64 = fractions.iter().sum();
    if sum > 0.0 {
        for fraction in &mut fractions {
            *fraction /= sum;
        }
    }

    let mut achieved_nutrients = Nutrients::default();
    for (feed, &fraction) in feeds.iter().zip(&fractions) {
        achieved_nutrients.protein += fraction * feed.protein;
        achieved_nutrients.energy += fraction * feed.energy;
        achieved_nutrients.fiber += fraction * feed.fiber;
    }

    let total_intake = bounds.total_intake();
    let allocations: Vec<Allocation> = feeds
        .iter()
        .zip(&fractions)
        .map(|(feed, &fraction)| {
            let mass_amount = fraction * total_intake;
            Allocation {
                feed_id: feed.id.clone(),
                mass_fraction: fraction,
                mass_amount,
                cost: mass_amount * feed.unit_cost,
            }
        })
        .collect();

    let total_cost = allocations.iter().map(|a| a.cost).sum();
    let cost_per_unit = feeds
        .iter()
        .zip(&fractions)
        .map(|(feed, fraction)| fraction * feed.unit_cost)
        .sum();

    let violations = solution
        .violations
        .iter()
        .filter_map(|v| match problem.row(v.constraint_index)? {
            RowKind::Nutrient(nutrient, bound) => {
                let actual = achieved_nutrients.get(nutrient);
                let amount = match bound {
                    BoundKind::Min => v.required - actual,
                    BoundKind::Max => actual - v.required,
                };
                Some(NutrientViolation {
                    nutrient,
                    bound,
                    required: v.required,
                    actual,
                    amount,
                    description: describe_violation(nutrient, bound, v.required, actual, amount),
                })
            }
            RowKind::TotalFraction => None,
        })
        .collect();

    let efficiency_score = if feasible {
        policy.score(&achieved_nutrients, bounds)
    } else {
        0.0
    };

    Ok(MixSolution {
        feasible,
        allocations,
        total_intake,
        total_cost,
        cost_per_unit,
        achieved_nutrients,
        efficiency_score,
        violations,
        binding_constraints: solution.analysis.binding_constraints.clone(),
        shadow_prices: solution.analysis.shadow_prices.clone(),
    })
}

fn describe_violation(nutrient: Nutrient, bound: BoundKind, required: f64, actual: f64, amount: f64) -> String {
    let unit = nutrient.unit();
    match bound {
        BoundKind::Min => format!(
            "{} reaches only {:.2} {} against a minimum of {:.2} {} (short by {:.2} {})",
            nutrient, actual, unit, required, unit, amount, unit
        ),
        BoundKind::Max => format!(
            "{} reaches {:.2} {} against a maximum of {:.2} {} (over by {:.2} {})",
            nutrient, actual, unit, required, unit, amount, unit
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder;
    use feedmix_solver::{Analysis, ConstraintViolation};

    fn bounds() -> NutrientBounds {
        NutrientBounds::new(
            Range::new(12.0, 16.0),
            Range::new(2.4, 3.2),
            Range::new(17.0, 22.0),
            Range::new(12.0, 25.0),
        )
    }

    fn feeds() -> Vec<FeedItem> {
        vec![
            FeedItem::new("a", 10.0, 10.0, 2.0, 15.0),
            FeedItem::new("b", 6.0, 18.0, 3.2, 21.0),
        ]
    }

    fn solution(status: SolutionStatus, values: Vec<f64>) -> Solution {
        Solution {
            status,
            values,
            objective_value: 0.0,
            analysis: Analysis::default(),
            violations: Vec::new(),
        }
    }

    #[test]
    fn test_score_at_midpoint_and_bounds() {
        let policy = EfficiencyPolicy::default();
        let bounds = bounds();

        let centered = Nutrients::new(14.0, 2.8, 19.5);
        assert!((policy.score(&centered, &bounds) - 100.0).abs() < 1e-9);

        let at_bounds = Nutrients::new(12.0, 3.2, 17.0);
        assert!(policy.score(&at_bounds, &bounds).abs() < 1e-9);

        // Protein centered, energy and fiber at bounds
        let mixed = Nutrients::new(14.0, 2.4, 22.0);
        assert!((policy.score(&mixed, &bounds) - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_is_monotonic_towards_midpoint() {
        let policy = EfficiencyPolicy::default();
        let bounds = bounds();

        let mut previous = -1.0;
        for step in 0..=40 {
            let protein = 12.0 + 2.0 * step as f64 / 40.0;
            let score = policy.score(&Nutrients::new(protein, 3.0, 18.0), &bounds);
            assert!(score >= previous, "score dropped to {} at protein {}", score, protein);
            previous = score;
        }
    }

    #[test]
    fn test_score_zero_width_range() {
        let mut bounds = bounds();
        bounds.energy_min = 2.8;
        bounds.energy_max = 2.8;
        let policy = EfficiencyPolicy::new(0.0, 1.0, 0.0).unwrap();

        assert_eq!(policy.score(&Nutrients::new(14.0, 2.8, 19.5), &bounds), 100.0);
        assert_eq!(policy.score(&Nutrients::new(14.0, 2.9, 19.5), &bounds), 0.0);
    }

    #[test]
    fn test_policy_validation() {
        assert!(EfficiencyPolicy::new(1.0, 2.0, 0.5).is_ok());
        assert!(matches!(
            EfficiencyPolicy::new(0.0, 0.0, 0.0),
            Err(FeedMixError::InvalidPolicy(_))
        ));
        assert!(EfficiencyPolicy::new(-1.0, 1.0, 1.0).is_err());
        assert!(EfficiencyPolicy::new(f64::NAN, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_format_feasible() {
        let bounds = bounds().with_body_weight(600.0).unwrap();
        let feeds = feeds();
        let problem = builder::build(&bounds, &feeds).unwrap();

        let mix = format_solution(
            &problem,
            &bounds,
            &feeds,
            &solution(SolutionStatus::Optimal, vec![0.25, 0.75]),
            &EfficiencyPolicy::default(),
        )
        .unwrap();

        assert!(mix.feasible);
        assert_eq!(mix.total_intake, 15.0);
        assert_eq!(mix.allocations.len(), 2);
        assert!((mix.allocations[0].mass_amount - 3.75).abs() < 1e-9);
        assert!((mix.allocations[1].mass_amount - 11.25).abs() < 1e-9);
        assert!((mix.total_cost - (3.75 * 10.0 + 11.25 * 6.0)).abs() < 1e-9);
        assert!((mix.cost_per_unit - 7.0).abs() < 1e-9);
        assert!((mix.achieved_nutrients.protein - 16.0).abs() < 1e-9);
        assert!((mix.achieved_nutrients.fiber - 19.5).abs() < 1e-9);
        assert!(mix.efficiency_score > 0.0);
        assert!(mix.violations.is_empty());
        assert!(mix.explain().is_empty());
        assert_eq!(mix.distinct_feeds(), 2);
    }

    #[test]
    fn test_format_drops_rounding_noise() {
        let bounds = bounds();
        let feeds = feeds();
        let problem = builder::build(&bounds, &feeds).unwrap();

        let mix = format_solution(
            &problem,
            &bounds,
            &feeds,
            &solution(SolutionStatus::Optimal, vec![1e-13, 1.0]),
            &EfficiencyPolicy::default(),
        )
        .unwrap();

        assert_eq!(mix.allocations[0].mass_fraction, 0.0);
        assert_eq!(mix.allocations[1].mass_fraction, 1.0);
        assert_eq!(mix.distinct_feeds(), 1);
        assert_eq!(mix.allocation("b").map(|a| a.mass_amount), Some(12.0));
    }

    #[test]
    fn test_format_infeasible() {
        let bounds = bounds();
        let feeds = feeds();
        let problem = builder::build(&bounds, &feeds).unwrap();

        let mut infeasible = solution(SolutionStatus::Infeasible, vec![1.0, 0.0]);
        infeasible.violations.push(ConstraintViolation {
            constraint: "protein_min".to_string(),
            constraint_index: 1,
            required: 12.0,
            actual: 10.0,
            violation_amount: 2.0,
            description: String::new(),
        });

        let mix = format_solution(&problem, &bounds, &feeds, &infeasible, &EfficiencyPolicy::default()).unwrap();

        assert!(!mix.feasible);
        assert_eq!(mix.efficiency_score, 0.0);
        assert_eq!(mix.allocations[0].mass_fraction, 1.0);
        assert_eq!(mix.violations.len(), 1);
        assert_eq!(mix.violations[0].nutrient, Nutrient::Protein);
        assert_eq!(mix.violations[0].bound, BoundKind::Min);
        assert_eq!(
            mix.explain(),
            vec!["protein reaches only 10.00 % against a minimum of 12.00 % (short by 2.00 %)".to_string()]
        );
    }

    #[test]
    fn test_format_cleans_infeasible_noise() {
        let bounds = bounds();
        let feeds = feeds();
        let problem = builder::build(&bounds, &feeds).unwrap();

        let mut noisy = solution(SolutionStatus::Infeasible, vec![0.9999999996, 4e-10]);
        noisy.violations.push(ConstraintViolation {
            constraint: "protein_min".to_string(),
            constraint_index: 1,
            required: 12.0,
            actual: 10.000000003,
            violation_amount: 1.999999997,
            description: String::new(),
        });

        let mix = format_solution(&problem, &bounds, &feeds, &noisy, &EfficiencyPolicy::default()).unwrap();

        assert_eq!(mix.distinct_feeds(), 1);
        assert_eq!(mix.allocations[0].mass_fraction, 1.0);
        assert_eq!(mix.allocations[1].mass_fraction, 0.0);
        assert_eq!(mix.violations[0].actual, 10.0);
        assert_eq!(mix.violations[0].amount, 2.0);
    }

    #[test]
    fn test_format_rejects_solver_failure() {
        let bounds = bounds();
        let feeds = feeds();
        let problem = builder::build(&bounds, &feeds).unwrap();

        let err = format_solution(
            &problem,
            &bounds,
            &feeds,
            &solution(SolutionStatus::IterationLimit, Vec::new()),
            &EfficiencyPolicy::default(),
        )
        .unwrap_err();

        assert_eq!(err, FeedMixError::SolverFailed(SolutionStatus::IterationLimit));
    }
}
