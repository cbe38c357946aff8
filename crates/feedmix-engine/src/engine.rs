use feedmix_solver::Solver;
use tracing::{debug, info};

use crate::builder;
use crate::error::Result;
use crate::formatter::{format_solution, EfficiencyPolicy, MixSolution};
use crate::model::{FeedItem, NutrientBounds};
use crate::source::{FeedCatalog, ProfileSource};

/// Least-cost ration engine.
///
/// Holds configuration only; every call is a pure function of its inputs, so
/// one engine can serve any number of threads.
#[derive(Debug, Clone, Default)]
pub struct MixEngine {
    solver: Solver,
    policy: EfficiencyPolicy,
}

impl MixEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_policy(mut self, policy: EfficiencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &EfficiencyPolicy {
        &self.policy
    }

    /// Cheapest blend of `feeds` meeting `bounds`.
    ///
    /// An infeasible input is not an error: the result comes back with
    /// `feasible == false` and the least-violating allocation.
    pub fn compute_optimal_mix(&self, bounds: &NutrientBounds, feeds: &[FeedItem]) -> Result<MixSolution> {
        self.policy.validate()?;
        let problem = builder::build(bounds, feeds)?;
        let solution = self.solver.try_solve(&problem.lp)?;
        let mix = format_solution(&problem, bounds, feeds, &solution, &self.policy)?;

        if mix.feasible {
            debug!(
                feeds = feeds.len(),
                used = mix.distinct_feeds(),
                cost_per_unit = mix.cost_per_unit,
                score = mix.efficiency_score,
                "optimal mix found"
            );
        } else {
            info!(
                feeds = feeds.len(),
                violations = mix.violations.len(),
                "no feasible mix, returning least-violating blend"
            );
        }
        Ok(mix)
    }

    /// Fetch the catalog and the breed's bounds, then solve.
    ///
    /// Collaborator failures are returned unchanged.
    pub fn optimize_for(
        &self,
        catalog: &dyn FeedCatalog,
        profiles: &dyn ProfileSource,
        cattle_type_id: &str,
        weight: f64,
    ) -> Result<MixSolution> {
        let bounds = profiles.fetch_nutrient_bounds(cattle_type_id, weight)?;
        let feeds = catalog.fetch_feed_catalog()?;
        debug!(cattle_type = cattle_type_id, weight, intake = bounds.total_intake(), "optimizing ration");
        self.compute_optimal_mix(&bounds, &feeds)
    }
}

/// Solve with the default solver and efficiency policy
pub fn compute_optimal_mix(bounds: &NutrientBounds, feeds: &[FeedItem]) -> Result<MixSolution> {
    MixEngine::default().compute_optimal_mix(bounds, feeds)
}
