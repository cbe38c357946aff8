//! Translates nutrient bounds and a feed list into a linear program.
//!
//! Decision variables are the mass fractions of each feed, bounded to
//! `[0, 1]` and summing to one. Every nutrient contributes a `>=` row for its
//! minimum and a `<=` row for its maximum; the blend's concentration is the
//! fraction-weighted sum of the feeds' concentrations, so bounds apply
//! directly without scaling. The objective is cost per unit mass of blend.

use std::collections::HashSet;

use feedmix_solver::{ConstraintOp, LpProblem};
use serde::{Deserialize, Serialize};

use crate::error::{FeedMixError, Result};
use crate::model::{FeedItem, Nutrient, NutrientBounds};

/// Row forcing the fractions to sum to one
pub const TOTAL_FRACTION: &str = "total_fraction";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundKind {
    Min,
    Max,
}

/// What each LP row stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    TotalFraction,
    Nutrient(Nutrient, BoundKind),
}

/// The linear program for one blend, with enough bookkeeping to map solver
/// output back onto feeds and nutrient bounds
#[derive(Debug, Clone)]
pub struct MixProblem {
    pub feed_ids: Vec<String>,
    /// Parallel to `lp.constraints`
    pub rows: Vec<RowKind>,
    pub lp: LpProblem,
}

impl MixProblem {
    pub fn row(&self, index: usize) -> Option<RowKind> {
        self.rows.get(index).copied()
    }
}

pub fn build(bounds: &NutrientBounds, feeds: &[FeedItem]) -> Result<MixProblem> {
    validate_inputs(bounds, feeds)?;

    let feed_ids: Vec<String> = feeds.iter().map(|f| f.id.clone()).collect();
    let mut lp = LpProblem::new(feed_ids.clone());
    lp.set_objective(feeds.iter().map(|f| f.unit_cost).collect(), true);
    for j in 0..feeds.len() {
        lp.set_upper_bound(j, 1.0);
    }

    let mut rows = Vec::with_capacity(1 + 2 * Nutrient::ALL.len());

    lp.add_constraint(TOTAL_FRACTION, vec![1.0; feeds.len()], ConstraintOp::Eq, 1.0);
    rows.push(RowKind::TotalFraction);

    for nutrient in Nutrient::ALL {
        let coeffs: Vec<f64> = feeds.iter().map(|f| f.nutrient(nutrient)).collect();
        let range = bounds.range(nutrient);

        lp.add_constraint(format!("{}_min", nutrient), coeffs.clone(), ConstraintOp::Ge, range.min);
        rows.push(RowKind::Nutrient(nutrient, BoundKind::Min));

        lp.add_constraint(format!("{}_max", nutrient), coeffs, ConstraintOp::Le, range.max);
        rows.push(RowKind::Nutrient(nutrient, BoundKind::Max));
    }

    Ok(MixProblem { feed_ids, rows, lp })
}

/// Reject anything the optimizer cannot take at face value
pub fn validate_inputs(bounds: &NutrientBounds, feeds: &[FeedItem]) -> Result<()> {
    if feeds.is_empty() {
        return Err(FeedMixError::EmptyCatalog);
    }
    bounds.validate()?;

    let mut seen = HashSet::new();
    for feed in feeds {
        feed.validate()?;
        if !seen.insert(feed.id.as_str()) {
            return Err(FeedMixError::DuplicateFeed(feed.id.clone()));
        }
    }
    Ok(())
}
