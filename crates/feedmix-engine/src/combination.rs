//! Saved ration record, in the shape the dashboard persists.

use serde::{Deserialize, Serialize};

use crate::formatter::MixSolution;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinationFeed {
    pub feed_id: String,
    /// Share of the ration, percent
    pub ratio: f64,
    /// Daily mass
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionalValues {
    pub total_protein: f64,
    pub total_energy: f64,
    pub total_fiber: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedCombination {
    pub name: String,
    pub cattle_type_id: String,
    pub cattle_name: String,
    pub feeds: Vec<CombinationFeed>,
    pub total_cost: f64,
    pub nutritional_values: NutritionalValues,
    pub efficiency_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl FeedCombination {
    /// Record for a feasible mix, listing only the feeds it uses.
    /// Infeasible mixes are never saved.
    pub fn from_solution(
        name: impl Into<String>,
        cattle_type_id: impl Into<String>,
        cattle_name: impl Into<String>,
        mix: &MixSolution,
    ) -> Option<Self> {
        if !mix.feasible {
            return None;
        }

        let feeds = mix
            .used_allocations()
            .map(|a| CombinationFeed {
                feed_id: a.feed_id.clone(),
                ratio: a.mass_fraction * 100.0,
                amount: a.mass_amount,
            })
            .collect();

        Some(Self {
            name: name.into(),
            cattle_type_id: cattle_type_id.into(),
            cattle_name: cattle_name.into(),
            feeds,
            total_cost: mix.total_cost,
            nutritional_values: NutritionalValues {
                total_protein: mix.achieved_nutrients.protein,
                total_energy: mix.achieved_nutrients.energy,
                total_fiber: mix.achieved_nutrients.fiber,
            },
            efficiency_score: mix.efficiency_score,
            notes: None,
        })
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
