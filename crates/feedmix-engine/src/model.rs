use serde::{Deserialize, Serialize};

use crate::error::{FeedMixError, Result};

/// Share of body weight an animal eats per day
pub const DAILY_INTAKE_FRACTION: f64 = 0.025;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nutrient {
    Protein,
    Energy,
    Fiber,
}

impl Nutrient {
    pub const ALL: [Nutrient; 3] = [Nutrient::Protein, Nutrient::Energy, Nutrient::Fiber];

    pub fn name(self) -> &'static str {
        match self {
            Nutrient::Protein => "protein",
            Nutrient::Energy => "energy",
            Nutrient::Fiber => "fiber",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Nutrient::Protein | Nutrient::Fiber => "%",
            Nutrient::Energy => "Mcal/kg",
        }
    }
}

impl std::fmt::Display for Nutrient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Nutrient concentration of a feed or a blend, per unit mass
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Nutrients {
    pub protein: f64,
    pub energy: f64,
    pub fiber: f64,
}

impl Nutrients {
    pub fn new(protein: f64, energy: f64, fiber: f64) -> Self {
        Self { protein, energy, fiber }
    }

    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Protein => self.protein,
            Nutrient::Energy => self.energy,
            Nutrient::Fiber => self.fiber,
        }
    }
}

/// A feed available for mixing. Snapshot taken right before a solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FeedItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Price per `unit` of feed
    pub unit_cost: f64,
    /// Crude protein, percent of mass
    pub protein: f64,
    /// Metabolizable energy, Mcal per kg
    pub energy: f64,
    /// Fiber, percent of mass
    pub fiber: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_unit() -> String {
    "kg".to_string()
}

impl FeedItem {
    pub fn new(id: impl Into<String>, unit_cost: f64, protein: f64, energy: f64, fiber: f64) -> Self {
        Self {
            id: id.into(),
            name: None,
            category: None,
            unit_cost,
            protein,
            energy,
            fiber,
            unit: default_unit(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn nutrient(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Protein => self.protein,
            Nutrient::Energy => self.energy,
            Nutrient::Fiber => self.fiber,
        }
    }

    pub fn nutrients(&self) -> Nutrients {
        Nutrients::new(self.protein, self.energy, self.fiber)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(FeedMixError::InvalidFeedId);
        }
        if !self.unit_cost.is_finite() || self.unit_cost < 0.0 {
            return Err(FeedMixError::InvalidCost {
                feed: self.id.clone(),
                value: self.unit_cost,
            });
        }
        for nutrient in Nutrient::ALL {
            let value = self.nutrient(nutrient);
            if !value.is_finite() || value < 0.0 {
                return Err(FeedMixError::InvalidNutrient {
                    feed: self.id.clone(),
                    nutrient: nutrient.name(),
                    value,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn half_width(&self) -> f64 {
        (self.max - self.min) / 2.0
    }

    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        value >= self.min - tolerance && value <= self.max + tolerance
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    pub(crate) fn validate(&self, dimension: &'static str) -> Result<()> {
        for value in [self.min, self.max] {
            if !value.is_finite() || value < 0.0 {
                return Err(FeedMixError::InvalidBound { dimension, value });
            }
        }
        if self.min > self.max {
            return Err(FeedMixError::InvertedBounds {
                dimension,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Admissible nutrient concentrations of the blend and daily intake mass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NutrientBounds {
    pub protein_min: f64,
    pub protein_max: f64,
    pub energy_min: f64,
    pub energy_max: f64,
    pub fiber_min: f64,
    pub fiber_max: f64,
    pub intake_min: f64,
    pub intake_max: f64,
    /// Desired daily intake before clamping, usually derived from body weight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intake_target: Option<f64>,
}

impl NutrientBounds {
    pub fn new(protein: Range, energy: Range, fiber: Range, intake: Range) -> Self {
        Self {
            protein_min: protein.min,
            protein_max: protein.max,
            energy_min: energy.min,
            energy_max: energy.max,
            fiber_min: fiber.min,
            fiber_max: fiber.max,
            intake_min: intake.min,
            intake_max: intake.max,
            intake_target: None,
        }
    }

    pub fn range(&self, nutrient: Nutrient) -> Range {
        match nutrient {
            Nutrient::Protein => Range::new(self.protein_min, self.protein_max),
            Nutrient::Energy => Range::new(self.energy_min, self.energy_max),
            Nutrient::Fiber => Range::new(self.fiber_min, self.fiber_max),
        }
    }

    pub fn intake(&self) -> Range {
        Range::new(self.intake_min, self.intake_max)
    }

    /// Target the intake an animal of this weight eats per day
    pub fn with_body_weight(mut self, weight: f64) -> Result<Self> {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(FeedMixError::InvalidWeight(weight));
        }
        self.intake_target = Some(weight * DAILY_INTAKE_FRACTION);
        Ok(self)
    }

    /// Daily feed mass: the target clamped into the intake range, or the
    /// minimum intake when there is no target
    pub fn total_intake(&self) -> f64 {
        self.intake().clamp(self.intake_target.unwrap_or(self.intake_min))
    }

    pub fn validate(&self) -> Result<()> {
        for nutrient in Nutrient::ALL {
            self.range(nutrient).validate(nutrient.name())?;
        }
        self.intake().validate("intake")?;
        if let Some(target) = self.intake_target {
            if !target.is_finite() || target < 0.0 {
                return Err(FeedMixError::InvalidBound {
                    dimension: "intake target",
                    value: target,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NutritionTargets {
    pub protein: Range,
    pub energy: Range,
    pub fiber: Range,
}

/// Breed profile supplying nutrient targets and intake limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CattleType {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    /// Typical adult weight, kg
    pub average_weight: Range,
    /// Daily feed mass, kg
    pub daily_feed_need: Range,
    /// Average weight gain, kg per day
    pub growth_rate: f64,
    pub optimal_nutrition: NutritionTargets,
}

impl CattleType {
    pub fn bounds(&self) -> NutrientBounds {
        NutrientBounds::new(
            self.optimal_nutrition.protein,
            self.optimal_nutrition.energy,
            self.optimal_nutrition.fiber,
            self.daily_feed_need,
        )
    }

    pub fn bounds_for_weight(&self, weight: f64) -> Result<NutrientBounds> {
        self.bounds().with_body_weight(weight)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(FeedMixError::Malformed("cattle type id must not be blank".to_string()));
        }
        self.bounds().validate()?;
        self.average_weight.validate("average weight")?;
        if !self.growth_rate.is_finite() {
            return Err(FeedMixError::Malformed(format!("growth rate of {}", self.id)));
        }
        Ok(())
    }
}
