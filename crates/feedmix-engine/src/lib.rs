pub mod builder;
pub mod combination;
pub mod engine;
pub mod error;
pub mod formatter;
pub mod model;
pub mod sample;
pub mod source;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use builder::{BoundKind, MixProblem, RowKind};
pub use combination::{CombinationFeed, FeedCombination, NutritionalValues};
pub use engine::{compute_optimal_mix, MixEngine};
pub use error::{FeedMixError, Result};
pub use formatter::{Allocation, EfficiencyPolicy, MixSolution, NutrientViolation, FEASIBILITY_TOLERANCE};
pub use model::{CattleType, FeedItem, Nutrient, NutrientBounds, Nutrients, NutritionTargets, Range};
pub use source::{
    load_cattle_types, load_feed_catalog, parse_cattle_types, parse_feed_catalog, FeedCatalog, InMemorySource,
    JsonFileSource, ProfileSource,
};
