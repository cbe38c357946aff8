//! Read interfaces onto the feed catalog and the breed profiles.
//!
//! The engine never owns these stores; callers hand it a source and the
//! engine fetches fresh snapshots right before each solve. Failures are
//! passed through unchanged with no retry.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FeedMixError, Result};
use crate::model::{CattleType, FeedItem, NutrientBounds, Nutrients, NutritionTargets, Range};

pub trait FeedCatalog {
    fn fetch_feed_catalog(&self) -> Result<Vec<FeedItem>>;

    fn feeds_by_category(&self, category: &str) -> Result<Vec<FeedItem>> {
        Ok(self
            .fetch_feed_catalog()?
            .into_iter()
            .filter(|f| f.category.as_deref() == Some(category))
            .collect())
    }

    /// Feeds whose unit cost lies in `[min, max]`
    fn feeds_by_price_range(&self, min: f64, max: f64) -> Result<Vec<FeedItem>> {
        Ok(self
            .fetch_feed_catalog()?
            .into_iter()
            .filter(|f| f.unit_cost >= min && f.unit_cost <= max)
            .collect())
    }
}

pub trait ProfileSource {
    fn fetch_cattle_types(&self) -> Result<Vec<CattleType>>;

    /// Bounds for a breed, with the intake targeted at the animal's weight
    fn fetch_nutrient_bounds(&self, cattle_type_id: &str, weight: f64) -> Result<NutrientBounds> {
        self.fetch_cattle_types()?
            .iter()
            .find(|c| c.id == cattle_type_id)
            .ok_or_else(|| FeedMixError::NotFound(cattle_type_id.to_string()))?
            .bounds_for_weight(weight)
    }
}

/// Catalog and profiles held as plain values
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    feeds: Vec<FeedItem>,
    cattle_types: Vec<CattleType>,
}

impl InMemorySource {
    pub fn new(feeds: Vec<FeedItem>, cattle_types: Vec<CattleType>) -> Self {
        Self { feeds, cattle_types }
    }

    pub fn feeds(&self) -> &[FeedItem] {
        &self.feeds
    }

    pub fn cattle_types(&self) -> &[CattleType] {
        &self.cattle_types
    }
}

impl FeedCatalog for InMemorySource {
    fn fetch_feed_catalog(&self) -> Result<Vec<FeedItem>> {
        Ok(self.feeds.clone())
    }
}

impl ProfileSource for InMemorySource {
    fn fetch_cattle_types(&self) -> Result<Vec<CattleType>> {
        Ok(self.cattle_types.clone())
    }
}

/// JSON documents on disk, re-read on every fetch
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    feeds_path: PathBuf,
    cattle_types_path: PathBuf,
}

impl JsonFileSource {
    pub fn new(feeds_path: impl AsRef<Path>, cattle_types_path: impl AsRef<Path>) -> Self {
        Self {
            feeds_path: feeds_path.as_ref().to_path_buf(),
            cattle_types_path: cattle_types_path.as_ref().to_path_buf(),
        }
    }
}

impl FeedCatalog for JsonFileSource {
    fn fetch_feed_catalog(&self) -> Result<Vec<FeedItem>> {
        load_feed_catalog(&self.feeds_path)
    }
}

impl ProfileSource for JsonFileSource {
    fn fetch_cattle_types(&self) -> Result<Vec<CattleType>> {
        load_cattle_types(&self.cattle_types_path)
    }
}

/// Read a feed catalog document from disk
pub fn load_feed_catalog(path: &Path) -> Result<Vec<FeedItem>> {
    let records: Vec<FeedRecord> = read_document(path)?;
    records.into_iter().map(FeedItem::try_from).collect()
}

/// Read a cattle type document from disk
pub fn load_cattle_types(path: &Path) -> Result<Vec<CattleType>> {
    let records: Vec<CattleTypeRecord> = read_document(path)?;
    records.into_iter().map(CattleType::try_from).collect()
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| FeedMixError::Unavailable(format!("{}: {}", path.display(), e)))?;
    let records: Vec<T> = serde_json::from_str(&text)
        .map_err(|e| FeedMixError::Malformed(format!("{}: {}", path.display(), e)))?;
    debug!(path = %path.display(), records = records.len(), "loaded document");
    Ok(records)
}

/// Parse a feed catalog document
pub fn parse_feed_catalog(json: &str) -> Result<Vec<FeedItem>> {
    let records: Vec<FeedRecord> =
        serde_json::from_str(json).map_err(|e| FeedMixError::Malformed(e.to_string()))?;
    records.into_iter().map(FeedItem::try_from).collect()
}

/// Parse a cattle type document
pub fn parse_cattle_types(json: &str) -> Result<Vec<CattleType>> {
    let records: Vec<CattleTypeRecord> =
        serde_json::from_str(json).map_err(|e| FeedMixError::Malformed(e.to_string()))?;
    records.into_iter().map(CattleType::try_from).collect()
}

/// Feed document as the dashboard stores it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FeedRecord {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub nutritional_value: Nutrients,
    pub current_price: f64,
    pub last_updated: Option<String>,
    pub price_change: Option<f64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl TryFrom<FeedRecord> for FeedItem {
    type Error = FeedMixError;

    fn try_from(record: FeedRecord) -> Result<Self> {
        let mut feed = FeedItem::new(
            record.id,
            record.current_price,
            record.nutritional_value.protein,
            record.nutritional_value.energy,
            record.nutritional_value.fiber,
        );
        feed.name = record.name;
        feed.category = record.category;
        if let Some(unit) = record.unit {
            feed.unit = unit;
        }
        feed.validate()?;
        Ok(feed)
    }
}

/// Breed document as the dashboard stores it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CattleTypeRecord {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub average_weight: Range,
    pub daily_feed_need: Range,
    pub growth_rate: f64,
    pub optimal_nutrition: NutritionTargets,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl TryFrom<CattleTypeRecord> for CattleType {
    type Error = FeedMixError;

    fn try_from(record: CattleTypeRecord) -> Result<Self> {
        let cattle = CattleType {
            id: record.id,
            name: record.name,
            category: record.category,
            description: record.description,
            average_weight: record.average_weight,
            daily_feed_need: record.daily_feed_need,
            growth_rate: record.growth_rate,
            optimal_nutrition: record.optimal_nutrition,
        };
        cattle.validate()?;
        Ok(cattle)
    }
}
