//! WASM bindings for the browser dashboard
//!
//! Inputs and outputs cross the boundary as plain JS objects in the
//! dashboard's camelCase shape; errors become JS strings.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::engine::MixEngine;
use crate::model::{CattleType, FeedItem, NutrientBounds};
use crate::sample;
use crate::source::{CattleTypeRecord, FeedRecord, InMemorySource};

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Cheapest mix for explicit bounds and feeds
#[wasm_bindgen]
pub fn compute_optimal_mix(bounds: JsValue, feeds: JsValue) -> Result<JsValue, JsValue> {
    let bounds: NutrientBounds = serde_wasm_bindgen::from_value(bounds).map_err(js_err)?;
    let feeds: Vec<FeedItem> = serde_wasm_bindgen::from_value(feeds).map_err(js_err)?;

    let mix = MixEngine::default()
        .compute_optimal_mix(&bounds, &feeds)
        .map_err(js_err)?;
    to_js(&mix)
}

/// Cheapest mix for a breed, taking feed and cattle type documents as the
/// dashboard stores them
#[wasm_bindgen]
pub fn optimize_for_cattle(
    feeds: JsValue,
    cattle_types: JsValue,
    cattle_type_id: &str,
    weight: f64,
) -> Result<JsValue, JsValue> {
    let feeds: Vec<FeedRecord> = serde_wasm_bindgen::from_value(feeds).map_err(js_err)?;
    let cattle_types: Vec<CattleTypeRecord> = serde_wasm_bindgen::from_value(cattle_types).map_err(js_err)?;

    let feeds = feeds
        .into_iter()
        .map(FeedItem::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(js_err)?;
    let cattle_types = cattle_types
        .into_iter()
        .map(CattleType::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(js_err)?;

    let source = InMemorySource::new(feeds, cattle_types);
    let mix = MixEngine::default()
        .optimize_for(&source, &source, cattle_type_id, weight)
        .map_err(js_err)?;
    to_js(&mix)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SampleCatalog {
    feeds: Vec<FeedItem>,
    cattle_types: Vec<CattleType>,
}

/// The bundled seed feeds and cattle types
#[wasm_bindgen]
pub fn sample_catalog() -> Result<JsValue, JsValue> {
    let catalog = SampleCatalog {
        feeds: sample::feeds().map_err(js_err)?,
        cattle_types: sample::cattle_types().map_err(js_err)?,
    };
    to_js(&catalog)
}
