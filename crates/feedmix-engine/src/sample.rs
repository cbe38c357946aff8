//! Seed catalog bundled with the crate: five feeds and three breeds.

use crate::error::Result;
use crate::model::{CattleType, FeedItem};
use crate::source::{parse_cattle_types, parse_feed_catalog, InMemorySource};

pub const FEEDS_JSON: &str = include_str!("../data/feeds.json");
pub const CATTLE_TYPES_JSON: &str = include_str!("../data/cattle_types.json");

pub fn feeds() -> Result<Vec<FeedItem>> {
    parse_feed_catalog(FEEDS_JSON)
}

pub fn cattle_types() -> Result<Vec<CattleType>> {
    parse_cattle_types(CATTLE_TYPES_JSON)
}

pub fn source() -> Result<InMemorySource> {
    Ok(InMemorySource::new(feeds()?, cattle_types()?))
}
