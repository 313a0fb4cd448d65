//! Imagery source backed by the Earth Engine REST API (`v1`).
//!
//! Listing uses `assets:listImages`, reductions go through `value:compute`
//! with a serialized `Image.reduceRegion` expression, and exports are
//! `image:export` operations polled through `operations.get`.

mod client;
mod expr;
mod models;

pub use client::{EarthEngineConfig, EarthEngineSource};
