//! Product extraction for prodex.
//!
//! This crate provides the fetch pipeline, extraction strategies, the strategy
//! registry and the caching engine shared by the CLI.

pub mod classify;
pub mod engine;
pub mod extract;
pub mod fetch;
pub mod registry;

pub use classify::{GarmentCategory, GarmentClass, categorize_garment};
pub use engine::{CacheLookup, ProductEngine};
pub use extract::{BrandExtractor, BrandProfile, DefaultExtractor, ProductDraft, ProductExtractor, StrategyId};
pub use fetch::{FetchClient, Fetcher};
pub use registry::ExtractorRegistry;
