//! vidcrawl: discovery and extraction pipeline for video listing sites
//!
//! Turns listing pages into post candidates, post pages into validated embed
//! records, and merges new records into a JSON catalog:
//! - Listing parsing with per-site selector fallbacks and title cleaning
//! - Embed resolution through an ordered strategy chain with ad/tracker filtering
//! - Stable record ids (URL slug or embed URL digest) and idempotent merging
//! - Polite sequential fetching with per-host delay and 429 backoff

pub mod catalog;
pub mod config;
pub mod scraping;
pub mod types;
pub mod util;

pub use catalog::{merge, Catalog, MergeOutcome};
pub use config::Config;
pub use types::*;
