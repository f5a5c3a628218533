//! Discovery and extraction pipeline for video listing sites
//!
//! Key components:
//! - `FetchEngine`: HTTP fetching behind the `Fetcher` trait
//! - `PolitenessController`: per-host delay and 429 backoff
//! - `ListingParser`: listing page to post candidates
//! - `EmbedResolver`: post page to embed URL through an ordered strategy chain
//! - `Identifier` / `DedupIndex`: stable ids and catalog membership
//! - `ScrapingCoordinator`: runs the pipeline over the configured sites

pub mod coordinator;
pub mod dedup;
pub mod fetcher;
pub mod identity;
pub mod listing;
pub mod politeness;
pub mod post_meta;
pub mod resolver;

pub use coordinator::{Discovery, PipelineError, RunReport, ScrapingCoordinator, ScrapingStats};
pub use dedup::{DedupIndex, DedupKey};
pub use fetcher::{FetchEngine, FetchError, FetchRequest, FetchResult, Fetcher};
pub use identity::{embed_hash, Identifier, IdentityBasis};
pub use listing::{clean_title, ListingParser};
pub use politeness::{FetchDecision, PolitenessController};
pub use post_meta::PostMetadata;
pub use resolver::{EmbedFallback, EmbedResolver, HostRules, ResolvePolicy};
