//! Stable record identifiers
//!
//! Two bases are supported and chosen per site:
//! - `UrlSlug`: `<prefix>-<last path segment of the post URL>`
//! - `EmbedHash`: `<prefix>-<first 16 hex chars of SHA-256(canonical embed URL)>`
//!
//! Both are pure functions of their input, so the same post yields the same
//! id on every run and on every machine.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// Number of hex characters kept from the embed URL digest
pub const HASH_ID_LEN: usize = 16;

/// How a site derives record ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityBasis {
    /// Last path segment of the post URL
    UrlSlug,
    /// Digest of the resolved embed URL
    #[default]
    EmbedHash,
}

/// Canonical form of a URL used for hashing and comparison.
///
/// Parsing lowercases the scheme and host and normalizes percent-encoding;
/// the fragment is dropped. Unparseable input is only trimmed.
pub fn canonical_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => trimmed.to_string(),
    }
}

/// Last non-empty path segment of a URL, if any
pub fn url_slug(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(|segment| segment.to_string())
}

/// Hex digest of the canonical embed URL, truncated to [`HASH_ID_LEN`]
pub fn embed_hash(embed_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_url(embed_url).as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..HASH_ID_LEN].to_string()
}

/// Derives ids for one site
#[derive(Debug, Clone)]
pub struct Identifier {
    basis: IdentityBasis,
    prefix: String,
}

impl Identifier {
    pub fn new(basis: IdentityBasis, prefix: impl Into<String>) -> Self {
        Self {
            basis,
            prefix: prefix.into(),
        }
    }

    pub fn basis(&self) -> IdentityBasis {
        self.basis
    }

    /// Id computable before the post page is fetched (slug basis only)
    pub fn for_post(&self, post_url: &str) -> Option<String> {
        match self.basis {
            IdentityBasis::UrlSlug => url_slug(post_url).map(|slug| self.with_prefix(&slug)),
            IdentityBasis::EmbedHash => None,
        }
    }

    /// Id for a resolved post. `None` when the basis input is missing.
    pub fn identify(&self, post_url: &str, embed_url: &str) -> Option<String> {
        match self.basis {
            IdentityBasis::UrlSlug => self.for_post(post_url),
            IdentityBasis::EmbedHash => Some(self.with_prefix(&embed_hash(embed_url))),
        }
    }

    fn with_prefix(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}-{}", self.prefix, key)
        }
    }
}
