//! Cache invalidation requests.
//!
//! The admin endpoint accepts a typed request and resolves it to the most
//! specific tag that covers the intent. Resolution never widens: purging one
//! organization must not disturb its siblings, and only an explicit `all`
//! request empties the store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::{CacheTag, TagScope, TaggedStore};

/// A typed purge request, as posted to the admin endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InvalidationRequest {
    /// Drop every cached entry.
    All,
    /// Drop entries for one program year.
    Year { year: i32 },
    /// Drop entries for one organization.
    Organization { slug: String },
    /// Drop entries carrying any of the given raw tags.
    Tags { tags: Vec<String> },
}

impl InvalidationRequest {
    /// The exact tags this request purges.
    pub fn resolve(&self) -> Vec<CacheTag> {
        match self {
            InvalidationRequest::All => vec![CacheTag::all()],
            InvalidationRequest::Year { year } => {
                vec![TagScope::Years.member(&year.to_string())]
            }
            InvalidationRequest::Organization { slug } => {
                vec![TagScope::Organizations.member(slug)]
            }
            InvalidationRequest::Tags { tags } => {
                tags.iter().map(CacheTag::new).collect()
            }
        }
    }
}

/// Outcome reported back to the admin caller.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvalidationOutcome {
    pub purged: usize,
    pub tags: Vec<String>,
}

/// Apply a purge request against the store. Purging tags with no entries is
/// a successful no-op.
pub fn apply(store: &Arc<TaggedStore>, request: &InvalidationRequest) -> InvalidationOutcome {
    let tags = request.resolve();
    let purged = match request {
        // `all` is carried by every entry, but clear() also resets the tag
        // index in one pass.
        InvalidationRequest::All => store.clear(),
        _ => store.invalidate_tags(&tags),
    };

    let tags: Vec<String> = tags.into_iter().map(|t| t.to_string()).collect();
    info!(purged, tags = ?tags, "cache invalidation applied");
    InvalidationOutcome { purged, tags }
}
