//! Tagged, duration-tiered data cache.
//!
//! Every cached entry carries a set of hierarchical tags (`all` ⊇
//! `organizations` ⊇ `organization:{slug}`) and a duration class mapping to a
//! fixed TTL. Reads go through [`CachedQuery`]; invalidation purges by tag
//! through [`TaggedStore`].
//!
//! ## Configuration
//!
//! Controlled via `orgatlas.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! entry_limit = 4096
//! ```

mod config;
mod duration;
mod lock;
mod query;
mod store;
mod tags;

pub use config::CacheConfig;
pub use duration::{DataCategory, DurationClass, classify, classify_at};
pub use query::CachedQuery;
pub use store::TaggedStore;
pub use tags::{CacheTag, TagScope, build_tags};
