//! Read-through cache wrapper.
//!
//! Wraps an async fetch with tagged, time-bound memoization: a live entry is
//! returned without invoking the fetch; a miss runs the fetch and stores the
//! result under the policy's tags and TTL. Fetch failures propagate
//! unchanged and are never cached.
//!
//! Concurrent misses on the same key are not coalesced: each caller fetches,
//! and the last write wins for storage. The underlying data is read-only and
//! idempotent to recompute, so duplicate work is tolerated rather than
//! corrected.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use super::duration::DurationClass;
use super::store::TaggedStore;
use super::tags::CacheTag;

/// Tagged read-through access to a [`TaggedStore`].
///
/// Built with `None` when caching is disabled; every read then degrades to a
/// direct recompute.
#[derive(Clone)]
pub struct CachedQuery {
    store: Option<Arc<TaggedStore>>,
}

impl CachedQuery {
    pub fn new(store: Option<Arc<TaggedStore>>) -> Self {
        Self { store }
    }

    pub fn disabled() -> Self {
        Self { store: None }
    }

    /// Serve `key` from cache or run `fetch` and store its payload.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: &str,
        tags: &[CacheTag],
        class: DurationClass,
        fetch: F,
    ) -> Result<Bytes, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
    {
        if let Some(store) = &self.store {
            if let Some(hit) = store.get(key) {
                debug!(cache_key = key, outcome = "hit", "serving cached payload");
                return Ok(hit);
            }
            debug!(cache_key = key, outcome = "miss", "recomputing payload");
        }

        let payload = fetch().await?;

        if let Some(store) = &self.store {
            store.insert(key, payload.clone(), tags, class.ttl());
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::cache::config::CacheConfig;
    use crate::cache::tags::{TagScope, build_tags};

    fn cached() -> (CachedQuery, Arc<TaggedStore>) {
        let store = Arc::new(TaggedStore::new(&CacheConfig::default()));
        (CachedQuery::new(Some(store.clone())), store)
    }

    #[tokio::test]
    async fn second_call_does_not_invoke_fetch() {
        let (query, _store) = cached();
        let calls = AtomicUsize::new(0);
        let tags = build_tags(TagScope::Organizations, Some("apache"));

        for _ in 0..2 {
            let payload = query
                .get_or_fetch("org:apache", &tags, DurationClass::Long, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, std::convert::Infallible>(Bytes::from_static(b"{}"))
                })
                .await
                .unwrap();
            assert_eq!(payload, Bytes::from_static(b"{}"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidation_forces_refetch() {
        let (query, store) = cached();
        let calls = AtomicUsize::new(0);
        let tags = build_tags(TagScope::Organizations, Some("apache"));

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::convert::Infallible>(Bytes::from_static(b"{}"))
        };

        query
            .get_or_fetch("org:apache", &tags, DurationClass::Long, fetch)
            .await
            .unwrap();
        store.invalidate_tags(&[TagScope::Organizations.member("apache")]);
        query
            .get_or_fetch("org:apache", &tags, DurationClass::Long, fetch)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn errors_propagate_and_are_not_cached() {
        let (query, store) = cached();
        let tags = build_tags(TagScope::Organizations, None);

        let result: Result<Bytes, &str> = query
            .get_or_fetch("search:x", &tags, DurationClass::Short, || async {
                Err("database unavailable")
            })
            .await;

        assert_eq!(result, Err("database unavailable"));
        assert!(store.is_empty());

        // Next call still reaches the fetch and can succeed.
        let payload = query
            .get_or_fetch("search:x", &tags, DurationClass::Short, || async {
                Ok::<_, &str>(Bytes::from_static(b"[]"))
            })
            .await
            .unwrap();
        assert_eq!(payload, Bytes::from_static(b"[]"));
    }

    #[tokio::test]
    async fn disabled_cache_recomputes_every_call() {
        let query = CachedQuery::disabled();
        let calls = AtomicUsize::new(0);
        let tags = build_tags(TagScope::Organizations, None);

        for _ in 0..3 {
            query
                .get_or_fetch("stats:homepage", &tags, DurationClass::Medium, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, std::convert::Infallible>(Bytes::from_static(b"{}"))
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
