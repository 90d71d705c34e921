//! Cached reads over the regenerated snapshot files.
//!
//! Technology, topic, and homepage statistics endpoints are served from the
//! static JSON written by `regenerate`, not from the database. Files are read
//! verbatim; the cache keeps hot snapshots off the filesystem.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tracing::warn;

use crate::application::error::AppError;
use crate::cache::{CachedQuery, DataCategory, DurationClass, TagScope, build_tags, classify};
use crate::domain::error::DomainError;

/// Which snapshot family a read targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Tech,
    Topic,
}

impl SnapshotKind {
    fn directory(self) -> &'static str {
        match self {
            SnapshotKind::Tech => "tech",
            SnapshotKind::Topic => "topics",
        }
    }

    fn scope(self) -> TagScope {
        match self {
            SnapshotKind::Tech => TagScope::TechStack,
            SnapshotKind::Topic => TagScope::Topics,
        }
    }

    fn category(self) -> DataCategory {
        match self {
            SnapshotKind::Tech => DataCategory::TechStack,
            SnapshotKind::Topic => DataCategory::Topic,
        }
    }
}

/// Serves pre-rendered JSON snapshots from disk, through the tagged cache.
#[derive(Clone)]
pub struct SnapshotService {
    root: Arc<PathBuf>,
    cache: CachedQuery,
}

impl SnapshotService {
    pub fn new(root: impl Into<PathBuf>, cache: CachedQuery) -> Self {
        Self {
            root: Arc::new(root.into()),
            cache,
        }
    }

    /// `tech/index.json` or `topics/index.json`.
    pub async fn index(&self, kind: SnapshotKind) -> Result<(Bytes, DurationClass), AppError> {
        let class = classify(kind.category(), None);
        let key = format!("{}:index", kind.directory());
        let tags = build_tags(kind.scope(), None);
        let path = self.root.join(kind.directory()).join("index.json");

        let payload = self
            .cache
            .get_or_fetch(&key, &tags, class, || read_snapshot(path))
            .await?;
        Ok((payload, class))
    }

    /// A single tag detail file, e.g. `tech/python.json`.
    pub async fn detail(
        &self,
        kind: SnapshotKind,
        slug: &str,
    ) -> Result<(Bytes, DurationClass), AppError> {
        if !is_valid_slug(slug) {
            // Anything outside the slug alphabet cannot name a snapshot and
            // must never reach the filesystem.
            return Err(DomainError::not_found("snapshot").into());
        }

        let class = classify(kind.category(), None);
        let key = format!("{}:{slug}", kind.directory());
        let tags = build_tags(kind.scope(), Some(slug));
        let path = self.root.join(kind.directory()).join(format!("{slug}.json"));

        let payload = self
            .cache
            .get_or_fetch(&key, &tags, class, || read_snapshot(path))
            .await?;
        Ok((payload, class))
    }

    /// The homepage statistics file. Tagged under organizations so a
    /// directory-wide purge also drops it.
    pub async fn stats(&self) -> Result<(Bytes, DurationClass), AppError> {
        let class = classify(DataCategory::GlobalStats, None);
        let tags = build_tags(TagScope::Organizations, None);
        let path = self.root.join("stats").join("homepage.json");

        let payload = self
            .cache
            .get_or_fetch("stats:homepage", &tags, class, || read_snapshot(path))
            .await?;
        Ok((payload, class))
    }
}

async fn read_snapshot(path: impl AsRef<Path>) -> Result<Bytes, AppError> {
    let path = path.as_ref();
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Bytes::from(bytes)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "snapshot file missing");
            Err(AppError::NotFound)
        }
        Err(err) => Err(crate::infra::error::InfraError::Io(err).into()),
    }
}

/// Snapshot slugs are lowercase ASCII, digits, and hyphens.
fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
