//! Archive importer.
//!
//! Reads a JSON export of organizations and upserts each record through the
//! write repository. Work proceeds in fixed-size chunks with bounded
//! concurrency inside each chunk; per-item failures are collected so every
//! bad record is reported, then the run as a whole fails.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use slug::slugify;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{OrganizationsWriteRepo, RepoError, UpsertOrganizationParams};
use crate::domain::entities::YearAppearance;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("archive read failed")]
    Io(#[from] std::io::Error),
    #[error("archive parse failed")]
    Parse(#[from] serde_json::Error),
    #[error("{failed} of {total} records failed to import")]
    RecordsFailed { failed: usize, total: usize },
}

/// One organization as exported by the archive scraper.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveOrganization {
    #[serde(default)]
    pub slug: Option<String>,
    pub name: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default, alias = "description")]
    pub description_html: Option<String>,
    #[serde(default, alias = "logo")]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, alias = "tech_tags", alias = "technologies")]
    pub tech_stack: Vec<String>,
    #[serde(default, alias = "topic_tags")]
    pub topics: Vec<String>,
    /// Year → accepted project count. String keys in the source format.
    #[serde(default, alias = "years")]
    pub appearances: BTreeMap<String, i64>,
}

impl ArchiveOrganization {
    /// Validate and convert into upsert parameters. Years that do not parse
    /// are dropped with a warning rather than failing the record.
    fn into_params(self) -> Result<UpsertOrganizationParams, RepoError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(RepoError::invalid_input("organization name is empty"));
        }

        let slug = match self.slug {
            Some(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => slugify(&name),
        };
        if slug.is_empty() {
            return Err(RepoError::invalid_input(format!(
                "cannot derive a slug for {name:?}"
            )));
        }

        let mut appearances = Vec::with_capacity(self.appearances.len());
        for (year, projects) in self.appearances {
            match year.trim().parse::<i32>() {
                Ok(year) if projects >= 0 => appearances.push(YearAppearance { year, projects }),
                _ => warn!(slug, year, projects, "skipping malformed appearance"),
            }
        }
        appearances.sort_by_key(|a| a.year);

        Ok(UpsertOrganizationParams {
            slug,
            name,
            website: self.website,
            tagline: self.tagline,
            description_html: self.description_html,
            logo_url: self.logo_url,
            categories: self.categories,
            tech_stack: self.tech_stack,
            topics: self.topics,
            appearances,
        })
    }
}

/// Outcome of a completed (successful) import run.
#[derive(Debug, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
}

/// Import every organization from the archive file at `path`.
pub async fn run(
    repo: Arc<dyn OrganizationsWriteRepo>,
    path: &Path,
    chunk_size: usize,
    concurrency: usize,
) -> Result<ImportReport, ImportError> {
    let body = tokio::fs::read(path).await?;
    let archive: Vec<ArchiveOrganization> = serde_json::from_slice(&body)?;
    let total = archive.len();
    info!(total, path = %path.display(), "starting archive import");

    let chunk_size = chunk_size.max(1);
    let concurrency = concurrency.max(1);

    let mut imported = 0;
    let mut failed = 0;
    for chunk in archive.chunks(chunk_size) {
        let mut results = stream::iter(chunk.iter().cloned())
            .map(|org| {
                let repo = repo.clone();
                async move {
                    let slug_hint = org.slug.clone().unwrap_or_else(|| org.name.clone());
                    let outcome = match org.into_params() {
                        Ok(params) => repo.upsert_organization(&params).await.map(|_| ()),
                        Err(err) => Err(err),
                    };
                    (slug_hint, outcome)
                }
            })
            .buffer_unordered(concurrency);

        while let Some((slug, outcome)) = results.next().await {
            match outcome {
                Ok(()) => imported += 1,
                Err(err) => {
                    failed += 1;
                    warn!(slug, error = %err, "record import failed");
                }
            }
        }
    }

    if failed > 0 {
        return Err(ImportError::RecordsFailed { failed, total });
    }

    info!(imported, "archive import complete");
    Ok(ImportReport { imported })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::*;

    #[derive(Default)]
    struct RecordingRepo {
        upserts: Mutex<Vec<UpsertOrganizationParams>>,
        fail_slugs: Vec<&'static str>,
    }

    #[async_trait]
    impl OrganizationsWriteRepo for RecordingRepo {
        async fn upsert_organization(
            &self,
            params: &UpsertOrganizationParams,
        ) -> Result<Uuid, RepoError> {
            if self.fail_slugs.contains(&params.slug.as_str()) {
                return Err(RepoError::Persistence);
            }
            self.upserts.lock().unwrap().push(params.clone());
            Ok(Uuid::new_v4())
        }
    }

    fn archive_file(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("archive.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn imports_well_formed_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = archive_file(
            dir.path(),
            r#"[
                {
                    "name": "Apache Software Foundation",
                    "slug": "apache",
                    "tech_tags": ["Java", "C++"],
                    "years": {"2020": 30, "2021": 28}
                },
                {
                    "name": "My Framework!",
                    "topics": ["web"]
                }
            ]"#,
        );

        let repo = Arc::new(RecordingRepo::default());
        let report = run(repo.clone(), &path, 50, 4).await.unwrap();
        assert_eq!(report, ImportReport { imported: 2 });

        let upserts = repo.upserts.lock().unwrap();
        let apache = upserts.iter().find(|p| p.slug == "apache").unwrap();
        assert_eq!(apache.tech_stack, vec!["Java", "C++"]);
        assert_eq!(
            apache.appearances,
            vec![
                YearAppearance {
                    year: 2020,
                    projects: 30
                },
                YearAppearance {
                    year: 2021,
                    projects: 28
                },
            ]
        );
        // Slug derived from the name when the archive omits it.
        assert!(upserts.iter().any(|p| p.slug == "my-framework"));
    }

    #[tokio::test]
    async fn malformed_years_are_dropped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = archive_file(
            dir.path(),
            r#"[{"name": "Org", "slug": "org", "years": {"20x1": 5, "2021": 5}}]"#,
        );

        let repo = Arc::new(RecordingRepo::default());
        run(repo.clone(), &path, 50, 4).await.unwrap();

        let upserts = repo.upserts.lock().unwrap();
        assert_eq!(upserts[0].appearances.len(), 1);
        assert_eq!(upserts[0].appearances[0].year, 2021);
    }

    #[tokio::test]
    async fn any_failed_record_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = archive_file(
            dir.path(),
            r#"[
                {"name": "Good", "slug": "good"},
                {"name": "Bad", "slug": "bad"},
                {"name": ""}
            ]"#,
        );

        let repo = Arc::new(RecordingRepo {
            fail_slugs: vec!["bad"],
            ..Default::default()
        });
        let err = run(repo.clone(), &path, 2, 2).await.unwrap_err();
        assert!(matches!(
            err,
            ImportError::RecordsFailed {
                failed: 2,
                total: 3
            }
        ));
        // Other records were still attempted.
        assert_eq!(repo.upserts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unparseable_archive_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = archive_file(dir.path(), "not json");

        let repo = Arc::new(RecordingRepo::default());
        assert!(matches!(
            run(repo, &path, 50, 4).await.unwrap_err(),
            ImportError::Parse(_)
        ));
    }
}
