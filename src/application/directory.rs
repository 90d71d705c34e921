//! Directory reads: organization lists, single organizations, year views.
//!
//! Every read goes through the tagged cache; payloads are stored as
//! serialized JSON so a cache hit never touches serde or the database.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use crate::application::error::AppError;
use crate::application::repos::{OrganizationQueryFilter, OrganizationsRepo};
use crate::cache::{CachedQuery, DataCategory, DurationClass, TagScope, build_tags, classify};
use crate::domain::entities::{OrganizationRecord, OrganizationSummary};

/// Organizations that participated in one program year.
#[derive(Debug, Serialize)]
pub struct YearView {
    pub year: i32,
    pub organization_count: usize,
    pub total_projects: i64,
    pub organizations: Vec<OrganizationSummary>,
}

/// Full organization view exposed by the detail endpoint.
#[derive(Debug, Serialize)]
pub struct OrganizationDetail {
    pub slug: String,
    pub name: String,
    pub website: Option<String>,
    pub tagline: Option<String>,
    pub description_html: Option<String>,
    pub logo_url: Option<String>,
    pub categories: Vec<String>,
    pub tech_stack: Vec<String>,
    pub topics: Vec<String>,
    pub appearances: Vec<crate::domain::entities::YearAppearance>,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    pub total_projects: i64,
}

impl From<&OrganizationRecord> for OrganizationDetail {
    fn from(record: &OrganizationRecord) -> Self {
        Self {
            slug: record.slug.clone(),
            name: record.name.clone(),
            website: record.website.clone(),
            tagline: record.tagline.clone(),
            description_html: record.description_html.clone(),
            logo_url: record.logo_url.clone(),
            categories: record.categories.clone(),
            tech_stack: record.tech_stack.clone(),
            topics: record.topics.clone(),
            appearances: record.appearances.clone(),
            first_year: record.first_year(),
            last_year: record.last_year(),
            total_projects: record.total_projects(),
        }
    }
}

/// Cached read service over the organizations repository.
#[derive(Clone)]
pub struct DirectoryService {
    repo: Arc<dyn OrganizationsRepo>,
    cache: CachedQuery,
}

impl DirectoryService {
    pub fn new(repo: Arc<dyn OrganizationsRepo>, cache: CachedQuery) -> Self {
        Self { repo, cache }
    }

    /// Organization list, optionally filtered. Unfiltered lists live on the
    /// long tier; anything filtered is treated as a search result.
    pub async fn list(
        &self,
        filter: &OrganizationQueryFilter,
    ) -> Result<(Bytes, DurationClass), AppError> {
        let class = if filter.is_empty() {
            classify(DataCategory::Organization, None)
        } else {
            classify(DataCategory::Search, None)
        };

        let key = format!("orgs:{}", filter.cache_key());
        let mut tags = build_tags(TagScope::Organizations, None);
        if let Some(year) = filter.year {
            // Year-filtered lists also fall when that year is purged.
            tags.push(TagScope::Years.member(&year.to_string()));
        }

        let repo = self.repo.clone();
        let filter = filter.clone();
        let payload = self
            .cache
            .get_or_fetch(&key, &tags, class, || async move {
                let summaries = repo.list_organizations(&filter).await?;
                encode(&summaries)
            })
            .await?;

        Ok((payload, class))
    }

    /// Single organization by slug.
    pub async fn organization(&self, slug: &str) -> Result<(Bytes, DurationClass), AppError> {
        let class = classify(DataCategory::Organization, None);
        let key = format!("org:{slug}");
        let tags = build_tags(TagScope::Organizations, Some(slug));

        let repo = self.repo.clone();
        let slug = slug.to_string();
        let payload = self
            .cache
            .get_or_fetch(&key, &tags, class, || async move {
                let record = repo.find_by_slug(&slug).await?;
                encode(&OrganizationDetail::from(&record))
            })
            .await?;

        Ok((payload, class))
    }

    /// Everything that participated in one year. Missing years return an
    /// empty view rather than a 404; the year space is sparse but valid.
    pub async fn year(&self, year: i32) -> Result<(Bytes, DurationClass), AppError> {
        let class = classify(DataCategory::Year, Some(year));
        let key = format!("year:{year}");
        let tags = build_tags(TagScope::Years, Some(&year.to_string()));

        let repo = self.repo.clone();
        let payload = self
            .cache
            .get_or_fetch(&key, &tags, class, || async move {
                let filter = OrganizationQueryFilter {
                    year: Some(year),
                    ..Default::default()
                };
                let organizations = repo.list_organizations(&filter).await?;
                let total_projects = organizations.iter().map(|o| o.total_projects).sum();
                encode(&YearView {
                    year,
                    organization_count: organizations.len(),
                    total_projects,
                    organizations,
                })
            })
            .await?;

        Ok((payload, class))
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Bytes, AppError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|err| AppError::unexpected(format!("response serialization failed: {err}")))
}
