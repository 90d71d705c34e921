//! Organizations table access.

use async_trait::async_trait;
use sqlx::{FromRow, Postgres, QueryBuilder, types::Json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    OrganizationQueryFilter, OrganizationsRepo, OrganizationsWriteRepo, RepoError,
    UpsertOrganizationParams,
};
use crate::domain::entities::{OrganizationRecord, OrganizationSummary, YearAppearance};

use super::PostgresRepositories;

const COLUMNS: &str = "id, slug, name, website, tagline, description_html, logo_url, \
     categories, tech_stack, topics, appearances, created_at, updated_at";

#[derive(FromRow)]
struct OrganizationRow {
    id: Uuid,
    slug: String,
    name: String,
    website: Option<String>,
    tagline: Option<String>,
    description_html: Option<String>,
    logo_url: Option<String>,
    categories: Vec<String>,
    tech_stack: Vec<String>,
    topics: Vec<String>,
    appearances: Json<Vec<YearAppearance>>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<OrganizationRow> for OrganizationRecord {
    fn from(row: OrganizationRow) -> Self {
        let mut appearances = row.appearances.0;
        appearances.sort_by_key(|a| a.year);
        Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            website: row.website,
            tagline: row.tagline,
            description_html: row.description_html,
            logo_url: row.logo_url,
            categories: row.categories,
            tech_stack: row.tech_stack,
            topics: row.topics,
            appearances,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `%`, `_`, and `\` are pattern metacharacters under ILIKE; search input is
/// literal text, so a bare `%` must not match every row.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn apply_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q OrganizationQueryFilter) {
    if let Some(year) = filter.year {
        qb.push(" AND appearances @> ");
        qb.push_bind(Json(serde_json::json!([{ "year": year }])));
    }

    if let Some(search) = filter.search.as_ref() {
        let pattern = format!("%{}%", escape_like(search));
        qb.push(" AND (name ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR slug ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR tagline ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }

    if let Some(category) = filter.category.as_ref() {
        qb.push(" AND ");
        qb.push_bind(category);
        qb.push(" = ANY(categories)");
    }
}

#[async_trait]
impl OrganizationsRepo for PostgresRepositories {
    async fn list_organizations(
        &self,
        filter: &OrganizationQueryFilter,
    ) -> Result<Vec<OrganizationSummary>, RepoError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM organizations WHERE 1=1"));
        apply_filter(&mut qb, filter);
        qb.push(" ORDER BY name ASC, slug ASC");

        let rows: Vec<OrganizationRow> = qb
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(|err| RepoError::from_persistence("organizations.list", err))?;

        Ok(rows
            .into_iter()
            .map(OrganizationRecord::from)
            .map(|record| OrganizationSummary::from(&record))
            .collect())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<OrganizationRecord, RepoError> {
        let row: Option<OrganizationRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM organizations WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(|err| RepoError::from_persistence("organizations.find_by_slug", err))?;

        row.map(OrganizationRecord::from).ok_or(RepoError::NotFound)
    }

    async fn list_all(&self) -> Result<Vec<OrganizationRecord>, RepoError> {
        let rows: Vec<OrganizationRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM organizations ORDER BY slug ASC"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(|err| RepoError::from_persistence("organizations.list_all", err))?;

        Ok(rows.into_iter().map(OrganizationRecord::from).collect())
    }
}

#[async_trait]
impl OrganizationsWriteRepo for PostgresRepositories {
    async fn upsert_organization(
        &self,
        params: &UpsertOrganizationParams,
    ) -> Result<Uuid, RepoError> {
        sqlx::query_scalar(
            "INSERT INTO organizations \
                 (id, slug, name, website, tagline, description_html, logo_url, \
                  categories, tech_stack, topics, appearances, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now(), now()) \
             ON CONFLICT (slug) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 website = EXCLUDED.website, \
                 tagline = EXCLUDED.tagline, \
                 description_html = EXCLUDED.description_html, \
                 logo_url = EXCLUDED.logo_url, \
                 categories = EXCLUDED.categories, \
                 tech_stack = EXCLUDED.tech_stack, \
                 topics = EXCLUDED.topics, \
                 appearances = EXCLUDED.appearances, \
                 updated_at = now() \
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(&params.slug)
        .bind(&params.name)
        .bind(&params.website)
        .bind(&params.tagline)
        .bind(&params.description_html)
        .bind(&params.logo_url)
        .bind(&params.categories)
        .bind(&params.tech_stack)
        .bind(&params.topics)
        .bind(Json(&params.appearances))
        .fetch_one(self.pool())
        .await
        .map_err(|err| RepoError::from_persistence("organizations.upsert", err))
    }
}
