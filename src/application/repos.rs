//! Repository traits and errors.
//!
//! The application layer talks to storage through these traits; the Postgres
//! implementations live under `infra::db`.

use async_trait::async_trait;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::domain::entities::{OrganizationRecord, OrganizationSummary, YearAppearance};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence failure")]
    Persistence,
    #[error("duplicate value for constraint {constraint}")]
    Duplicate { constraint: String },
    #[error("record not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("storage timed out")]
    Timeout,
}

impl RepoError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Map a database error onto the repo error taxonomy, logging the
    /// original before it is erased.
    pub fn from_persistence(context: &'static str, err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::PoolTimedOut => {
                error!(context, error = %err, "database pool timed out");
                Self::Timeout
            }
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => Self::Duplicate {
                constraint: db_err.constraint().unwrap_or("unknown").to_string(),
            },
            other => {
                error!(context, error = %other, "database operation failed");
                Self::Persistence
            }
        }
    }
}

/// Filters applied to organization listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationQueryFilter {
    /// Only organizations that participated in this year.
    pub year: Option<i32>,
    /// Case-insensitive substring over name, slug, and tagline.
    pub search: Option<String>,
    /// Exact match against the category list.
    pub category: Option<String>,
}

impl OrganizationQueryFilter {
    pub fn is_empty(&self) -> bool {
        self.year.is_none() && self.search.is_none() && self.category.is_none()
    }

    /// Stable cache key fragment for this filter combination.
    pub fn cache_key(&self) -> String {
        format!(
            "y={};q={};c={}",
            self.year.map(|y| y.to_string()).unwrap_or_default(),
            self.search.as_deref().unwrap_or_default(),
            self.category.as_deref().unwrap_or_default(),
        )
    }
}

/// Field bundle for creating or updating an organization by slug.
#[derive(Debug, Clone)]
pub struct UpsertOrganizationParams {
    pub slug: String,
    pub name: String,
    pub website: Option<String>,
    pub tagline: Option<String>,
    pub description_html: Option<String>,
    pub logo_url: Option<String>,
    pub categories: Vec<String>,
    pub tech_stack: Vec<String>,
    pub topics: Vec<String>,
    pub appearances: Vec<YearAppearance>,
}

/// Read access to the organizations directory.
#[async_trait]
pub trait OrganizationsRepo: Send + Sync {
    async fn list_organizations(
        &self,
        filter: &OrganizationQueryFilter,
    ) -> Result<Vec<OrganizationSummary>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<OrganizationRecord, RepoError>;

    /// Full records, for snapshot regeneration. Ordered by slug.
    async fn list_all(&self) -> Result<Vec<OrganizationRecord>, RepoError>;
}

/// Write access used by the importer.
#[async_trait]
pub trait OrganizationsWriteRepo: Send + Sync {
    /// Insert or update by slug. Returns the stored record's id.
    async fn upsert_organization(
        &self,
        params: &UpsertOrganizationParams,
    ) -> Result<Uuid, RepoError>;
}
