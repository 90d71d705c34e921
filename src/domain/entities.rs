//! Organization records and their per-year participation data.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// One year of program participation for an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearAppearance {
    pub year: i32,
    /// Number of accepted projects in that year.
    pub projects: i64,
}

/// A mentoring organization as stored in the database.
///
/// `tech_stack` and `topics` hold the raw tags as imported from the archive;
/// canonicalization to slugs happens in [`crate::domain::slug`] at
/// aggregation time so re-importing never loses the original spelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationRecord {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub website: Option<String>,
    pub tagline: Option<String>,
    pub description_html: Option<String>,
    pub logo_url: Option<String>,
    pub categories: Vec<String>,
    pub tech_stack: Vec<String>,
    pub topics: Vec<String>,
    /// Sorted ascending by year; at most one entry per year.
    pub appearances: Vec<YearAppearance>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl OrganizationRecord {
    pub fn first_year(&self) -> Option<i32> {
        self.appearances.first().map(|a| a.year)
    }

    pub fn last_year(&self) -> Option<i32> {
        self.appearances.last().map(|a| a.year)
    }

    pub fn total_projects(&self) -> i64 {
        self.appearances.iter().map(|a| a.projects).sum()
    }

    pub fn projects_in(&self, year: i32) -> i64 {
        self.appearances
            .iter()
            .find(|a| a.year == year)
            .map(|a| a.projects)
            .unwrap_or(0)
    }

    pub fn appeared_in(&self, year: i32) -> bool {
        self.appearances.iter().any(|a| a.year == year)
    }
}

/// Compact organization view for list endpoints and snapshot files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub slug: String,
    pub name: String,
    pub logo_url: Option<String>,
    pub categories: Vec<String>,
    pub total_projects: i64,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
}

impl From<&OrganizationRecord> for OrganizationSummary {
    fn from(record: &OrganizationRecord) -> Self {
        Self {
            slug: record.slug.clone(),
            name: record.name.clone(),
            logo_url: record.logo_url.clone(),
            categories: record.categories.clone(),
            total_projects: record.total_projects(),
            first_year: record.first_year(),
            last_year: record.last_year(),
        }
    }
}
