//! Snapshot file shapes and atomic JSON writing.
//!
//! None of these types carry timestamps: an unchanged corpus must produce
//! byte-identical files, and the writer is the last place that guarantee
//! could be broken.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::RegenerateError;

/// Aggregate usage of a tag in one program year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyUsage {
    pub year: i32,
    pub organizations: usize,
    pub projects: i64,
}

/// One organization inside a tag detail file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagOrganization {
    pub slug: String,
    pub name: String,
    pub total_projects: i64,
}

/// `tech/{slug}.json` and `topics/{slug}.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDetail {
    pub slug: String,
    pub display_name: String,
    pub organization_count: usize,
    pub total_projects: i64,
    pub avg_projects_per_org: f64,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    pub usage: Vec<YearlyUsage>,
    pub organizations: Vec<TagOrganization>,
}

/// Index row for one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSummary {
    pub slug: String,
    pub display_name: String,
    pub organization_count: usize,
    pub total_projects: i64,
}

/// A tag ranked by a single integer measure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedTag {
    pub slug: String,
    pub display_name: String,
    pub value: i64,
}

/// A tag ranked by organization-count growth into the latest year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthTag {
    pub slug: String,
    pub display_name: String,
    pub growth_pct: f64,
    pub latest_organizations: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rankings {
    pub top_by_organizations: Vec<RankedTag>,
    pub top_by_projects: Vec<RankedTag>,
    pub fastest_growing: Vec<GrowthTag>,
}

/// `tech/index.json` and `topics/index.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagIndex {
    pub tags: Vec<TagSummary>,
    pub rankings: Rankings,
}

/// One row of the homepage top-organizations list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopOrganization {
    pub slug: String,
    pub name: String,
    pub total_projects: i64,
}

/// `stats/homepage.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomepageStats {
    pub organization_count: usize,
    pub total_projects: i64,
    pub years: Vec<YearlyUsage>,
    pub top_organizations: Vec<TopOrganization>,
}

/// Serialize `value` and atomically replace `path` with it. Readers never
/// observe a partially written file.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), RegenerateError> {
    let parent = path
        .parent()
        .ok_or_else(|| RegenerateError::output(format!("{} has no parent", path.display())))?;
    fs::create_dir_all(parent)?;

    let mut body = serde_json::to_vec_pretty(value)?;
    body.push(b'\n');

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(&body)?;
    temp.persist(path)
        .map_err(|err| RegenerateError::Io(err.error))?;
    Ok(())
}
