//! Static snapshot regeneration.
//!
//! Reads the whole organization corpus, aggregates technology and topic
//! usage under canonical slugs, and rewrites the snapshot tree. Every file
//! is replaced atomically; any failure aborts the run so a broken corpus
//! never half-overwrites a good snapshot set.

pub mod output;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{OrganizationsRepo, RepoError};
use crate::domain::entities::OrganizationRecord;
use crate::domain::slug::{canonical_tech_slug, canonical_topic_slug};
use output::{
    GrowthTag, HomepageStats, RankedTag, Rankings, TagDetail, TagIndex, TagOrganization,
    TagSummary, TopOrganization, YearlyUsage, write_json_atomic,
};

/// Entries per ranking list.
const RANKING_SIZE: usize = 10;
/// Minimum organizations in the latest year to qualify for the
/// fastest-growing ranking.
const GROWTH_MIN_ORGS: usize = 3;

#[derive(Debug, Error)]
pub enum RegenerateError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("snapshot serialization failed")]
    Serialize(#[from] serde_json::Error),
    #[error("snapshot write failed")]
    Io(#[from] std::io::Error),
    #[error("output layout error: {0}")]
    Output(String),
}

impl RegenerateError {
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output(message.into())
    }
}

/// Counts reported after a successful run.
#[derive(Debug, PartialEq, Eq)]
pub struct RegenerateReport {
    pub organizations: usize,
    pub tech_tags: usize,
    pub topic_tags: usize,
    pub files_written: usize,
}

/// Regenerate the full snapshot tree under `output_dir`.
pub async fn run(
    repo: &dyn OrganizationsRepo,
    output_dir: &Path,
) -> Result<RegenerateReport, RegenerateError> {
    let records = repo.list_all().await?;
    info!(organizations = records.len(), "loaded corpus for regeneration");

    let tech = aggregate(&records, tech_tags, canonical_tech_slug);
    let topics = aggregate(&records, topic_tags, canonical_topic_slug);

    let mut files_written = 0;
    files_written += write_family(&output_dir.join("tech"), &tech)?;
    files_written += write_family(&output_dir.join("topics"), &topics)?;

    write_json_atomic(
        &output_dir.join("stats").join("homepage.json"),
        &homepage_stats(&records),
    )?;
    files_written += 1;

    let report = RegenerateReport {
        organizations: records.len(),
        tech_tags: tech.len(),
        topic_tags: topics.len(),
        files_written,
    };
    info!(
        tech_tags = report.tech_tags,
        topic_tags = report.topic_tags,
        files = report.files_written,
        "snapshot regeneration complete"
    );
    Ok(report)
}

/// Per-tag accumulation. BTree containers keep every traversal ordered, so
/// identical input always serializes identically.
#[derive(Default)]
struct TagAccumulator {
    display_name: String,
    organizations: BTreeMap<String, TagOrganization>,
    yearly_orgs: BTreeMap<i32, BTreeSet<String>>,
    yearly_projects: BTreeMap<i32, i64>,
}

impl TagAccumulator {
    fn absorb(&mut self, record: &OrganizationRecord, display: &str) {
        if self.display_name.is_empty() {
            // Records arrive sorted by slug, so the first spelling wins
            // deterministically.
            self.display_name = display.trim().to_string();
        }
        self.organizations
            .entry(record.slug.clone())
            .or_insert_with(|| TagOrganization {
                slug: record.slug.clone(),
                name: record.name.clone(),
                total_projects: record.total_projects(),
            });
        for appearance in &record.appearances {
            self.yearly_orgs
                .entry(appearance.year)
                .or_default()
                .insert(record.slug.clone());
            *self.yearly_projects.entry(appearance.year).or_default() += appearance.projects;
        }
    }

    fn usage(&self) -> Vec<YearlyUsage> {
        self.yearly_orgs
            .iter()
            .map(|(&year, orgs)| YearlyUsage {
                year,
                organizations: orgs.len(),
                projects: self.yearly_projects.get(&year).copied().unwrap_or(0),
            })
            .collect()
    }

    fn total_projects(&self) -> i64 {
        self.organizations.values().map(|o| o.total_projects).sum()
    }

    fn organizations_in(&self, year: i32) -> usize {
        self.yearly_orgs.get(&year).map_or(0, BTreeSet::len)
    }

    fn detail(&self, slug: &str) -> TagDetail {
        let organization_count = self.organizations.len();
        let total_projects = self.total_projects();
        let avg = if organization_count == 0 {
            0.0
        } else {
            round2(total_projects as f64 / organization_count as f64)
        };

        let mut organizations: Vec<TagOrganization> =
            self.organizations.values().cloned().collect();
        organizations.sort_by(|a, b| {
            b.total_projects
                .cmp(&a.total_projects)
                .then_with(|| a.slug.cmp(&b.slug))
        });

        TagDetail {
            slug: slug.to_string(),
            display_name: self.display_name.clone(),
            organization_count,
            total_projects,
            avg_projects_per_org: avg,
            first_year: self.yearly_orgs.keys().next().copied(),
            last_year: self.yearly_orgs.keys().next_back().copied(),
            usage: self.usage(),
            organizations,
        }
    }
}

fn tech_tags(record: &OrganizationRecord) -> &[String] {
    &record.tech_stack
}

fn topic_tags(record: &OrganizationRecord) -> &[String] {
    &record.topics
}

/// Group records by canonical tag slug. A record counting the same tag under
/// several spellings is counted once per slug.
fn aggregate(
    records: &[OrganizationRecord],
    source: fn(&OrganizationRecord) -> &[String],
    canonicalize: fn(&str) -> Option<String>,
) -> BTreeMap<String, TagAccumulator> {
    let mut tags: BTreeMap<String, TagAccumulator> = BTreeMap::new();

    for record in records {
        let source = source(record);
        let mut seen = BTreeSet::new();
        for raw in source {
            let Some(slug) = canonicalize(raw) else {
                continue;
            };
            if !seen.insert(slug.clone()) {
                continue;
            }
            tags.entry(slug).or_default().absorb(record, raw);
        }
    }

    tags
}

fn write_family(
    dir: &Path,
    tags: &BTreeMap<String, TagAccumulator>,
) -> Result<usize, RegenerateError> {
    let mut written = 0;
    for (slug, acc) in tags {
        write_json_atomic(&dir.join(format!("{slug}.json")), &acc.detail(slug))?;
        written += 1;
    }

    write_json_atomic(&dir.join("index.json"), &build_index(tags))?;
    sweep_stale(dir, tags)?;
    Ok(written + 1)
}

/// Remove detail files for tags that left the corpus. Without the sweep a
/// dropped tag vanishes from the index but its old `{slug}.json` keeps
/// being served.
fn sweep_stale(
    dir: &Path,
    tags: &BTreeMap<String, TagAccumulator>,
) -> Result<(), RegenerateError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name == "index.json" {
            continue;
        }
        let Some(slug) = name.strip_suffix(".json") else {
            continue;
        };
        if !tags.contains_key(slug) {
            info!(slug, "removing stale snapshot file");
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

fn build_index(tags: &BTreeMap<String, TagAccumulator>) -> TagIndex {
    let mut summaries: Vec<TagSummary> = tags
        .iter()
        .map(|(slug, acc)| TagSummary {
            slug: slug.clone(),
            display_name: acc.display_name.clone(),
            organization_count: acc.organizations.len(),
            total_projects: acc.total_projects(),
        })
        .collect();
    summaries.sort_by(|a, b| {
        b.organization_count
            .cmp(&a.organization_count)
            .then_with(|| a.slug.cmp(&b.slug))
    });

    TagIndex {
        tags: summaries,
        rankings: build_rankings(tags),
    }
}

fn build_rankings(tags: &BTreeMap<String, TagAccumulator>) -> Rankings {
    let mut by_orgs: Vec<RankedTag> = tags
        .iter()
        .map(|(slug, acc)| RankedTag {
            slug: slug.clone(),
            display_name: acc.display_name.clone(),
            value: acc.organizations.len() as i64,
        })
        .collect();
    by_orgs.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.slug.cmp(&b.slug)));
    by_orgs.truncate(RANKING_SIZE);

    let mut by_projects: Vec<RankedTag> = tags
        .iter()
        .map(|(slug, acc)| RankedTag {
            slug: slug.clone(),
            display_name: acc.display_name.clone(),
            value: acc.total_projects(),
        })
        .collect();
    by_projects.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.slug.cmp(&b.slug)));
    by_projects.truncate(RANKING_SIZE);

    Rankings {
        top_by_organizations: by_orgs,
        top_by_projects: by_projects,
        fastest_growing: fastest_growing(tags),
    }
}

/// Percentage org-count growth between the penultimate and latest corpus
/// years. Tags absent in the reference year or below the latest-year floor
/// are excluded; a tag that merely held steady still ranks (at 0%).
fn fastest_growing(tags: &BTreeMap<String, TagAccumulator>) -> Vec<GrowthTag> {
    let latest = tags
        .values()
        .filter_map(|acc| acc.yearly_orgs.keys().next_back().copied())
        .max();
    let Some(latest) = latest else {
        return Vec::new();
    };
    let reference = latest - 1;

    let mut growing: Vec<GrowthTag> = tags
        .iter()
        .filter_map(|(slug, acc)| {
            let now = acc.organizations_in(latest);
            let before = acc.organizations_in(reference);
            if now < GROWTH_MIN_ORGS || before == 0 {
                return None;
            }
            let growth = (now as f64 - before as f64) / before as f64 * 100.0;
            Some(GrowthTag {
                slug: slug.clone(),
                display_name: acc.display_name.clone(),
                growth_pct: round2(growth),
                latest_organizations: now,
            })
        })
        .collect();

    growing.sort_by(|a, b| {
        b.growth_pct
            .partial_cmp(&a.growth_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.slug.cmp(&b.slug))
    });
    growing.truncate(RANKING_SIZE);
    growing
}

fn homepage_stats(records: &[OrganizationRecord]) -> HomepageStats {
    let mut yearly_orgs: BTreeMap<i32, usize> = BTreeMap::new();
    let mut yearly_projects: BTreeMap<i32, i64> = BTreeMap::new();
    for record in records {
        for appearance in &record.appearances {
            *yearly_orgs.entry(appearance.year).or_default() += 1;
            *yearly_projects.entry(appearance.year).or_default() += appearance.projects;
        }
    }

    let years = yearly_orgs
        .iter()
        .map(|(&year, &organizations)| YearlyUsage {
            year,
            organizations,
            projects: yearly_projects.get(&year).copied().unwrap_or(0),
        })
        .collect();

    let mut top: Vec<TopOrganization> = records
        .iter()
        .map(|record| TopOrganization {
            slug: record.slug.clone(),
            name: record.name.clone(),
            total_projects: record.total_projects(),
        })
        .collect();
    top.sort_by(|a, b| {
        b.total_projects
            .cmp(&a.total_projects)
            .then_with(|| a.slug.cmp(&b.slug))
    });
    top.truncate(RANKING_SIZE);

    HomepageStats {
        organization_count: records.len(),
        total_projects: records.iter().map(OrganizationRecord::total_projects).sum(),
        years,
        top_organizations: top,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::*;
    use crate::domain::entities::YearAppearance;

    fn record(slug: &str, tech: &[&str], years: &[(i32, i64)]) -> OrganizationRecord {
        OrganizationRecord {
            id: Uuid::nil(),
            slug: slug.to_string(),
            name: slug.to_uppercase(),
            website: None,
            tagline: None,
            description_html: None,
            logo_url: None,
            categories: vec![],
            tech_stack: tech.iter().map(|t| t.to_string()).collect(),
            topics: vec![],
            appearances: years
                .iter()
                .map(|&(year, projects)| YearAppearance { year, projects })
                .collect(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn spellings_of_one_tech_merge_into_one_tag() {
        let records = vec![
            record("a", &["C++"], &[(2020, 2)]),
            record("b", &["c++", "C/C++"], &[(2020, 3)]),
        ];
        let tags = aggregate(&records, tech_tags, canonical_tech_slug);

        assert_eq!(tags.len(), 1);
        let cpp = &tags["cpp"];
        assert_eq!(cpp.organizations.len(), 2);
        // "b" lists two spellings but counts once.
        assert_eq!(cpp.organizations_in(2020), 2);
        assert_eq!(cpp.yearly_projects[&2020], 5);
    }

    #[test]
    fn detail_orders_organizations_by_projects_then_slug() {
        let records = vec![
            record("small", &["python"], &[(2020, 1)]),
            record("big", &["Python"], &[(2020, 9)]),
            record("mid", &["py"], &[(2020, 1)]),
        ];
        let tags = aggregate(&records, tech_tags, canonical_tech_slug);
        let detail = tags["python"].detail("python");

        let slugs: Vec<&str> = detail.organizations.iter().map(|o| o.slug.as_str()).collect();
        assert_eq!(slugs, vec!["big", "mid", "small"]);
        assert_eq!(detail.organization_count, 3);
        assert_eq!(detail.total_projects, 11);
        assert_eq!(detail.avg_projects_per_org, 3.67);
        assert_eq!(detail.first_year, Some(2020));
    }

    #[test]
    fn fastest_growing_excludes_small_and_new_tags() {
        // "python": 2 orgs in 2023, 4 in 2024 -> +100%.
        // "rust": 0 orgs in 2023 (new) -> excluded despite the jump.
        // "go": 2 orgs in 2024 -> below the floor of 3.
        let records = vec![
            record("a", &["python"], &[(2023, 1), (2024, 1)]),
            record("b", &["python"], &[(2023, 1), (2024, 1)]),
            record("c", &["python", "go"], &[(2024, 1)]),
            record("d", &["python", "go"], &[(2024, 1)]),
            record("e", &["rust"], &[(2024, 1)]),
            record("f", &["rust"], &[(2024, 1)]),
            record("g", &["rust"], &[(2024, 1)]),
        ];
        let tags = aggregate(&records, tech_tags, canonical_tech_slug);
        let growing = fastest_growing(&tags);

        assert_eq!(growing.len(), 1);
        assert_eq!(growing[0].slug, "python");
        assert_eq!(growing[0].growth_pct, 100.0);
        assert_eq!(growing[0].latest_organizations, 4);
    }

    #[test]
    fn index_sorted_by_org_count_then_slug() {
        let records = vec![
            record("a", &["python", "zig"], &[(2020, 1)]),
            record("b", &["python", "ada"], &[(2020, 1)]),
        ];
        let index = build_index(&aggregate(&records, tech_tags, canonical_tech_slug));

        let slugs: Vec<&str> = index.tags.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["python", "ada", "zig"]);
    }

    #[test]
    fn homepage_stats_aggregate_years_and_top_orgs() {
        let records = vec![
            record("a", &[], &[(2020, 2), (2021, 3)]),
            record("b", &[], &[(2021, 7)]),
        ];
        let stats = homepage_stats(&records);

        assert_eq!(stats.organization_count, 2);
        assert_eq!(stats.total_projects, 12);
        assert_eq!(
            stats.years,
            vec![
                YearlyUsage {
                    year: 2020,
                    organizations: 1,
                    projects: 2
                },
                YearlyUsage {
                    year: 2021,
                    organizations: 2,
                    projects: 10
                },
            ]
        );
        assert_eq!(stats.top_organizations[0].slug, "b");
    }
}
