//! Snapshot regenerator tests: output layout, determinism, and aggregation
//! semantics over a fake corpus.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use orgatlas::application::regenerate;
use orgatlas::application::repos::{
    OrganizationQueryFilter, OrganizationsRepo, RepoError,
};
use orgatlas::domain::entities::{OrganizationRecord, OrganizationSummary, YearAppearance};

struct FixedRepo {
    records: Vec<OrganizationRecord>,
}

#[async_trait]
impl OrganizationsRepo for FixedRepo {
    async fn list_organizations(
        &self,
        _filter: &OrganizationQueryFilter,
    ) -> Result<Vec<OrganizationSummary>, RepoError> {
        Ok(self.records.iter().map(OrganizationSummary::from).collect())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<OrganizationRecord, RepoError> {
        self.records
            .iter()
            .find(|r| r.slug == slug)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn list_all(&self) -> Result<Vec<OrganizationRecord>, RepoError> {
        Ok(self.records.clone())
    }
}

struct FailingRepo;

#[async_trait]
impl OrganizationsRepo for FailingRepo {
    async fn list_organizations(
        &self,
        _filter: &OrganizationQueryFilter,
    ) -> Result<Vec<OrganizationSummary>, RepoError> {
        Err(RepoError::Persistence)
    }

    async fn find_by_slug(&self, _slug: &str) -> Result<OrganizationRecord, RepoError> {
        Err(RepoError::Persistence)
    }

    async fn list_all(&self) -> Result<Vec<OrganizationRecord>, RepoError> {
        Err(RepoError::Persistence)
    }
}

fn org(
    slug: &str,
    tech: &[&str],
    topics: &[&str],
    years: &[(i32, i64)],
) -> OrganizationRecord {
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
        topics: topics.iter().map(|t| t.to_string()).collect(),
        appearances: years
            .iter()
            .map(|&(year, projects)| YearAppearance { year, projects })
            .collect(),
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

fn corpus() -> Vec<OrganizationRecord> {
    vec![
        org(
            "apache",
            &["Java", "C++", "Python"],
            &["big data"],
            &[(2023, 30), (2024, 28)],
        ),
        org(
            "mozilla",
            &["c++", "Rust", "JS"],
            &["Web"],
            &[(2023, 12), (2024, 15)],
        ),
        org(
            "sympy",
            &["python", "C/C++"],
            &["web"],
            &[(2024, 9)],
        ),
    ]
}

/// All regular files under `root`, keyed by relative path.
fn read_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let relative = path.strip_prefix(root).unwrap().display().to_string();
                files.insert(relative, std::fs::read(&path).unwrap());
            }
        }
    }
    files
}

#[tokio::test]
async fn writes_the_full_snapshot_layout() {
    let repo = FixedRepo { records: corpus() };
    let dir = tempfile::tempdir().unwrap();

    let report = regenerate::run(&repo, dir.path()).await.unwrap();
    assert_eq!(report.organizations, 3);

    let tree = read_tree(dir.path());
    assert!(tree.contains_key("tech/index.json"));
    assert!(tree.contains_key("tech/cpp.json"));
    assert!(tree.contains_key("tech/python.json"));
    assert!(tree.contains_key("topics/index.json"));
    assert!(tree.contains_key("topics/web.json"));
    assert!(tree.contains_key("stats/homepage.json"));
}

#[tokio::test]
async fn unchanged_corpus_produces_byte_identical_output() {
    let repo = FixedRepo { records: corpus() };
    let first_dir = tempfile::tempdir().unwrap();
    let second_dir = tempfile::tempdir().unwrap();

    regenerate::run(&repo, first_dir.path()).await.unwrap();
    regenerate::run(&repo, second_dir.path()).await.unwrap();
    // Also re-run over an existing tree; atomic replace must not drift.
    regenerate::run(&repo, first_dir.path()).await.unwrap();

    assert_eq!(read_tree(first_dir.path()), read_tree(second_dir.path()));
}

#[tokio::test]
async fn tech_spellings_collapse_into_canonical_slugs() {
    let repo = FixedRepo { records: corpus() };
    let dir = tempfile::tempdir().unwrap();
    regenerate::run(&repo, dir.path()).await.unwrap();

    // "C++", "c++", and "C/C++" all land in cpp.json.
    let cpp: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("tech/cpp.json")).unwrap()).unwrap();
    assert_eq!(cpp["organization_count"], 3);

    // "big data" slugifies; no file is written for the raw spelling.
    assert!(dir.path().join("topics/big-data.json").exists());
    assert!(!dir.path().join("topics/big data.json").exists());
}

#[tokio::test]
async fn index_lists_exactly_the_written_detail_files() {
    let repo = FixedRepo { records: corpus() };
    let dir = tempfile::tempdir().unwrap();
    regenerate::run(&repo, dir.path()).await.unwrap();

    let index: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("tech/index.json")).unwrap())
            .unwrap();

    for tag in index["tags"].as_array().unwrap() {
        let slug = tag["slug"].as_str().unwrap();
        assert!(
            dir.path().join(format!("tech/{slug}.json")).exists(),
            "index lists {slug} but no detail file exists"
        );
    }

    let detail_files = std::fs::read_dir(dir.path().join("tech")).unwrap().count();
    // index.json itself plus one file per indexed tag.
    assert_eq!(detail_files, index["tags"].as_array().unwrap().len() + 1);
}

#[tokio::test]
async fn fastest_growing_needs_three_orgs_in_the_latest_year() {
    // cpp reaches 3 orgs in 2024 from 2 in 2023 (+50%). python only reaches
    // 2 orgs in 2024, java/rust/js stay at 1, so every other tag is below
    // the floor.
    let repo = FixedRepo { records: corpus() };
    let dir = tempfile::tempdir().unwrap();
    regenerate::run(&repo, dir.path()).await.unwrap();

    let index: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("tech/index.json")).unwrap())
            .unwrap();
    let growing: Vec<&str> = index["rankings"]["fastest_growing"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["slug"].as_str().unwrap())
        .collect();

    assert_eq!(growing, vec!["cpp"]);
}

#[tokio::test]
async fn dropped_tags_do_not_leave_stale_detail_files() {
    let dir = tempfile::tempdir().unwrap();
    let full = FixedRepo { records: corpus() };
    regenerate::run(&full, dir.path()).await.unwrap();
    assert!(dir.path().join("tech/rust.json").exists());

    // Mozilla leaves the corpus, taking rust and javascript with it.
    let shrunk = FixedRepo {
        records: corpus()
            .into_iter()
            .filter(|r| r.slug != "mozilla")
            .collect(),
    };
    regenerate::run(&shrunk, dir.path()).await.unwrap();

    assert!(!dir.path().join("tech/rust.json").exists());
    assert!(!dir.path().join("tech/javascript.json").exists());
    assert!(dir.path().join("tech/cpp.json").exists());

    let index: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("tech/index.json")).unwrap())
            .unwrap();
    let detail_files = std::fs::read_dir(dir.path().join("tech")).unwrap().count();
    assert_eq!(detail_files, index["tags"].as_array().unwrap().len() + 1);
}

#[tokio::test]
async fn repository_failure_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let err = regenerate::run(&FailingRepo, dir.path()).await.unwrap_err();
    assert!(matches!(err, regenerate::RegenerateError::Repo(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn homepage_stats_carry_totals_and_top_orgs() {
    let repo = FixedRepo { records: corpus() };
    let dir = tempfile::tempdir().unwrap();
    regenerate::run(&repo, dir.path()).await.unwrap();

    let stats: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("stats/homepage.json")).unwrap())
            .unwrap();

    assert_eq!(stats["organization_count"], 3);
    assert_eq!(stats["total_projects"], 94);
    assert_eq!(stats["top_organizations"][0]["slug"], "apache");

    let years = stats["years"].as_array().unwrap();
    assert_eq!(years[0]["year"], 2023);
    assert_eq!(years[0]["organizations"], 2);
    assert_eq!(years[1]["projects"], 52);
}
