//! Hierarchical cache tags and the deterministic tag builder.
//!
//! Tags form a containment hierarchy: `all` covers every entry, a category
//! tag (`organizations`, `years`, …) covers its members, and a member tag
//! (`organization:apache`) covers exactly one key. Entries always carry
//! their full ancestor chain, so purging a parent tag reaches every
//! descendant without the store knowing about the hierarchy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single invalidation label attached to cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheTag(String);

impl CacheTag {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The root tag carried by every entry.
    pub fn all() -> Self {
        Self("all".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Category level of the tag hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagScope {
    Organizations,
    Years,
    Projects,
    TechStack,
    Topics,
}

impl TagScope {
    /// The category-level tag name.
    pub fn category(self) -> &'static str {
        match self {
            TagScope::Organizations => "organizations",
            TagScope::Years => "years",
            TagScope::Projects => "projects",
            TagScope::TechStack => "tech-stack",
            TagScope::Topics => "topics",
        }
    }

    /// Prefix used for member tags within this category.
    fn member_prefix(self) -> &'static str {
        match self {
            TagScope::Organizations => "organization",
            TagScope::Years => "year",
            TagScope::Projects => "project",
            TagScope::TechStack => "tech-stack",
            TagScope::Topics => "topic",
        }
    }

    /// Member tag for a specific key, e.g. `organization:apache`.
    pub fn member(self, key: &str) -> CacheTag {
        CacheTag(format!("{}:{}", self.member_prefix(), key))
    }
}

/// Full tag set for an entry: most general first, always `all` and the
/// category tag, plus the member tag when a key is present. Deterministic in
/// (scope, key), so re-registering an entry is idempotent.
pub fn build_tags(scope: TagScope, key: Option<&str>) -> Vec<CacheTag> {
    let mut tags = vec![CacheTag::all(), CacheTag::new(scope.category())];
    if let Some(key) = key {
        tags.push(scope.member(key));
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_always_include_all_and_category() {
        for scope in [
            TagScope::Organizations,
            TagScope::Years,
            TagScope::Projects,
            TagScope::TechStack,
            TagScope::Topics,
        ] {
            let tags = build_tags(scope, None);
            assert_eq!(tags.len(), 2);
            assert_eq!(tags[0], CacheTag::all());
            assert_eq!(tags[1].as_str(), scope.category());
        }
    }

    #[test]
    fn member_tag_present_iff_key_given() {
        let without = build_tags(TagScope::Organizations, None);
        assert!(!without.iter().any(|t| t.as_str().contains(':')));

        let with = build_tags(TagScope::Organizations, Some("apache"));
        assert_eq!(with.len(), 3);
        assert_eq!(with[2].as_str(), "organization:apache");
    }

    #[test]
    fn tag_sets_are_deterministic() {
        let first = build_tags(TagScope::Years, Some("2020"));
        let second = build_tags(TagScope::Years, Some("2020"));
        assert_eq!(first, second);
    }

    #[test]
    fn member_prefixes_follow_hierarchy_naming() {
        assert_eq!(
            TagScope::Years.member("2016").as_str(),
            "year:2016"
        );
        assert_eq!(
            TagScope::TechStack.member("cpp").as_str(),
            "tech-stack:cpp"
        );
        assert_eq!(TagScope::Topics.member("web").as_str(), "topic:web");
    }
}
