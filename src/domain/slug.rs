//! Canonical slugs for technology and topic tags.
//!
//! Imported corpora spell the same technology many ways ("C++", "c++",
//! "C/C++"). Aggregation would fracture across those spellings, so tags are
//! canonicalized through a fixed alias table first and fall back to generic
//! slugification (`slug` crate: lowercase, non-alphanumeric runs become a
//! single hyphen, no leading/trailing hyphens) for names with no alias.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use slug::slugify;

static TECH_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut table = HashMap::new();
    // Keys are the lowercased, trimmed input spellings.
    table.insert("c++", "cpp");
    table.insert("c/c++", "cpp");
    table.insert("cpp", "cpp");
    table.insert("c#", "csharp");
    table.insert("csharp", "csharp");
    table.insert(".net", "dotnet");
    table.insert("dotnet", "dotnet");
    table.insert("node.js", "nodejs");
    table.insert("node js", "nodejs");
    table.insert("node", "nodejs");
    table.insert("nodejs", "nodejs");
    table.insert("js", "javascript");
    table.insert("javascript", "javascript");
    table.insert("ecmascript", "javascript");
    table.insert("ts", "typescript");
    table.insert("typescript", "typescript");
    table.insert("golang", "go");
    table.insert("go", "go");
    table.insert("py", "python");
    table.insert("python", "python");
    table.insert("python3", "python");
    table.insert("objective-c", "objective-c");
    table.insert("objc", "objective-c");
    table.insert("react.js", "react");
    table.insert("reactjs", "react");
    table.insert("react", "react");
    table.insert("vue.js", "vue");
    table.insert("vuejs", "vue");
    table.insert("vue", "vue");
    table.insert("angular.js", "angular");
    table.insert("angularjs", "angular");
    table.insert("angular", "angular");
    table.insert("postgres", "postgresql");
    table.insert("postgresql", "postgresql");
    table.insert("k8s", "kubernetes");
    table.insert("kubernetes", "kubernetes");
    table.insert("html5", "html");
    table.insert("html", "html");
    table.insert("css3", "css");
    table.insert("css", "css");
    table.insert("shell", "shell");
    table.insert("bash", "shell");
    table.insert("machine learning", "machine-learning");
    table.insert("ml", "machine-learning");
    table
});

/// Canonical slug for a technology tag: alias table first, generic
/// slugification otherwise. Returns `None` for inputs that cannot produce a
/// slug (empty or all-symbol names with no alias).
pub fn canonical_tech_slug(name: &str) -> Option<String> {
    let normalized = name.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }

    if let Some(alias) = TECH_ALIASES.get(normalized.as_str()) {
        return Some((*alias).to_string());
    }

    let fallback = slugify(&normalized);
    (!fallback.is_empty()).then_some(fallback)
}

/// Canonical slug for a topic tag. Topics have no alias table; spellings in
/// the corpus are already curated.
pub fn canonical_topic_slug(name: &str) -> Option<String> {
    let candidate = slugify(name.trim());
    (!candidate.is_empty()).then_some(candidate)
}
