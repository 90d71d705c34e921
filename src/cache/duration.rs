//! Duration classes and the year-aware classifier.
//!
//! Each data category maps to a named TTL tier. Year-scoped data is the only
//! time-sensitive case: a year at least two years in the past is immutable,
//! everything else ages out daily. The boundary is evaluated against
//! wall-clock UTC on every call — "historical-ness" of a year flips exactly
//! once, and a frozen snapshot of `now` would miss that crossing.

use std::time::Duration;

use time::OffsetDateTime;

const SECS_IMMUTABLE: u64 = 31_536_000;
const SECS_LONG: u64 = 2_592_000;
const SECS_MEDIUM: u64 = 604_800;
const SECS_SHORT: u64 = 3_600;
const SECS_CURRENT_YEAR: u64 = 86_400;

/// What kind of data a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataCategory {
    /// Year-scoped listings and aggregates.
    Year,
    /// A single organization record.
    Organization,
    /// Site-wide aggregates (homepage summary).
    GlobalStats,
    /// Search and filter results.
    Search,
    /// Technology snapshot reads.
    TechStack,
    /// Topic snapshot reads.
    Topic,
}

/// Named TTL tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationClass {
    Immutable,
    Long,
    Medium,
    Short,
    CurrentYear,
    NoCache,
}

impl DurationClass {
    pub fn ttl_seconds(self) -> u64 {
        match self {
            DurationClass::Immutable => SECS_IMMUTABLE,
            DurationClass::Long => SECS_LONG,
            DurationClass::Medium => SECS_MEDIUM,
            DurationClass::Short => SECS_SHORT,
            DurationClass::CurrentYear => SECS_CURRENT_YEAR,
            DurationClass::NoCache => 0,
        }
    }

    pub fn ttl(self) -> Duration {
        Duration::from_secs(self.ttl_seconds())
    }

    /// `Cache-Control` header value emitted for responses of this class.
    pub fn cache_control(self) -> &'static str {
        match self {
            DurationClass::Immutable => {
                "public, s-maxage=31536000, stale-while-revalidate=604800"
            }
            DurationClass::Long => "public, s-maxage=2592000, stale-while-revalidate=604800",
            DurationClass::Medium => "public, s-maxage=604800, stale-while-revalidate=86400",
            DurationClass::Short => "public, s-maxage=3600, stale-while-revalidate=86400",
            DurationClass::CurrentYear => "public, s-maxage=86400, stale-while-revalidate=3600",
            DurationClass::NoCache => "no-store, no-cache, must-revalidate",
        }
    }
}

/// Classify a data category (and, for year-scoped data, a year) into a
/// duration class against wall-clock UTC.
pub fn classify(category: DataCategory, year: Option<i32>) -> DurationClass {
    classify_at(category, year, OffsetDateTime::now_utc().year())
}

/// Classification against an explicit "current year"; [`classify`] is the
/// wall-clock entry point.
pub fn classify_at(category: DataCategory, year: Option<i32>, current_year: i32) -> DurationClass {
    match category {
        DataCategory::Year => match year {
            // Out-of-range or missing years stay on the short-lived tier
            // rather than failing the request.
            Some(y) if is_historical(y, current_year) => DurationClass::Immutable,
            _ => DurationClass::CurrentYear,
        },
        DataCategory::Organization => DurationClass::Long,
        DataCategory::GlobalStats => DurationClass::Medium,
        DataCategory::Search => DurationClass::Short,
        DataCategory::TechStack | DataCategory::Topic => DurationClass::Long,
    }
}

/// A year is historical once it is at least two years stale.
fn is_historical(year: i32, current_year: i32) -> bool {
    year < current_year - 1
}
