//! Application services layer.

pub mod directory;
pub mod error;
pub mod import;
pub mod invalidation;
pub mod regenerate;
pub mod repos;
pub mod snapshots;
