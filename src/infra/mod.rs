//! Infrastructure: database access, HTTP surfaces, telemetry.

pub mod db;
pub mod error;
pub mod http;
pub mod telemetry;
