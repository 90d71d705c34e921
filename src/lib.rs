//! orgatlas — a directory and statistics backend for Google Summer of Code
//! organizations.
//!
//! The crate is organized in layers:
//!
//! - [`domain`]: organization records, technology/topic normalization
//! - [`cache`]: tagged, duration-tiered data cache
//! - [`application`]: read services, snapshot regeneration, bulk import
//! - [`infra`]: Postgres repositories, HTTP routers, telemetry
//! - [`config`]: layered settings (file → environment → CLI)

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
