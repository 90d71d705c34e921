use thiserror::Error;

/// Failures in the infrastructure layer: database connectivity, schema
/// migrations, filesystem access, and process bootstrap.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("filesystem: {0}")]
    Io(#[from] std::io::Error),
    #[error("database: {0}")]
    Database(String),
    #[error("migration: {0}")]
    Migration(String),
    #[error("telemetry: {0}")]
    Telemetry(String),
    #[error("configuration: {0}")]
    Configuration(String),
}

impl InfraError {
    pub fn database(detail: impl Into<String>) -> Self {
        Self::Database(detail.into())
    }

    pub fn configuration(detail: impl Into<String>) -> Self {
        Self::Configuration(detail.into())
    }

    pub fn migration(detail: impl Into<String>) -> Self {
        Self::Migration(detail.into())
    }

    pub fn telemetry(detail: impl Into<String>) -> Self {
        Self::Telemetry(detail.into())
    }
}
