use thiserror::Error;

/// Domain-level failures, independent of storage or transport.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("no {0} matches the request")]
    NotFound(&'static str),
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("invariant broken: {0}")]
    Invariant(String),
}

impl DomainError {
    pub fn not_found(what: &'static str) -> Self {
        Self::NotFound(what)
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn invariant(detail: impl Into<String>) -> Self {
        Self::Invariant(detail.into())
    }
}
