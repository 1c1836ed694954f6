use thiserror::Error;

use crate::application::pagination::PaginationError;
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;
use crate::infra::error::InfraError;

/// Errors surfaced by the content services.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{operation} failed: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: RepoError,
    },
    #[error("operation cancelled")]
    Cancelled,
}

impl ContentError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn store(operation: &'static str, source: RepoError) -> Self {
        Self::Store { operation, source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ContentError::NotFound { .. })
    }
}

impl From<DomainError> for ContentError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::NotFound { entity, id } => Self::NotFound { entity, id },
            DomainError::Validation { .. } => Self::Validation(error.to_string()),
        }
    }
}

impl From<PaginationError> for ContentError {
    fn from(error: PaginationError) -> Self {
        Self::Validation(error.to_string())
    }
}

/// Process-level error reported by the binary before exiting.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_validation_keeps_field_context() {
        let err = ContentError::from(DomainError::validation("post id", "`abc` is not a numeric id"));
        assert_eq!(
            err.to_string(),
            "validation failed: invalid post id: `abc` is not a numeric id"
        );
    }

    #[test]
    fn store_errors_name_the_operation() {
        let err = ContentError::store("list published posts", RepoError::Timeout);
        assert_eq!(err.to_string(), "list published posts failed: database timeout");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn domain_not_found_maps_to_not_found() {
        let err = ContentError::from(DomainError::not_found("post", 4));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "post `4` not found");
    }
}
