//! Application-wide error types.

use thiserror::Error;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uploaded content exceeds the configured ceiling.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Backing object store is unreachable or failed.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::PayloadTooLarge(_) => 413,
            Self::StorageUnavailable(_) => 503,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::PayloadTooLarge(_) => "SIZE_LIMIT_EXCEEDED",
            Self::StorageUnavailable(_) => "STORAGE_ERROR",
            Self::Database(_) => "REGISTRY_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if a retry by the caller may succeed without changes.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_) | Self::Database(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(AppError::NotFound(String::new()).status_code(), 404);
        assert_eq!(AppError::Validation(String::new()).status_code(), 400);
        assert_eq!(AppError::PayloadTooLarge(String::new()).status_code(), 413);
        assert_eq!(
            AppError::StorageUnavailable(String::new()).status_code(),
            503
        );
        assert_eq!(AppError::Database(String::new()).status_code(), 500);
        assert_eq!(AppError::Internal(String::new()).status_code(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::NotFound(String::new()).error_code(), "NOT_FOUND");
        assert_eq!(
            AppError::Validation(String::new()).error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            AppError::PayloadTooLarge(String::new()).error_code(),
            "SIZE_LIMIT_EXCEEDED"
        );
        assert_eq!(
            AppError::StorageUnavailable(String::new()).error_code(),
            "STORAGE_ERROR"
        );
        assert_eq!(
            AppError::Database(String::new()).error_code(),
            "REGISTRY_ERROR"
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AppError::NotFound("msg".into()).to_string(),
            "Not found: msg"
        );
        assert_eq!(
            AppError::PayloadTooLarge("msg".into()).to_string(),
            "Payload too large: msg"
        );
        assert_eq!(
            AppError::StorageUnavailable("msg".into()).to_string(),
            "Storage unavailable: msg"
        );
    }

    #[test]
    fn test_transient_errors() {
        assert!(AppError::StorageUnavailable(String::new()).is_transient());
        assert!(AppError::Database(String::new()).is_transient());
        assert!(!AppError::Validation(String::new()).is_transient());
        assert!(!AppError::NotFound(String::new()).is_transient());
    }
}
