//! Centralized error types for Polis.
//!
//! Uses `thiserror` for ergonomic error definitions. The engine never talks to
//! end users directly, so variants carry enough context for an operator log
//! line and a stable code for whichever layer invoked the trigger.

/// Core error type used across all Polis crates.
#[derive(Debug, thiserror::Error)]
pub enum PolisError {
    // === Resource errors ===
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// Immutable reference data (system category, status rows, …) is absent.
    #[error("Missing reference data: {reference}")]
    MissingReference { reference: String },

    // === Validation errors ===
    #[error("Validation failed: {message}")]
    Validation { message: String },

    // === Infrastructure errors ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PolisError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn missing_reference(reference: impl Into<String>) -> Self {
        Self::MissingReference {
            reference: reference.into(),
        }
    }

    /// Error code string for programmatic handling by callers.
    pub fn error_code(&self) -> &str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::MissingReference { .. } => "MISSING_REFERENCE",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Convenience type alias for Results using PolisError.
pub type PolisResult<T> = Result<T, PolisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(PolisError::not_found("Ballot").error_code(), "NOT_FOUND");
        assert_eq!(
            PolisError::missing_reference("system category").error_code(),
            "MISSING_REFERENCE"
        );
        assert_eq!(
            PolisError::not_found("Ballot").to_string(),
            "Ballot not found"
        );
    }
}
