//! Input validation utilities.
//!
//! Member preferences arrive from an upstream CRUD layer whose schema checks
//! the engine does not rely on; rows are re-checked here before they feed an
//! aggregation.

use validator::Validate;

use crate::error::PolisError;

/// Validate a model, returning a PolisError::Validation on failure.
pub fn validate_model<T: Validate>(model: &T) -> Result<(), PolisError> {
    model.validate().map_err(|e| PolisError::Validation {
        message: format_validation_errors(e),
    })
}

/// Format validation errors into a human-readable string.
fn format_validation_errors(errors: validator::ValidationErrors) -> String {
    let mut messages = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for '{field}'"))
            })
        })
        .collect::<Vec<_>>();
    messages.sort();
    messages.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommunitySettings, UserCommunitySettings};
    use uuid::Uuid;

    fn preferences() -> UserCommunitySettings {
        let settings = CommunitySettings::empty(Uuid::now_v7(), Uuid::now_v7());
        UserCommunitySettings::seeded_from(Uuid::now_v7(), Uuid::now_v7(), &settings)
    }

    #[test]
    fn test_valid_preferences_pass() {
        assert!(validate_model(&preferences()).is_ok());
    }

    #[test]
    fn test_out_of_range_quorum_rejected() {
        let mut prefs = preferences();
        prefs.quorum = 140;
        let err = validate_model(&prefs).unwrap_err();
        assert!(err.to_string().contains("quorum must be within 0-100"));
    }
}
