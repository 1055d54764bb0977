//! Error types for request validation.

use thiserror::Error;

/// Client-side validation errors, raised before a request is dispatched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("At least one non-empty ingredient is required")]
    EmptyIngredients,

    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: &'static str },

    #[error("Invalid email address: {email}")]
    InvalidEmail { email: String },
}
