//! Core types for the Pantry recipe client.
//!
//! These mirror the JSON payloads of the recipe service. The client only ever
//! holds transient copies of server-owned entities.

pub mod error;
pub mod identity;
pub mod recipe;
pub mod share;

pub use error::ValidationError;
pub use identity::{RecipeId, UserId};
pub use recipe::{GenerateRecipeRequest, Recipe, SaveRecipeRequest};
pub use share::{CreateShareRequest, Share};

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
