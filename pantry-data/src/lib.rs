//! Recipe data-access layer.
//!
//! Reads go through [`Query`] hooks backed by the shared cache. Writes go
//! through the [`MutationCoordinator`], which invalidates the keys declared by
//! [`MutationKind::invalidates`] once the server confirms success.

pub mod api;
pub mod coordinator;
pub mod error;
pub mod graph;
pub mod layer;
pub mod mutation;
pub mod query;

pub use api::RecipeApi;
pub use coordinator::MutationCoordinator;
pub use error::DataError;
pub use graph::MutationKind;
pub use layer::RecipeDataLayer;
pub use mutation::{Mutation, MutationStatus};
pub use query::Query;
