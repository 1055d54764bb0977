//! Client-side query cache.
//!
//! Entries are indexed by a structured [`CacheKey`] and invalidated through
//! [`KeyPattern`]s, so the set of keys a mutation touches is computed by
//! exhaustive matching rather than string prefixes.
//!
//! # Guarantees
//!
//! - At most one fetch per key is in flight; concurrent callers share its
//!   result (or its error).
//! - After [`CacheStore::invalidate`], the next populate fetches again. A fetch
//!   that started before the invalidation never marks the entry fresh.
//! - While a [`WriteBarrier`] covering a key is held, reads of that key wait.
//! - A failed fetch caches nothing and keeps the previous value readable.
//! - A fetch runs to completion on its own task; callers that stop waiting do
//!   not leave the key stuck in flight.
//!
//! ```ignore
//! let recipes = cache
//!     .populate(CacheKey::Recipes(RecipeScope::Mine), move || async move {
//!         client.get_all().await
//!     })
//!     .await?;
//!
//! if recipes.was_cache_hit() { /* served without a request */ }
//! ```

pub mod config;
pub mod error;
pub mod freshness;
pub mod key;
pub mod stats;
pub mod store;

pub use config::CacheConfig;
pub use error::CacheError;
pub use freshness::CacheRead;
pub use key::{CacheKey, KeyPattern, RecipeScope};
pub use stats::CacheStats;
pub use store::{CacheStore, WriteBarrier};
