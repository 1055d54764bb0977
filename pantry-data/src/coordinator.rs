//! Runs writes and applies their invalidation after confirmed success.

use pantry_cache::CacheStore;
use pantry_client::ClientError;
use std::future::Future;

use crate::error::DataError;
use crate::graph::MutationKind;

/// Executes mutations against the shared cache.
///
/// Each mutation runs on its own task. Dropping the future returned by
/// [`run`](Self::run) does not cancel a dispatched request, and a later
/// success still invalidates. While the request is in flight, reads of the
/// keys it will invalidate wait for it to resolve.
#[derive(Clone)]
pub struct MutationCoordinator {
    cache: CacheStore<ClientError>,
}

impl MutationCoordinator {
    pub fn new(cache: CacheStore<ClientError>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &CacheStore<ClientError> {
        &self.cache
    }

    /// Run `request` as mutation `kind`.
    ///
    /// On success every key in `kind.invalidates()` is marked stale before the
    /// result is returned. On failure the cache is untouched and the error is
    /// returned unchanged.
    pub async fn run<T, Fut>(&self, kind: MutationKind, request: Fut) -> Result<T, DataError>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let patterns = kind.invalidates();
        let barrier = if patterns.is_empty() {
            None
        } else {
            Some(self.cache.begin_write(patterns.clone()))
        };
        let cache = self.cache.clone();

        let task = tokio::spawn(async move {
            let result = request.await;
            match &result {
                Ok(_) => {
                    let mut invalidated = Vec::new();
                    for pattern in &patterns {
                        invalidated.extend(cache.invalidate(pattern));
                    }
                    let keys: Vec<String> = invalidated.iter().map(ToString::to_string).collect();
                    tracing::info!(mutation = %kind, invalidated = ?keys, "Mutation succeeded");
                }
                Err(err) => {
                    tracing::warn!(mutation = %kind, error = %err, "Mutation failed; cache unchanged");
                }
            }
            drop(barrier);
            result
        });

        match task.await {
            Ok(result) => result.map_err(DataError::from),
            Err(err) => {
                tracing::error!(mutation = %kind, error = %err, "Mutation task aborted");
                Err(DataError::Aborted)
            }
        }
    }
}
