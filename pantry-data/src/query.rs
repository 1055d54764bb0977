//! Read hooks: a typed read bound to one cache key.

use futures_util::future::{BoxFuture, FutureExt};
use pantry_cache::{CacheKey, CacheRead, CacheStore};
use pantry_client::ClientError;
use std::future::Future;
use std::sync::Arc;

use crate::error::DataError;

type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ClientError>> + Send + Sync>;

/// A cached read of `T`.
///
/// A query built without its scope parameter (for example a recipe detail
/// with no id yet) is disabled: it never sends a request and resolves to
/// `None`.
pub struct Query<T> {
    key: Option<CacheKey>,
    cache: CacheStore<ClientError>,
    fetcher: Option<Fetcher<T>>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            cache: self.cache.clone(),
            fetcher: self.fetcher.clone(),
        }
    }
}

impl<T> Query<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(cache: CacheStore<ClientError>, key: CacheKey, fetcher: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let fetcher: Fetcher<T> = Arc::new(move || fetcher().boxed());
        Self {
            key: Some(key),
            cache,
            fetcher: Some(fetcher),
        }
    }

    pub fn disabled(cache: CacheStore<ClientError>) -> Self {
        Self {
            key: None,
            cache,
            fetcher: None,
        }
    }

    pub fn key(&self) -> Option<&CacheKey> {
        self.key.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// The value for this key, served from cache when fresh.
    pub async fn fetch(&self) -> Result<Option<T>, DataError> {
        Ok(self.fetch_read().await?.map(CacheRead::into_value))
    }

    /// Like [`fetch`](Self::fetch), keeping the cache metadata.
    pub async fn fetch_read(&self) -> Result<Option<CacheRead<T>>, DataError> {
        let (Some(key), Some(fetcher)) = (self.key, self.fetcher.as_ref()) else {
            return Ok(None);
        };
        let request = fetcher();
        let read = self.cache.populate(key, move || request).await?;
        Ok(Some(read))
    }

    /// Last known value, fresh or stale, without fetching. Waits while a
    /// mutation affecting this key is in flight.
    pub async fn read(&self) -> Option<CacheRead<T>> {
        let key = self.key?;
        self.cache.read(&key).await
    }

    /// Last known value without waiting on pending mutations.
    pub fn peek(&self) -> Option<CacheRead<T>> {
        self.cache.peek(self.key.as_ref()?)
    }

    /// Mark this query stale so the next fetch goes to the network.
    pub fn invalidate(&self) {
        if let Some(key) = self.key {
            self.cache.invalidate(&key.into());
        }
    }
}
