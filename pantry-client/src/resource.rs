//! Typed facade over the gateway for one collection path.

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use std::fmt::Display;
use std::marker::PhantomData;

use crate::error::ClientError;
use crate::gateway::{join_path, RequestGateway};

/// Stateless binding of a collection path to the gateway's verbs.
///
/// Guarantees only type shape; caching and invalidation are composed by
/// callers.
pub struct ResourceClient<T> {
    gateway: RequestGateway,
    path: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            path: self.path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> ResourceClient<T> {
    pub fn new(gateway: RequestGateway, path: impl Into<String>) -> Self {
        Self {
            gateway,
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn gateway(&self) -> &RequestGateway {
        &self.gateway
    }

    /// Client for a sub-collection, e.g. `/api/recipes/{id}/shares`.
    pub fn nested<U: DeserializeOwned>(
        &self,
        id: impl Display,
        segment: &str,
    ) -> Result<ResourceClient<U>, ClientError> {
        let parent = join_path(&self.path, &id.to_string())?;
        let path = join_path(&parent, segment)?;
        Ok(ResourceClient::new(self.gateway.clone(), path))
    }

    pub async fn get_all(&self) -> Result<Vec<T>, ClientError> {
        self.gateway.list(&self.path).await
    }

    pub async fn get(&self, id: impl Display) -> Result<T, ClientError> {
        self.gateway.get(&self.path, id).await
    }

    /// `POST` to the collection, or to `{path}/{subpath}` when given.
    pub async fn post<B, R>(&self, body: &B, subpath: Option<&str>) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.gateway.create(&self.path, body, subpath).await
    }

    pub async fn patch<B>(&self, id: impl Display, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
    {
        self.gateway.update(&self.path, id, body).await
    }

    /// `DELETE {path}/{id}`. Any response body is ignored.
    pub async fn delete(&self, id: impl Display) -> Result<(), ClientError> {
        let _: IgnoredAny = self.gateway.remove(&self.path, id).await?;
        Ok(())
    }
}
