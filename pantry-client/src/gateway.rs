//! The single network egress point.
//!
//! Every request runs through the middleware pipeline, then the transport,
//! then response decoding. There are no retries at this layer.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::credential::CredentialProvider;
use crate::error::ClientError;
use crate::middleware::{BearerAuth, RequestMiddleware};
use crate::request::{ApiRequest, Method};
use crate::transport::{HttpTransport, Transport};

/// Credentialed, typed access to the API.
///
/// Cheap to clone; clones share the transport and pipeline.
#[derive(Clone)]
pub struct RequestGateway {
    transport: Arc<dyn Transport>,
    middleware: Arc<[Arc<dyn RequestMiddleware>]>,
}

/// Builder for a [`RequestGateway`] with a custom middleware pipeline.
pub struct GatewayBuilder {
    transport: Arc<dyn Transport>,
    middleware: Vec<Arc<dyn RequestMiddleware>>,
}

impl GatewayBuilder {
    /// Append a middleware. Middleware runs in insertion order.
    pub fn middleware(mut self, middleware: Arc<dyn RequestMiddleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Append [`BearerAuth`] backed by `credentials`.
    pub fn bearer_auth(self, credentials: CredentialProvider) -> Self {
        self.middleware(Arc::new(BearerAuth::new(credentials)))
    }

    pub fn build(self) -> RequestGateway {
        RequestGateway {
            transport: self.transport,
            middleware: self.middleware.into(),
        }
    }
}

impl RequestGateway {
    pub fn builder(transport: Arc<dyn Transport>) -> GatewayBuilder {
        GatewayBuilder {
            transport,
            middleware: Vec::new(),
        }
    }

    /// Standard gateway: bearer credentials on every request.
    pub fn new(transport: Arc<dyn Transport>, credentials: CredentialProvider) -> Self {
        Self::builder(transport).bearer_auth(credentials).build()
    }

    /// HTTP gateway for the configured origin.
    pub fn from_config(
        config: &ClientConfig,
        credentials: CredentialProvider,
    ) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), credentials))
    }

    /// Run the pipeline, dispatch, and decode the response.
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let mut request = request;
        for middleware in self.middleware.iter() {
            request = middleware.apply(request).await;
        }

        let method = request.method;
        let path = request.path.clone();
        tracing::debug!(
            method = %method,
            path = %path,
            authenticated = request.is_authenticated(),
            "Dispatching request"
        );

        let response = self.transport.send(request).await.map_err(|err| {
            tracing::debug!(method = %method, path = %path, error = %err, "Transport failure");
            err
        })?;

        response.decode().map_err(|err| {
            tracing::debug!(
                method = %method,
                path = %path,
                status = response.status,
                error = %err,
                "Request failed"
            );
            err
        })
    }

    /// `GET {path}`
    pub async fn list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ClientError> {
        self.execute(ApiRequest::new(Method::Get, path)).await
    }

    /// `GET {path}/{id}`
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        id: impl Display,
    ) -> Result<T, ClientError> {
        let url = join_path(path, &id.to_string())?;
        self.execute(ApiRequest::new(Method::Get, url)).await
    }

    /// `POST {path}` or `POST {path}/{subpath}`
    pub async fn create<B, R>(
        &self,
        path: &str,
        body: &B,
        subpath: Option<&str>,
    ) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = match subpath {
            Some(subpath) => join_subpath(path, subpath)?,
            None => path.to_string(),
        };
        let body = encode_body(body)?;
        self.execute(ApiRequest::new(Method::Post, url).with_body(body))
            .await
    }

    /// `PATCH {path}/{id}`
    pub async fn update<B, T>(&self, path: &str, id: impl Display, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = join_path(path, &id.to_string())?;
        let body = encode_body(body)?;
        self.execute(ApiRequest::new(Method::Patch, url).with_body(body))
            .await
    }

    /// `DELETE {path}/{id}`
    pub async fn remove<R: DeserializeOwned>(
        &self,
        path: &str,
        id: impl Display,
    ) -> Result<R, ClientError> {
        let url = join_path(path, &id.to_string())?;
        self.execute(ApiRequest::new(Method::Delete, url)).await
    }
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value, ClientError> {
    serde_json::to_value(body).map_err(|err| ClientError::InvalidRequest {
        reason: format!("body is not serializable: {}", err),
    })
}

/// Append a single path segment, rejecting ids that would change the route.
pub(crate) fn join_path(base: &str, segment: &str) -> Result<String, ClientError> {
    if segment.is_empty()
        || segment
            .chars()
            .any(|c| matches!(c, '/' | '?' | '#') || c.is_whitespace())
    {
        return Err(ClientError::InvalidRequest {
            reason: format!("'{}' is not a valid path segment", segment),
        });
    }
    Ok(format!("{}/{}", base.trim_end_matches('/'), segment))
}

/// Append a relative subpath such as `{id}/shares`.
pub(crate) fn join_subpath(base: &str, subpath: &str) -> Result<String, ClientError> {
    let trimmed = subpath.trim_matches('/');
    let mut url = base.trim_end_matches('/').to_string();
    for segment in trimmed.split('/') {
        url = join_path(&url, segment)?;
    }
    Ok(url)
}
