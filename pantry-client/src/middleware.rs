//! Request middleware applied before dispatch.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};

use crate::credential::CredentialProvider;
use crate::request::ApiRequest;

/// A `Request -> Request` transform run by the gateway before every dispatch.
///
/// Middleware cannot fail a request; anything it cannot do it skips.
#[async_trait]
pub trait RequestMiddleware: Send + Sync {
    async fn apply(&self, request: ApiRequest) -> ApiRequest;
}

/// Attaches `Authorization: Bearer <token>` from a freshly resolved credential.
#[derive(Clone)]
pub struct BearerAuth {
    credentials: CredentialProvider,
}

impl BearerAuth {
    pub fn new(credentials: CredentialProvider) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl RequestMiddleware for BearerAuth {
    async fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        let Some(credential) = self.credentials.resolve().await else {
            return request;
        };

        match HeaderValue::from_str(&format!("Bearer {}", credential.expose())) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers.insert(AUTHORIZATION, value);
            }
            Err(_) => {
                tracing::warn!(
                    path = %request.path,
                    "Credential is not a valid header value, sending unauthenticated"
                );
            }
        }
        request
    }
}
