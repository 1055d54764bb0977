//! Transports that never touch the network.

use async_trait::async_trait;
use pantry_client::{ApiRequest, ApiResponse, ClientError, Transport};

use crate::service::FakeRecipeService;

/// Hands every request straight to a [`FakeRecipeService`].
#[derive(Clone)]
pub struct InMemoryTransport {
    service: FakeRecipeService,
}

impl InMemoryTransport {
    pub fn new(service: FakeRecipeService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &FakeRecipeService {
        &self.service
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        Ok(self
            .service
            .dispatch(
                request.method,
                &request.path,
                request.bearer_token(),
                request.body.as_ref(),
            )
            .await)
    }
}

/// Fails every request as if the host were unreachable.
#[derive(Debug, Clone, Default)]
pub struct UnreachableTransport;

#[async_trait]
impl Transport for UnreachableTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        Err(ClientError::Network {
            message: format!("connection refused: {} {}", request.method, request.path),
        })
    }
}
