//! Request layer for the Pantry API.
//!
//! Every outbound call goes through a single [`RequestGateway`]. The gateway
//! runs a pipeline of [`RequestMiddleware`] transforms before dispatch; the
//! standard pipeline contains [`BearerAuth`], which asks the injected
//! [`CredentialProvider`] for a fresh credential on every request.
//! [`ResourceClient`] binds the gateway's verbs to one collection path.

pub mod config;
pub mod credential;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod request;
pub mod resource;
pub mod transport;

pub use config::{ClientConfig, ConfigError};
pub use credential::{
    credential_fn, Credential, CredentialError, CredentialProvider, CredentialSource,
    FnCredentials, SessionCredentials, StaticToken,
};
pub use error::ClientError;
pub use gateway::{GatewayBuilder, RequestGateway};
pub use middleware::{BearerAuth, RequestMiddleware};
pub use request::{ApiRequest, ApiResponse, Method};
pub use resource::ResourceClient;
pub use transport::{HttpTransport, Transport};
