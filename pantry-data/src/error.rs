use pantry_client::ClientError;
use pantry_core::ValidationError;
use thiserror::Error;

/// Failure of a query or mutation, as surfaced to UI collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataError {
    /// The request reached the gateway and failed there.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Rejected before dispatch; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The background task running the request panicked or was cancelled by
    /// runtime shutdown.
    #[error("Mutation task was aborted before completing")]
    Aborted,
}

impl DataError {
    /// HTTP status of the failed request, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Client(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
