//! Write hooks that report their progress.

use futures_util::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::DataError;

/// Progress of the most recent `mutate` call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MutationStatus {
    #[default]
    Idle,
    Pending,
    Success,
    /// The failure, rendered for display.
    Error(String),
}

impl MutationStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl fmt::Display for MutationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Pending => f.write_str("pending"),
            Self::Success => f.write_str("success"),
            Self::Error(message) => write!(f, "error: {}", message),
        }
    }
}

type Runner<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<O, DataError>> + Send + Sync>;

struct Shared {
    status: watch::Sender<MutationStatus>,
    /// Incremented by every `mutate` and `reset`; only the latest call may
    /// publish a final status.
    generation: AtomicU64,
}

/// A reusable write operation with observable status.
pub struct Mutation<I, O> {
    runner: Runner<I, O>,
    shared: Arc<Shared>,
}

impl<I, O> Clone for Mutation<I, O> {
    fn clone(&self) -> Self {
        Self {
            runner: Arc::clone(&self.runner),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<I, O> Mutation<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new<F, Fut>(runner: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, DataError>> + Send + 'static,
    {
        let runner: Runner<I, O> = Arc::new(move |input| runner(input).boxed());
        let (status, _) = watch::channel(MutationStatus::Idle);
        Self {
            runner,
            shared: Arc::new(Shared {
                status,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Run the mutation. The status moves to `Pending`, then to `Success` or
    /// `Error` even if the caller stops waiting.
    pub async fn mutate(&self, input: I) -> Result<O, DataError> {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.status.send_replace(MutationStatus::Pending);

        let shared = Arc::clone(&self.shared);
        let request = (self.runner)(input);
        let task = tokio::spawn(async move {
            let result = request.await;
            let status = match &result {
                Ok(_) => MutationStatus::Success,
                Err(err) => MutationStatus::Error(err.to_string()),
            };
            if shared.generation.load(Ordering::SeqCst) == generation {
                shared.status.send_replace(status);
            }
            result
        });

        match task.await {
            Ok(result) => result,
            Err(_) => {
                let shared = &self.shared;
                if shared.generation.load(Ordering::SeqCst) == generation {
                    shared
                        .status
                        .send_replace(MutationStatus::Error(DataError::Aborted.to_string()));
                }
                Err(DataError::Aborted)
            }
        }
    }

    pub fn status(&self) -> MutationStatus {
        self.shared.status.borrow().clone()
    }

    /// Receive every status change.
    pub fn subscribe(&self) -> watch::Receiver<MutationStatus> {
        self.shared.status.subscribe()
    }

    /// Back to `Idle`. A call still in flight no longer updates the status.
    pub fn reset(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.status.send_replace(MutationStatus::Idle);
    }
}
