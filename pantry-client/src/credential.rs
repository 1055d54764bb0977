//! Bearer credentials and the provider that resolves them.
//!
//! The identity subsystem owns credentials; this layer only reads them through
//! a [`CredentialSource`]. A [`CredentialProvider`] holds at most one active
//! source and is injected into the gateway at construction. Swapping the
//! source only affects requests that resolve after the swap.

use crate::config::ClientConfig;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;

/// Default upper bound on a single credential resolution.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Opaque bearer token. `Debug` output is redacted.
pub struct Credential(SecretString);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Failure inside a credential source. Never escapes [`CredentialProvider::resolve`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Credential provider failed: {0}")]
    Provider(String),

    #[error("Credential resolution timed out after {0:?}")]
    Timeout(Duration),
}

/// Something that can produce the current bearer credential, if any.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn credential(&self) -> Result<Option<Credential>, CredentialError>;
}

/// A fixed token, e.g. from `PANTRY_TOKEN`.
pub struct StaticToken {
    token: SecretString,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

#[async_trait]
impl CredentialSource for StaticToken {
    async fn credential(&self) -> Result<Option<Credential>, CredentialError> {
        Ok(Some(Credential::new(self.token.expose_secret())))
    }
}

/// Adapter that turns an async closure into a [`CredentialSource`].
pub struct FnCredentials<F>(F);

/// Wrap an async closure as a credential source.
pub fn credential_fn<F, Fut>(f: F) -> FnCredentials<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Credential>, CredentialError>> + Send + 'static,
{
    FnCredentials(f)
}

#[async_trait]
impl<F, Fut> CredentialSource for FnCredentials<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Credential>, CredentialError>> + Send + 'static,
{
    async fn credential(&self) -> Result<Option<Credential>, CredentialError> {
        (self.0)().await
    }
}

/// A source bound to one signed-in session.
///
/// Once [`SessionCredentials::end`] is called the session yields no
/// credential, even if the provider still holds it.
#[derive(Clone)]
pub struct SessionCredentials {
    inner: Arc<dyn CredentialSource>,
    ended: Arc<AtomicBool>,
}

impl SessionCredentials {
    pub fn new(inner: Arc<dyn CredentialSource>) -> Self {
        Self {
            inner,
            ended: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn end(&self) {
        self.ended.store(true, Ordering::SeqCst);
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialSource for SessionCredentials {
    async fn credential(&self) -> Result<Option<Credential>, CredentialError> {
        if self.is_ended() {
            return Ok(None);
        }
        let credential = self.inner.credential().await?;
        // The session may have ended while the inner source was resolving.
        if self.is_ended() {
            return Ok(None);
        }
        Ok(credential)
    }
}

/// Holder of the active credential source.
///
/// Cheap to clone; all clones share the same slot.
#[derive(Clone)]
pub struct CredentialProvider {
    active: Arc<RwLock<Option<Arc<dyn CredentialSource>>>>,
    resolve_timeout: Duration,
}

impl Default for CredentialProvider {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLVE_TIMEOUT)
    }
}

impl CredentialProvider {
    /// Create a provider with no source set. Requests go out unauthenticated
    /// until one is installed.
    pub fn new(resolve_timeout: Duration) -> Self {
        Self {
            active: Arc::new(RwLock::new(None)),
            resolve_timeout,
        }
    }

    /// Provider sized by the config's resolution timeout.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(Duration::from_millis(config.credential_timeout_ms))
    }

    /// Replace the active source.
    pub fn set_source(&self, source: Arc<dyn CredentialSource>) {
        let mut slot = self.active.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(source);
        tracing::debug!("Credential source replaced");
    }

    /// Remove the active source, e.g. on sign-out.
    pub fn clear(&self) {
        let mut slot = self.active.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
        tracing::debug!("Credential source cleared");
    }

    pub fn is_set(&self) -> bool {
        self.active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Resolve the current credential.
    ///
    /// Source failures and timeouts are logged and reported as "no
    /// credential"; this never blocks the request pipeline.
    pub async fn resolve(&self) -> Option<Credential> {
        match self.try_resolve().await {
            Ok(credential) => credential,
            Err(err) => {
                tracing::warn!(error = %err, "Credential resolution failed, continuing unauthenticated");
                None
            }
        }
    }

    /// Resolve the current credential, surfacing source failures.
    pub async fn try_resolve(&self) -> Result<Option<Credential>, CredentialError> {
        // Snapshot the source so the lock is not held across the await.
        let source = self
            .active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let Some(source) = source else {
            return Ok(None);
        };

        match tokio::time::timeout(self.resolve_timeout, source.credential()).await {
            Ok(result) => result,
            Err(_) => Err(CredentialError::Timeout(self.resolve_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("super-secret");
        assert_eq!(format!("{:?}", credential), "Credential([REDACTED])");
        assert_eq!(credential.expose(), "super-secret");
    }

    #[test]
    fn provider_takes_timeout_from_config() {
        let mut config = ClientConfig::new(None, "pk_test");
        config.credential_timeout_ms = 250;
        let provider = CredentialProvider::from_config(&config);
        assert_eq!(provider.resolve_timeout, Duration::from_millis(250));
        assert!(!provider.is_set());
    }

    #[tokio::test]
    async fn unset_provider_resolves_to_none() {
        let provider = CredentialProvider::default();
        assert!(!provider.is_set());
        assert!(provider.resolve().await.is_none());
    }

    #[tokio::test]
    async fn failing_source_degrades_to_none() {
        let provider = CredentialProvider::default();
        provider.set_source(Arc::new(credential_fn(|| async {
            Err::<Option<Credential>, _>(CredentialError::Provider("session expired".into()))
        })));

        assert!(provider.try_resolve().await.is_err());
        assert!(provider.resolve().await.is_none());
    }

    #[tokio::test]
    async fn slow_source_times_out() {
        let provider = CredentialProvider::new(Duration::from_millis(20));
        provider.set_source(Arc::new(credential_fn(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, CredentialError>(Some(Credential::new("late")))
        })));

        assert_eq!(
            provider.try_resolve().await.unwrap_err(),
            CredentialError::Timeout(Duration::from_millis(20))
        );
        assert!(provider.resolve().await.is_none());
    }

    #[tokio::test]
    async fn replacing_source_affects_later_resolutions() {
        let provider = CredentialProvider::default();
        provider.set_source(Arc::new(StaticToken::new("first")));
        assert_eq!(provider.resolve().await.unwrap().expose(), "first");

        let clone = provider.clone();
        clone.set_source(Arc::new(StaticToken::new("second")));
        assert_eq!(provider.resolve().await.unwrap().expose(), "second");

        provider.clear();
        assert!(clone.resolve().await.is_none());
    }

    #[tokio::test]
    async fn ended_session_yields_no_credential() {
        let session = SessionCredentials::new(Arc::new(StaticToken::new("tok")));
        let provider = CredentialProvider::default();
        provider.set_source(Arc::new(session.clone()));

        assert_eq!(provider.resolve().await.unwrap().expose(), "tok");
        session.end();
        assert!(provider.is_set());
        assert!(provider.resolve().await.is_none());
    }
}
