//! Request-scoped cancellation and clock.

use std::future::Future;

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::application::error::ContentError;
use crate::application::repos::RepoError;

/// Carries the caller's cancellation signal into every store call.
///
/// `now` is captured once per request so every time-window decision made while
/// serving it agrees.
#[derive(Debug, Clone)]
pub struct RequestContext {
    token: CancellationToken,
    now: OffsetDateTime,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::at(OffsetDateTime::now_utc())
    }

    pub fn at(now: OffsetDateTime) -> Self {
        Self {
            token: CancellationToken::new(),
            now,
        }
    }

    pub fn now(&self) -> OffsetDateTime {
        self.now
    }

    /// A context cancelled together with this one, but cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            now: self.now,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Race a store call against cancellation.
    ///
    /// A cancelled context wins even if the call is ready. The call future is
    /// dropped on cancellation, which rolls back any open transaction.
    pub async fn run<T, F>(&self, operation: &'static str, call: F) -> Result<T, ContentError>
    where
        F: Future<Output = Result<T, RepoError>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                tracing::debug!(operation, "request cancelled");
                Err(ContentError::Cancelled)
            }
            result = call => result.map_err(|source| ContentError::store(operation, source)),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
