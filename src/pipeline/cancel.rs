//! Run cancellation and deadline
//!
//! Every await point of a run goes through [`RunGuard::guard`], which races the
//! operation against the cancellation token and the overall deadline.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::types::{RepoDocError, Result};

#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    token: CancellationToken,
    deadline: Option<(Instant, Duration)>,
}

impl RunGuard {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Deadline measured from now
    pub fn with_deadline(mut self, budget: Duration) -> Self {
        self.deadline = Some((Instant::now() + budget, budget));
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Await `future` unless the run is cancelled or out of time.
    ///
    /// The outer error is always an interruption (`Cancelled` or `Timeout`);
    /// the future's own output is returned untouched.
    pub async fn guard<T, F>(&self, operation: &str, future: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        if self.token.is_cancelled() {
            return Err(RepoDocError::cancelled(operation));
        }

        let raced = async {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => Err(RepoDocError::cancelled(operation)),
                value = future => Ok(value),
            }
        };

        match self.deadline {
            Some((deadline, budget)) => tokio::time::timeout_at(deadline, raced)
                .await
                .unwrap_or_else(|_| Err(RepoDocError::timeout(operation, budget))),
            None => raced.await,
        }
    }

    /// [`guard`](Self::guard) for fallible operations, flattening both error layers
    pub async fn run<T, F>(&self, operation: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.guard(operation, future).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    #[tokio::test]
    async fn test_guard_passes_value_through() {
        let guard = RunGuard::default();
        let value = guard.guard("op", async { 7 }).await.unwrap();
        assert_eq!(value, 7);

        let inner: Result<()> = Err(RepoDocError::Config("x".into()));
        let err = guard.run("op", async { inner }).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_pending_work() {
        let token = CancellationToken::new();
        let guard = RunGuard::new(token.clone());

        let canceller = tokio::spawn({
            let token = token.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                token.cancel();
            }
        });
        let err = guard
            .guard("file fetch", std::future::pending::<()>())
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(err.to_string().contains("file fetch"));

        // Already cancelled: the future is never polled
        let err = guard.guard("later", async { 1 }).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_deadline_yields_timeout() {
        let guard = RunGuard::default().with_deadline(Duration::from_millis(20));
        let err = guard
            .guard("listing", tokio::time::sleep(Duration::from_secs(60)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepoDocError::Timeout { duration, .. } if duration == Duration::from_millis(20)
        ));
    }
}
