//! Caller-side retry for transient failures
//!
//! The service never retries on its own; every call is exactly one network
//! effect. Callers that want resilience against 429/5xx or dropped
//! connections wrap a call in [`retry`]:
//!
//! ```ignore
//! let page = retry(&RetryPolicy::default(), || service.fetch_entities(token, &options)).await?;
//! ```
//!
//! Mutations are retried too if the caller asks for it, so wrapping
//! `save_entities` may create duplicates when a request reached the platform
//! but its response was lost.

use crate::error::{OntologyError, Result};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; zero behaves as one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Never retry
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before attempt `attempt + 1`, doubling from `initial_backoff`
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    pub fn should_retry(&self, error: &OntologyError, attempt: u32) -> bool {
        attempt < self.max_attempts.max(1) && error.is_transient()
    }
}

/// Run `op` until it succeeds, fails permanently, or attempts run out
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if policy.should_retry(&error, attempt) => {
                let delay = policy.backoff_for(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "transient ontology failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Operation, OperationContext};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ctx() -> OperationContext {
        OperationContext::new(Operation::FetchEntities, "Papers")
    }

    fn unavailable() -> OntologyError {
        OntologyError::Platform {
            context: ctx(),
            status: 503,
            payload: json!({}),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(400));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(800));
        assert_eq!(policy.backoff_for(10), Duration::from_secs(5));
        assert_eq!(policy.backoff_for(64), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_then_succeeds() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = retry(&RetryPolicy::default(), || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(unavailable())
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = retry(&RetryPolicy::default(), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(unavailable())
        })
        .await;
        assert_eq!(result.unwrap_err().status(), Some(503));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = retry(&RetryPolicy::default(), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(OntologyError::NotFound {
                context: OperationContext::new(Operation::FetchEntityByKey, "Papers"),
                key: "1".into(),
                payload: json!({}),
            })
        })
        .await;
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_none_policy_runs_once() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let _: Result<()> = retry(&RetryPolicy::none(), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(unavailable())
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
