//! Retry middleware for calls to external services.
//!
//! [`Invoker::invoke`] wraps any zero-argument async operation. Failures are
//! classified with [`DbBuilderError::class`]: rate limits wait a fixed backoff
//! and retry, transient failures retry at once, anything else is returned.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::config::RetryConfig;
use crate::error::{DbBuilderError, FailureClass, Result};

/// Something that can wait. Swapped out in tests to count backoffs.
#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Waits on the tokio timer.
pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Retry policy applied around a single external call.
#[derive(Clone)]
pub struct Invoker {
    backoff: Duration,
    max_attempts: Option<u32>,
    pause: Arc<dyn Pause>,
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker")
            .field("backoff", &self.backoff)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl Invoker {
    /// `max_attempts = None` retries forever.
    pub fn new(backoff: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            backoff,
            max_attempts,
            pause: Arc::new(TokioPause),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.backoff(), config.attempt_limit())
    }

    /// Replace the timer used for rate-limit backoff.
    pub fn with_pause(mut self, pause: Arc<dyn Pause>) -> Self {
        self.pause = pause;
        self
    }

    /// Run `operation` until it succeeds, fails fatally, or the attempt cap is hit.
    pub async fn invoke<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let class = err.class();
            if class == FailureClass::Fatal {
                return Err(err);
            }

            if self.max_attempts.is_some_and(|max| attempt >= max) {
                return Err(DbBuilderError::ExhaustedRetries {
                    attempts: attempt,
                    last: err.to_string(),
                });
            }

            if class == FailureClass::RateLimited {
                warn!(
                    attempt,
                    backoff_secs = self.backoff.as_secs(),
                    error = %err,
                    "rate limited, backing off"
                );
                self.pause.pause(self.backoff).await;
            } else {
                warn!(attempt, error = %err, "transient failure, retrying");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingPause {
        pauses: AtomicUsize,
    }

    #[async_trait]
    impl Pause for CountingPause {
        async fn pause(&self, _duration: Duration) {
            self.pauses.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting_invoker(max_attempts: Option<u32>) -> (Invoker, Arc<CountingPause>) {
        let pause = Arc::new(CountingPause::default());
        let invoker =
            Invoker::new(Duration::from_secs(15), max_attempts).with_pause(pause.clone());
        (invoker, pause)
    }

    #[tokio::test]
    async fn rate_limited_twice_then_success() {
        let (invoker, pause) = counting_invoker(None);
        let calls = AtomicUsize::new(0);

        let value = invoker
            .invoke(|| async {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err(DbBuilderError::RateLimited("quota".into())),
                    _ => Ok(42),
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(pause.pauses.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transient_retries_without_pausing() {
        let (invoker, pause) = counting_invoker(None);
        let calls = AtomicUsize::new(0);

        let value = invoker
            .invoke(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) < 3 {
                    Err(DbBuilderError::Transient("reset".into()))
                } else {
                    Ok("done")
                }
            })
            .await
            .unwrap();

        assert_eq!(value, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(pause.pauses.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fatal_is_returned_immediately() {
        let (invoker, _pause) = counting_invoker(None);
        let calls = AtomicUsize::new(0);

        let err = invoker
            .invoke(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(DbBuilderError::Api {
                    status: 401,
                    message: "bad key".into(),
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DbBuilderError::Api { status: 401, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn attempt_cap_ends_in_exhausted_retries() {
        let (invoker, pause) = counting_invoker(Some(3));
        let calls = AtomicUsize::new(0);

        let err = invoker
            .invoke(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(DbBuilderError::RateLimited("quota".into()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DbBuilderError::ExhaustedRetries { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // no wait after the final attempt
        assert_eq!(pause.pauses.load(Ordering::SeqCst), 2);
    }
}
