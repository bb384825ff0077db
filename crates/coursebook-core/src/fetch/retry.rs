use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use super::{FetchError, SnapshotSource};

/// Additional attempts after the first one fails with a retryable error.
pub const MAX_RETRIES: u32 = 3;

/// Base delay between attempts; attempt `n` waits `n` times this.
/// Linear rather than exponential so the worst case stays predictable for the UI.
pub const RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Budget for a single underlying request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Overall bound on the attempt loop, delays included. `None` waits as long as it takes.
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(MAX_RETRIES, RETRY_DELAY, REQUEST_TIMEOUT)
    }
}

impl RetryPolicy {
    /// Policy whose deadline covers every retry delay plus one request timeout.
    pub fn new(max_retries: u32, retry_delay: Duration, request_timeout: Duration) -> Self {
        let policy = Self {
            max_retries,
            retry_delay,
            deadline: None,
        };
        Self {
            deadline: Some(policy.total_delay().saturating_add(request_timeout)),
            ..policy
        }
    }

    pub fn without_deadline(self) -> Self {
        Self {
            deadline: None,
            ..self
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(attempt)
    }

    /// Sum of all retry delays: `RETRY_DELAY * n(n+1)/2`.
    /// Saturates rather than overflowing for absurd retry counts.
    pub fn total_delay(&self) -> Duration {
        let n = u64::from(self.max_retries);
        let steps = n * (n + 1) / 2;
        let steps = u32::try_from(steps).unwrap_or(u32::MAX);
        self.retry_delay.saturating_mul(steps)
    }
}

/// Wraps a snapshot source with bounded, linearly-spaced retries.
///
/// Only reads go through here, so retrying is always safe.
#[derive(Clone)]
pub struct ResilientFetcher {
    source: Arc<dyn SnapshotSource>,
    policy: RetryPolicy,
}

impl ResilientFetcher {
    pub fn new(source: Arc<dyn SnapshotSource>, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch a resource document, retrying transient failures.
    pub async fn fetch(&self, resource: &str) -> Result<Value, FetchError> {
        let mut attempts = 0;
        match self.policy.deadline {
            Some(deadline) => {
                let outcome = tokio::time::timeout(deadline, self.attempt_loop(resource, &mut attempts)).await;
                match outcome {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(resource, attempts, deadline_ms = deadline.as_millis() as u64, "Fetch deadline exceeded");
                        Err(FetchError::DeadlineExceeded {
                            resource: resource.to_string(),
                            attempts,
                            deadline,
                        })
                    }
                }
            }
            None => self.attempt_loop(resource, &mut attempts).await,
        }
    }

    async fn attempt_loop(&self, resource: &str, attempts: &mut u32) -> Result<Value, FetchError> {
        loop {
            *attempts += 1;
            let attempt = *attempts;

            let error = match self.source.load(resource).await {
                Ok(document) => {
                    debug!(resource, attempt, "Fetched snapshot document");
                    return Ok(document);
                }
                Err(e) => e,
            };

            if !error.is_retryable() {
                debug!(resource, attempt, error = %error, "Permanent fetch failure");
                return Err(FetchError::Permanent {
                    resource: resource.to_string(),
                    source: error,
                });
            }

            if attempt > self.policy.max_retries {
                warn!(resource, attempts = attempt, error = %error, "Retries exhausted");
                return Err(FetchError::Exhausted {
                    resource: resource.to_string(),
                    attempts: attempt,
                    source: error,
                });
            }

            let delay = self.policy.delay_for(attempt);
            warn!(
                resource,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Transient fetch failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
