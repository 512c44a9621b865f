//! Deadlines and bounded retries for remote provider calls.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::config::QaConfig;
use crate::error::{QaError, Result};

/// Longest delay ever waited between two attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// How remote calls are bounded in time and retried.
///
/// Every attempt runs under `timeout`. Transient failures
/// ([`QaError::is_transient`]) are retried up to `max_retries` times with a
/// delay that starts at `initial_backoff` and doubles per attempt. A
/// provider-supplied `Retry-After` replaces the computed delay. All waits
/// are capped at 8 seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Deadline for each individual attempt.
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Derive the policy from the pipeline configuration.
    pub fn from_config(config: &QaConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff,
            timeout: config.request_timeout,
        }
    }

    /// Delay before retry number `retry` (0-based).
    fn backoff(&self, retry: u32, err: &QaError) -> Duration {
        let computed = self.initial_backoff.saturating_mul(2u32.saturating_pow(retry));
        let delay = match err {
            QaError::RateLimit { retry_after: Some(hint), .. } => *hint,
            _ => computed,
        };
        delay.min(MAX_BACKOFF)
    }

    /// Run `call` until it succeeds, fails permanently, or retries run out.
    ///
    /// `operation` names the call in logs and in [`QaError::Timeout`].
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retry = 0;
        loop {
            let outcome = match tokio::time::timeout(self.timeout, call()).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!(operation, timeout = ?self.timeout, "remote call timed out");
                    return Err(QaError::Timeout {
                        operation: operation.to_string(),
                        elapsed: self.timeout,
                    });
                }
            };

            match outcome {
                Err(err) if err.is_transient() && retry < self.max_retries => {
                    let delay = self.backoff(retry, &err);
                    retry += 1;
                    warn!(
                        operation,
                        attempt = retry,
                        ?delay,
                        error = %err,
                        "retrying after transient failure"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    error!(operation, attempts = retry + 1, error = %err, "remote call failed");
                    return Err(err);
                }
                Ok(value) => return Ok(value),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&QaConfig::default())
    }
}
