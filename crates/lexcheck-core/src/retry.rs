//! Bounded retry with exponential backoff for outbound requests.
//!
//! Only transient failures (see [`Error::is_transient`]) are retried.
//! Malformed payloads and client errors are returned immediately so the
//! caller can engage its fallback strategy without delay.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy for external calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retry attempts after the initial request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay; doubles every attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for a single delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Sum of every backoff delay when all retries are used
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_retries).map(|attempt| self.delay_for(attempt)).sum()
    }

    /// Worst-case wall-clock time of a call whose attempts each take up to `attempt_timeout`
    pub fn budget(&self, attempt_timeout: Duration) -> Duration {
        attempt_timeout.saturating_mul(self.max_retries.saturating_add(1)) + self.total_backoff()
    }
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    2_000
}

/// Run `f` until it succeeds, fails with a non-transient error, or the policy is exhausted
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    operation = %operation,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    "Transient failure, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Run `fut` with a deadline, mapping expiry to [`Error::Timeout`]
pub async fn with_timeout<T, Fut>(timeout: Duration, fut: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout),
    }
}
