//! Exponential backoff for remote API calls.
//!
//! Only transient failures are retried. Permanent failures come back on the
//! first attempt. Retrying happens inside the remote clients; the task
//! pipeline itself never retries.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::error::RemoteError;

/// How often and how patiently a remote call is retried.
///
/// The wait before retry `n` (0-indexed) is `base * 2^n`, never more than
/// `ceiling`. A server-supplied `Retry-After` replaces the computed wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Retries after the first attempt.
    pub retries: u32,
    pub base: Duration,
    pub ceiling: Duration,
}

impl Backoff {
    /// Waits 1s, 2s, 4s.
    pub const STANDARD: Self = Self {
        retries: 3,
        base: Duration::from_secs(1),
        ceiling: Duration::from_secs(8),
    };

    /// One attempt only.
    pub const NEVER: Self = Self {
        retries: 0,
        base: Duration::ZERO,
        ceiling: Duration::ZERO,
    };

    pub fn wait_before(&self, retry: u32) -> Duration {
        let doubled = 2u32
            .checked_pow(retry)
            .and_then(|factor| self.base.checked_mul(factor))
            .unwrap_or(self.ceiling);
        doubled.min(self.ceiling)
    }

    fn wait_after(&self, retry: u32, error: &RemoteError) -> Duration {
        error.retry_after.unwrap_or_else(|| self.wait_before(retry))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Runs `call` until it succeeds, fails permanently or `backoff` gives up,
/// in which case the last error is returned.
pub async fn retry_with_backoff<T, F, Fut>(
    backoff: Backoff,
    description: &str,
    mut call: F,
) -> Result<T, RemoteError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let mut retry = 0;
    let mut outcome = call().await;
    while let Err(error) = &outcome {
        if !error.is_retriable() || retry >= backoff.retries {
            break;
        }
        let wait = backoff.wait_after(retry, error);
        warn!(
            error = %error,
            retry = retry + 1,
            wait_ms = wait.as_millis() as u64,
            "{description} failed, retrying"
        );
        tokio::time::sleep(wait).await;
        retry += 1;
        outcome = call().await;
    }
    outcome
}
