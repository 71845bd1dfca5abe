//! Bounded fixed-interval retry.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::Result;

/// Maximum attempts and the fixed pause between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }
}

/// Run `attempt` until it yields `Some`, an error, or the policy is spent.
///
/// `Ok(None)` from an attempt means "not yet"; the combinator sleeps for the
/// policy interval and tries again. Errors are returned immediately. When
/// every attempt came back empty the result is `Ok(None)` and the caller
/// decides what that means.
pub async fn retry_fixed<T, F, Fut>(policy: RetryPolicy, mut attempt: F) -> Result<Option<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    for n in 1..=policy.max_attempts {
        if let Some(value) = attempt(n).await? {
            return Ok(Some(value));
        }
        if n < policy.max_attempts {
            debug!("Attempt {}/{} came back empty", n, policy.max_attempts);
            tokio::time::sleep(policy.interval).await;
        }
    }
    Ok(None)
}
