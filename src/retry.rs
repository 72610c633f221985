use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Retry decision returned by the error classifier callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Retry,
    Abort,
}

/// Fixed-delay retry policy: a bounded number of attempts with the same
/// pause after every failed attempt but the last. Worst-case latency per item
/// is `(max_attempts - 1) * delay` plus the attempts themselves.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// Why [`retry_fixed`] stopped without a value.
#[derive(Debug)]
pub enum RetryStop<E> {
    /// The last attempt's error, or the first one the classifier refused.
    Failed(E),
    /// Cancellation fired while waiting between attempts.
    Cancelled(E),
}

/// Retry an async operation with a fixed pause between attempts.
///
/// - `config`: attempt budget and delay
/// - `classifier`: inspects an error and returns `Retry` or `Abort`
/// - `operation`: the async closure to retry, called with the 1-based attempt
/// - `cancel`: ends the wait between attempts early
///
/// Returns the first `Ok` result, or the error that ended the loop.
pub async fn retry_fixed<F, Fut, T, E, C>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    classifier: C,
    operation: F,
) -> Result<T, RetryStop<E>>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryAction,
    E: std::fmt::Display,
{
    let total_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let err = match operation(attempt).await {
            Ok(val) => return Ok(val),
            Err(e) => e,
        };
        if classifier(&err) == RetryAction::Abort || attempt >= total_attempts {
            return Err(RetryStop::Failed(err));
        }
        tracing::warn!(
            "Attempt {}/{} failed, retrying in {}ms: {}",
            attempt,
            total_attempts,
            config.delay.as_millis(),
            err
        );
        tokio::select! {
            _ = tokio::time::sleep(config.delay) => {}
            _ = cancel.cancelled() => return Err(RetryStop::Cancelled(err)),
        }
        attempt += 1;
    }
}
