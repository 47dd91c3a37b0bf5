// jmap-core/src/retry.rs
use crate::http::HttpError;
use log::warn;
use std::future::Future;
use std::time::Duration;

/// Exponential backoff applied to transport failures only.
///
/// An error that carries a status means the server already answered, so it
/// is returned at once and the request is never replayed.
///
/// Attempt `n` (0-based) that fails waits `base_delay * 2^n` before the next
/// one; at most `max_retries` extra attempts follow the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Run `op` until it yields a response or the attempts run out.
    ///
    /// A received response is returned as is, whatever its status.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, HttpError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HttpError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.status.is_none() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    attempt += 1;
                    warn!(
                        "transport error on try {}, retrying in {:?}: {}",
                        attempt, delay, e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
