// ABOUTME: Bounded fixed-interval health polling.
// ABOUTME: Evaluates a predicate at most N times, sleeping only between attempts.

use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("instance did not become healthy within {attempts} attempts")]
pub struct PollTimeout {
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct HealthPoller {
    interval: Duration,
    check_timeout: Duration,
}

impl HealthPoller {
    /// Checks run `interval` apart; each gets at most `check_timeout`.
    pub fn new(interval: Duration, check_timeout: Duration) -> Self {
        Self {
            interval,
            check_timeout,
        }
    }

    /// Evaluate `check` up to `attempts` times.
    ///
    /// Returns the attempt number that succeeded. With `attempts == 0` the
    /// check is never called. A check still pending after the check timeout
    /// counts as a failed attempt.
    pub async fn poll<F, Fut>(&self, attempts: u32, mut check: F) -> Result<u32, PollTimeout>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        for attempt in 1..=attempts {
            let healthy = match tokio::time::timeout(self.check_timeout, check()).await {
                Ok(healthy) => healthy,
                Err(_) => {
                    tracing::warn!(
                        "Health check attempt {}/{} timed out after {:?}",
                        attempt,
                        attempts,
                        self.check_timeout
                    );
                    false
                }
            };
            if healthy {
                tracing::debug!("Health check passed on attempt {}/{}", attempt, attempts);
                return Ok(attempt);
            }
            tracing::debug!("Health check attempt {}/{} failed", attempt, attempts);
            if attempt < attempts {
                tokio::time::sleep(self.interval).await;
            }
        }
        Err(PollTimeout { attempts })
    }
}
