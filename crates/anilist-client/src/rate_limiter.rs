//! Request spacing for the AniList API.

use std::time::{Duration, Instant};

use tokio::time::sleep;

/// Enforces a minimum interval between consecutive requests.
///
/// AniList throttles anonymous clients hard, so every outbound request goes
/// through `acquire` first. The limiter is a field of the client instance;
/// independent clients (and test runs) do not share state.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum spacing between request starts
    min_interval: Duration,
    /// Start of the previous acquire
    last_request: Option<Instant>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: None,
        }
    }

    /// Wait until at least `min_interval` has passed since the previous
    /// acquire, then record the new timestamp.
    pub async fn acquire(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::debug!(
                    wait_ms = wait.as_millis() as u64,
                    "Rate limit: spacing request"
                );
                sleep(wait).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_acquire_returns_immediately() {
        let mut limiter = RateLimiter::new(Duration::from_millis(200));

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn consecutive_acquires_are_spaced_by_the_interval() {
        let mut limiter = RateLimiter::new(Duration::from_millis(50));

        let start = Instant::now();

        // Three acquires: the second and third must each wait out the interval
        for _ in 0..3 {
            limiter.acquire().await;
        }

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(90)); // Allow some tolerance
    }
}
