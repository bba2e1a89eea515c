/**
 * Publish Rate Limiter
 *
 * Token bucket throttling the total outbound broadcast rate: one token
 * every 100 ms with a burst of 8. Broadcasters await a token before
 * iterating the subscriber set.
 */

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct RateLimiter {
    /// Time to mint one token.
    interval: Duration,
    burst: u32,
    state: Mutex<BucketState>,
}

struct BucketState {
    available: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(interval: Duration, burst: u32) -> Self {
        RateLimiter {
            interval,
            burst,
            state: Mutex::new(BucketState {
                available: burst as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Wait until a token is available and consume it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(bucket.last_refill);
                bucket.available = (bucket.available
                    + elapsed.as_secs_f64() / self.interval.as_secs_f64())
                .min(self.burst as f64);
                bucket.last_refill = now;

                if bucket.available >= 1.0 {
                    bucket.available -= 1.0;
                    return;
                }

                self.interval.mul_f64(1.0 - bucket.available)
            };

            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_millis(100), 8);
        let start = Instant::now();
        for _ in 0..8 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn ninth_token_waits_for_refill() {
        let limiter = RateLimiter::new(Duration::from_millis(100), 8);
        for _ in 0..8 {
            limiter.acquire().await;
        }

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_time_refills_up_to_burst() {
        let limiter = RateLimiter::new(Duration::from_millis(100), 8);
        for _ in 0..8 {
            limiter.acquire().await;
        }

        // far longer than needed to refill the full burst
        tokio::time::sleep(Duration::from_secs(10)).await;

        let start = Instant::now();
        for _ in 0..8 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
