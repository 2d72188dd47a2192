/// Per-provider request rate limiter (sliding one-second window)
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct RateLimiter {
    /// Queue of request timestamps (last window)
    request_times: Mutex<VecDeque<Instant>>,
    /// Max requests per window
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn per_second(max_requests: usize) -> Self {
        Self {
            request_times: Mutex::new(VecDeque::new()),
            max_requests: max_requests.max(1),
            window: Duration::from_secs(1),
        }
    }

    /// Record a request at `now` if the window has room, otherwise return how
    /// long to wait before trying again
    fn check_and_record(&self, now: Instant) -> Duration {
        let mut request_times = match self.request_times.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Remove old timestamps outside the window
        while let Some(&front) = request_times.front() {
            if now.duration_since(front) >= self.window {
                request_times.pop_front();
            } else {
                break;
            }
        }

        if request_times.len() >= self.max_requests {
            if let Some(&oldest) = request_times.front() {
                return self.window - now.duration_since(oldest);
            }
        }

        request_times.push_back(now);
        Duration::ZERO
    }

    /// Wait until a request slot is free, then take it
    pub async fn acquire(&self, provider: &str) {
        loop {
            let wait = self.check_and_record(Instant::now());
            if wait.is_zero() {
                return;
            }
            tracing::debug!("{} rate limit: waiting {}ms", provider, wait.as_millis());
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_allows_requests_within_limit() {
        let limiter = RateLimiter::per_second(8);
        let now = Instant::now();

        for _ in 0..8 {
            assert_eq!(limiter.check_and_record(now), Duration::ZERO);
        }
    }

    #[test]
    fn test_rate_limiter_blocks_over_limit() {
        let limiter = RateLimiter::per_second(8);
        let now = Instant::now();

        for _ in 0..8 {
            limiter.check_and_record(now);
        }

        let wait = limiter.check_and_record(now);
        assert!(wait > Duration::ZERO);
        assert!(wait <= Duration::from_secs(1));
    }

    #[test]
    fn test_rate_limiter_frees_slots_after_window() {
        let limiter = RateLimiter::per_second(2);
        let start = Instant::now();
        limiter.check_and_record(start);
        limiter.check_and_record(start);

        let later = start + Duration::from_millis(1001);
        assert_eq!(limiter.check_and_record(later), Duration::ZERO);
    }
}
