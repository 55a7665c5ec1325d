//! Sliding-window limiter for outbound model calls.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Added to every computed wait so the oldest call has fully left the window.
pub(crate) const SAFETY_MARGIN: Duration = Duration::from_secs(1);

/// Admits at most `max_calls` calls within any trailing `period`.
///
/// The window lock is held across the wait, so check-and-record is atomic for
/// concurrent callers and waiters are admitted one at a time. A caller that
/// abandons `acquire` (e.g. via an external timeout) leaves no trace, since the
/// timestamp is only recorded on admission.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    period: Duration,
    window: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_calls: usize, period: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            period,
            window: Mutex::new(VecDeque::with_capacity(max_calls)),
        }
    }

    pub async fn acquire(&self) {
        let mut window = self.window.lock().await;
        self.purge(&mut window, Instant::now());

        if window.len() >= self.max_calls
            && let Some(&oldest) = window.front()
        {
            let wait = (oldest + self.period).saturating_duration_since(Instant::now()) + SAFETY_MARGIN;
            debug!(
                wait_ms = wait.as_millis() as u64,
                max_calls = self.max_calls,
                "rate limit reached, waiting"
            );
            tokio::time::sleep(wait).await;
            self.purge(&mut window, Instant::now());
        }

        window.push_back(Instant::now());
    }

    /// Number of calls currently inside the window.
    #[cfg(test)]
    pub(crate) async fn in_window(&self) -> usize {
        let mut window = self.window.lock().await;
        self.purge(&mut window, Instant::now());
        window.len()
    }

    fn purge(&self, window: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&first) = window.front() {
            if now.duration_since(first) >= self.period {
                window.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn assert_window_respected(stamps: &mut [Instant], max_calls: usize, period: Duration) {
        stamps.sort();
        for (i, start) in stamps.iter().enumerate() {
            let in_period = stamps[i..]
                .iter()
                .take_while(|t| t.duration_since(*start) < period)
                .count();
            assert!(
                in_period <= max_calls,
                "{in_period} calls within {period:?} starting at index {i}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn admits_up_to_limit_without_waiting() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.in_window().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_until_oldest_call_leaves_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(10) + SAFETY_MARGIN);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timestamps_are_purged() {
        let limiter = RateLimiter::new(2, Duration::from_secs(5));
        limiter.acquire().await;
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(limiter.in_window().await, 0);

        let before = Instant::now();
        limiter.acquire().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_calls_never_exceed_window() {
        let max_calls = 4;
        let period = Duration::from_secs(30);
        let limiter = RateLimiter::new(max_calls, period);
        let mut stamps = Vec::new();
        for i in 0..25 {
            limiter.acquire().await;
            stamps.push(Instant::now());
            if i % 3 == 0 {
                tokio::time::advance(Duration::from_secs(7)).await;
            }
        }
        assert_window_respected(&mut stamps, max_calls, period);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_never_exceed_window() {
        let max_calls = 3;
        let period = Duration::from_secs(20);
        let limiter = Arc::new(RateLimiter::new(max_calls, period));

        let tasks = (0..12).map(|_| {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move {
                limiter.acquire().await;
                Instant::now()
            })
        });
        let mut stamps: Vec<Instant> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert_eq!(stamps.len(), 12);
        assert_window_respected(&mut stamps, max_calls, period);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_wait_records_nothing() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        limiter.acquire().await;

        let abandoned =
            tokio::time::timeout(Duration::from_secs(5), limiter.acquire()).await;
        assert!(abandoned.is_err());
        assert_eq!(limiter.in_window().await, 1);
    }

    #[test]
    fn zero_max_calls_is_clamped() {
        let limiter = RateLimiter::new(0, Duration::from_secs(1));
        assert_eq!(limiter.max_calls, 1);
    }
}
