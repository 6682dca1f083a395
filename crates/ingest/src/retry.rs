//! Bounded-then-indefinite retry schedule shared by the stream and storage
//! paths of the pipeline.

use std::time::Duration;
use tokio::sync::watch;

/// After `fast_attempts` failures spaced `fast_delay` apart, the schedule
/// drops to `slow_delay` and keeps retrying indefinitely: a validated order
/// is never silently dropped, and the stream is never abandoned.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub fast_attempts: u32,
    pub fast_delay: Duration,
    pub slow_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            fast_attempts: 3,
            fast_delay: Duration::from_millis(500),
            slow_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt, given how many have failed so far.
    pub fn delay_after(&self, failures: u32) -> Duration {
        if failures <= self.fast_attempts {
            self.fast_delay
        } else {
            self.slow_delay
        }
    }
}

/// Sleep that a shutdown signal can interrupt. Returns `false` if shutdown
/// fired before the delay elapsed.
pub(crate) async fn sleep_or_shutdown(
    delay: Duration,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    if *shutdown.borrow() {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = shutdown.changed() => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_switches_to_slow_after_bounded_phase() {
        let policy = RetryPolicy {
            fast_attempts: 3,
            fast_delay: Duration::from_millis(100),
            slow_delay: Duration::from_secs(5),
        };

        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(3), Duration::from_millis(100));
        assert_eq!(policy.delay_after(4), Duration::from_secs(5));
        assert_eq!(policy.delay_after(1000), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes_without_shutdown() {
        let (_tx, mut rx) = watch::channel(false);
        assert!(sleep_or_shutdown(Duration::from_secs(1), &mut rx).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_sleep() {
        let (tx, mut rx) = watch::channel(false);
        let sleeper = tokio::spawn(async move {
            sleep_or_shutdown(Duration::from_secs(3600), &mut rx).await
        });

        tokio::task::yield_now().await;
        tx.send(true).unwrap();
        assert!(!sleeper.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_after_shutdown_returns_immediately() {
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();
        assert!(!sleep_or_shutdown(Duration::from_secs(3600), &mut rx).await);
    }
}
