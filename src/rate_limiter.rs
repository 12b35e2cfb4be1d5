//! Fixed-spacing request pacing for the registry API.
//!
//! The delay is derived once from the published quota:
//! `delay = (window / quota) * safety_factor`. Every request is preceded by
//! `wait()`; quota violations and retryable failures call `backoff()`, which
//! sleeps twice as long. Nothing is tracked between calls besides counters.

use crate::config::Config;
use crate::errors::AppError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Something that can suspend the caller for a duration.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Shared flag checked before every sleep and network call.
#[derive(Debug, Default, Clone)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns `AppError::Cancelled` once the flag has been raised.
    pub fn check(&self) -> Result<(), AppError> {
        if self.is_cancelled() {
            Err(AppError::Cancelled)
        } else {
            Ok(())
        }
    }
}

pub struct RateLimiter {
    delay: Duration,
    sleeper: Arc<dyn Sleeper>,
    cancel: CancellationFlag,
    waits: AtomicU64,
    backoffs: AtomicU64,
}

impl RateLimiter {
    /// Creates a limiter for `quota` requests per `window_secs`, padded by `safety_factor`.
    ///
    /// Fails with `AppError::Config` when the delay (or its doubled backoff)
    /// cannot be represented as a `Duration`.
    pub fn new(
        quota: u32,
        window_secs: u64,
        safety_factor: f64,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, AppError> {
        let delay = pacing_delay(quota, window_secs, safety_factor)?;

        Ok(Self {
            delay,
            sleeper,
            cancel: CancellationFlag::new(),
            waits: AtomicU64::new(0),
            backoffs: AtomicU64::new(0),
        })
    }

    pub fn from_config(config: &Config, sleeper: Arc<dyn Sleeper>) -> Result<Self, AppError> {
        Self::new(
            config.quota,
            config.window_secs,
            config.safety_factor,
            sleeper,
        )
    }

    /// Attaches a cancellation flag shared with the caller.
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn backoff_delay(&self) -> Duration {
        self.delay * 2
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancel
    }

    /// Sleeps for the per-request delay.
    pub async fn wait(&self) -> Result<(), AppError> {
        self.cancel.check()?;
        self.waits.fetch_add(1, Ordering::Relaxed);
        self.sleeper.sleep(self.delay).await;
        Ok(())
    }

    /// Sleeps for twice the per-request delay after a 429 or retryable failure.
    pub async fn backoff(&self) -> Result<(), AppError> {
        self.cancel.check()?;
        self.backoffs.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            "Rate limit or transient failure, waiting for {:.2} seconds...",
            self.backoff_delay().as_secs_f64()
        );
        self.sleeper.sleep(self.backoff_delay()).await;
        Ok(())
    }

    pub fn wait_count(&self) -> u64 {
        self.waits.load(Ordering::Relaxed)
    }

    pub fn backoff_count(&self) -> u64 {
        self.backoffs.load(Ordering::Relaxed)
    }
}

/// Seconds between requests: `(window / quota) * safety_factor`.
pub fn compute_delay_secs(quota: u32, window_secs: u64, safety_factor: f64) -> f64 {
    (window_secs as f64 / quota as f64) * safety_factor
}

/// Per-request delay as a `Duration`, checked so the backoff delay fits too.
pub fn pacing_delay(
    quota: u32,
    window_secs: u64,
    safety_factor: f64,
) -> Result<Duration, AppError> {
    let secs = compute_delay_secs(quota, window_secs, safety_factor);
    Duration::try_from_secs_f64(secs * 2.0).map_err(|_| {
        AppError::Config(format!(
            "Rate limit settings give an unusable delay: {} requests / {}s, safety factor {}",
            quota, window_secs, safety_factor
        ))
    })?;
    Ok(Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    #[test]
    fn test_default_delay_is_three_quarters_of_a_second() {
        assert_eq!(compute_delay_secs(600, 300, 1.5), 0.75);

        let limiter = RateLimiter::new(600, 300, 1.5, Arc::new(TokioSleeper)).unwrap();
        assert_eq!(limiter.delay(), Duration::from_millis(750));
        assert_eq!(limiter.backoff_delay(), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_wait_and_backoff_sleep_fixed_durations() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let limiter = RateLimiter::new(600, 300, 1.5, sleeper.clone()).unwrap();

        limiter.wait().await.unwrap();
        limiter.backoff().await.unwrap();
        limiter.wait().await.unwrap();

        let slept = sleeper.slept.lock().unwrap().clone();
        assert_eq!(
            slept,
            vec![
                Duration::from_millis(750),
                Duration::from_millis(1500),
                Duration::from_millis(750)
            ]
        );
        assert_eq!(limiter.wait_count(), 2);
        assert_eq!(limiter.backoff_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_limiter_does_not_sleep() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let cancel = CancellationFlag::new();
        let limiter = RateLimiter::new(600, 300, 1.5, sleeper.clone())
            .unwrap()
            .with_cancellation(cancel.clone());

        cancel.cancel();

        assert!(matches!(limiter.wait().await, Err(AppError::Cancelled)));
        assert!(matches!(limiter.backoff().await, Err(AppError::Cancelled)));
        assert!(sleeper.slept.lock().unwrap().is_empty());
    }

    #[test]
    fn test_oversized_delay_is_config_error() {
        let huge_factor = RateLimiter::new(600, 300, 1e300, Arc::new(TokioSleeper));
        assert!(matches!(huge_factor, Err(AppError::Config(_))));

        let huge_window = RateLimiter::new(1, u64::MAX, 1.0, Arc::new(TokioSleeper));
        assert!(matches!(huge_window, Err(AppError::Config(_))));

        assert!(pacing_delay(600, 300, 1.5).is_ok());
    }
}
