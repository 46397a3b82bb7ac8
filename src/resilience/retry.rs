use std::fmt::Display;

use tokio::time::{sleep, Duration};
use tracing::{error, warn};

use crate::config::settings::{RetryConfig, BASE_DELAY_MS_DEFAULT, MAX_DELAY_MS_DEFAULT, RETRIES_DEFAULT};
use crate::observability::metrics::get_metrics;

#[derive(Debug, Clone)]
pub struct RetrySettings {
    /// retries after the first attempt
    pub retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            retries: RETRIES_DEFAULT,
            base_delay_ms: BASE_DELAY_MS_DEFAULT,
            max_delay_ms: MAX_DELAY_MS_DEFAULT,
        }
    }
}

impl From<&RetryConfig> for RetrySettings {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            retries: cfg.retries.unwrap_or(RETRIES_DEFAULT),
            base_delay_ms: cfg.base_delay_ms.unwrap_or(BASE_DELAY_MS_DEFAULT),
            max_delay_ms: cfg.max_delay_ms.unwrap_or(MAX_DELAY_MS_DEFAULT),
        }
    }
}

impl RetrySettings {
    pub fn attempts(&self) -> u32 {
        self.retries + 1
    }

    /// Delay before retry number `retry` (1-based): doubles from the base delay up to the max.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms))
    }

    /// Runs `operation` until it succeeds, fails with an error `is_retryable`
    /// rejects, or the attempts run out. The last error is returned.
    pub async fn run_with_retry<F, Fut, T, E, R>(&self, mut operation: F, is_retryable: R) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: Display,
        R: Fn(&E) -> bool,
    {
        let attempts = self.attempts();
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && is_retryable(&e) => {
                    let delay = self.delay_for(attempt);
                    warn!("Attempt {attempt}/{attempts} failed: {e}, retrying in {}ms", delay.as_millis());
                    get_metrics().await.http_retries.inc();
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if is_retryable(&e) => {
                    error!("all {attempt} attempts failed: {e}");
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
