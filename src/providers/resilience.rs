use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::RetrySettings;
use crate::models::CardError;

/// Errors that know whether repeating the call could help.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for CardError {
    fn is_retryable(&self) -> bool {
        CardError::is_retryable(self)
    }
}

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            backoff_multiplier: settings.backoff_multiplier,
        }
    }
}

/// Retry with exponential backoff. Errors that are not retryable are
/// returned immediately.
pub async fn retry_with_backoff<F, T, Fut, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display + Retryable,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    info!("Operation {} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(e) if !e.is_retryable() => {
                warn!("Operation {} failed permanently: {}", operation_name, e);
                return Err(e);
            }
            Err(e) if attempt >= max_attempts => {
                error!("Operation {} failed after {} attempts: {}", operation_name, attempt, e);
                return Err(e);
            }
            Err(e) => {
                warn!("Operation {} failed on attempt {}: {}", operation_name, attempt, e);
                sleep(calculate_delay(config, attempt)).await;
                attempt += 1;
            }
        }
    }
}

fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let delay_ms = config.base_delay.as_millis() as f64
        * config.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);

    let delay = Duration::from_millis(delay_ms as u64);

    if delay > config.max_delay {
        config.max_delay
    } else {
        delay
    }
}
