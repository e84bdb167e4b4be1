//! Retry with backoff for remote calls and database connections

use crate::error::ApiError;
use backoff::{ExponentialBackoff, backoff::Backoff};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Attempts in total, the first one included
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// 1.0 keeps the delay constant
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Database connection policy: 10 attempts, 5 seconds apart
    pub fn connection() -> Self {
        Self::fixed(10, Duration::from_secs(5))
    }

    /// Constant delay between a fixed number of attempts
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_delay,
            initial_interval: self.initial_delay,
            max_interval: self.max_delay,
            multiplier: self.multiplier,
            randomization_factor: if self.multiplier <= 1.0 { 0.0 } else { 0.5 },
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run a Google API call, retrying throttling, server errors and timeouts
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.execute_when(operation, is_transient).await
    }

    /// Run an operation, retrying every error `retryable` accepts
    pub async fn execute_when<F, Fut, T, E, P>(&self, operation: F, retryable: P) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        P: Fn(&E) -> bool,
    {
        let mut backoff = self.config.backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => error,
            };

            if !retryable(&error) {
                return Err(error);
            }
            if attempt >= self.config.max_attempts {
                if attempt > 1 {
                    log::warn!("Giving up after {} attempts - {}", attempt, error);
                }
                return Err(error);
            }

            let Some(delay) = backoff.next_backoff() else {
                return Err(error);
            };
            log::warn!("Retrying after {:?} (attempt {}) - {}", delay, attempt, error);
            tokio::time::sleep(delay).await;
        }
    }
}

/// 429, 5xx and timeouts
pub fn is_transient(error: &ApiError) -> bool {
    match error {
        ApiError::Http { status, .. } => *status == 429 || (500..=599).contains(status),
        ApiError::Timeout { .. } => true,
        ApiError::Unauthorized { .. } | ApiError::Credentials { .. } | ApiError::JobFailed { .. } => {
            false
        }
    }
}
