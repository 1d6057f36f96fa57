//! Retry/backoff policy and operational hook contracts.
//!
//! The machinery is generic over any error carrying a retriability flag, so
//! both provider failures and repository write failures run through the same
//! policy.

use std::error::Error;
use std::future::Future;
use std::time::Duration;

use crate::ProviderError;

/// Errors that know whether retrying them can help.
pub trait RetryClass: Error {
    fn is_retriable(&self) -> bool;
}

impl RetryClass for ProviderError {
    fn is_retriable(&self) -> bool {
        self.retriable
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn should_retry(&self, attempt: u32, error: &dyn RetryClass) -> bool {
        error.is_retriable() && attempt < self.max_attempts
    }

    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = (attempt.saturating_sub(1)) as i32;
        let unbounded = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(unbounded.min(self.max_backoff.as_secs_f64()))
    }
}

pub trait OperationHooks: Send + Sync {
    fn on_attempt_start(&self, _scope: &str, _operation: &str, _attempt: u32) {}

    fn on_retry_scheduled(
        &self,
        _scope: &str,
        _operation: &str,
        _attempt: u32,
        _delay: Duration,
        _error: &dyn Error,
    ) {
    }

    fn on_success(&self, _scope: &str, _operation: &str, _attempts: u32) {}

    fn on_failure(&self, _scope: &str, _operation: &str, _attempts: u32, _error: &dyn Error) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl OperationHooks for NoopOperationHooks {}

pub async fn execute_with_retry<T, E, Op, OpFuture, Sleep, SleepFuture>(
    scope: &str,
    operation: &str,
    policy: &RetryPolicy,
    hooks: &dyn OperationHooks,
    mut execute: Op,
    mut sleep: Sleep,
) -> Result<T, E>
where
    E: RetryClass,
    Op: FnMut(u32) -> OpFuture,
    OpFuture: Future<Output = Result<T, E>>,
    Sleep: FnMut(Duration) -> SleepFuture,
    SleepFuture: Future<Output = ()>,
{
    let mut attempt = 1;

    loop {
        hooks.on_attempt_start(scope, operation, attempt);

        match execute(attempt).await {
            Ok(value) => {
                hooks.on_success(scope, operation, attempt);
                return Ok(value);
            }
            Err(error) => {
                if policy.should_retry(attempt, &error) {
                    let delay = policy.backoff_for_attempt(attempt);
                    hooks.on_retry_scheduled(scope, operation, attempt, delay, &error);
                    sleep(delay).await;
                    attempt += 1;
                    continue;
                }

                hooks.on_failure(scope, operation, attempt, &error);
                return Err(error);
            }
        }
    }
}
