//! Tracing-based hooks for provider and repository operations.
//!
//! ```rust
//! use mobserve::TracingRetryHooks;
//! use mprovider::OperationHooks;
//!
//! fn accepts_hooks(_hooks: &dyn OperationHooks) {}
//!
//! accepts_hooks(&TracingRetryHooks);
//! ```

use std::error::Error;
use std::time::Duration;

use mprovider::OperationHooks;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRetryHooks;

impl OperationHooks for TracingRetryHooks {
    fn on_attempt_start(&self, scope: &str, operation: &str, attempt: u32) {
        tracing::debug!(
            event = "attempt_start",
            scope,
            operation,
            attempt
        );
    }

    fn on_retry_scheduled(
        &self,
        scope: &str,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &dyn Error,
    ) {
        tracing::warn!(
            event = "retry_scheduled",
            scope,
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error
        );
    }

    fn on_success(&self, scope: &str, operation: &str, attempts: u32) {
        tracing::debug!(
            event = "success",
            scope,
            operation,
            attempts
        );
    }

    fn on_failure(&self, scope: &str, operation: &str, attempts: u32, error: &dyn Error) {
        tracing::error!(
            event = "failure",
            scope,
            operation,
            attempts,
            error = %error
        );
    }
}
