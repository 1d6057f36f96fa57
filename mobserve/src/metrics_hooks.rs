//! Metrics-based hooks for provider and repository operations.
//!
//! ```rust
//! use mobserve::MetricsRetryHooks;
//! use mprovider::OperationHooks;
//!
//! fn accepts_hooks(_hooks: &dyn OperationHooks) {}
//!
//! accepts_hooks(&MetricsRetryHooks);
//! ```

use std::error::Error;
use std::time::Duration;

use mprovider::OperationHooks;

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsRetryHooks;

impl OperationHooks for MetricsRetryHooks {
    fn on_attempt_start(&self, scope: &str, operation: &str, _attempt: u32) {
        metrics::counter!(
            "murmur_operation_attempt_start_total",
            "scope" => scope.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    fn on_retry_scheduled(
        &self,
        scope: &str,
        operation: &str,
        _attempt: u32,
        delay: Duration,
        _error: &dyn Error,
    ) {
        metrics::counter!(
            "murmur_operation_retry_scheduled_total",
            "scope" => scope.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "murmur_operation_retry_delay_seconds",
            "scope" => scope.to_string(),
            "operation" => operation.to_string()
        )
        .record(delay.as_secs_f64());
    }

    fn on_success(&self, scope: &str, operation: &str, _attempts: u32) {
        metrics::counter!(
            "murmur_operation_success_total",
            "scope" => scope.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    fn on_failure(&self, scope: &str, operation: &str, _attempts: u32, _error: &dyn Error) {
        metrics::counter!(
            "murmur_operation_failure_total",
            "scope" => scope.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mprovider::{OperationHooks, ProviderError};

    #[test]
    fn hooks_accept_any_error_type_without_panicking() {
        let hooks = MetricsRetryHooks;
        let error = ProviderError::network("reset");

        hooks.on_attempt_start("gemini", "stream_chat", 1);
        hooks.on_retry_scheduled("gemini", "stream_chat", 1, Duration::from_millis(5), &error);
        hooks.on_failure("repository", "update", 2, &error);
        hooks.on_success("gemini", "stream_chat", 2);
    }
}
