//! Production-friendly observability hooks for retryable operations.
//!
//! ```rust
//! use mobserve::{MetricsRetryHooks, TracingRetryHooks};
//! use mprovider::OperationHooks;
//!
//! fn accepts_hooks(_hooks: &dyn OperationHooks) {}
//!
//! accepts_hooks(&TracingRetryHooks);
//! accepts_hooks(&MetricsRetryHooks);
//! ```

mod metrics_hooks;
mod tracing_hooks;

pub use metrics_hooks::MetricsRetryHooks;
pub use tracing_hooks::TracingRetryHooks;

pub mod prelude {
    pub use crate::{MetricsRetryHooks, TracingRetryHooks};
}
