//! Common murmur imports for applications.

pub use crate::runtime::{
    RuntimeBundle, RuntimeConfig, build_runtime_config, in_memory_repository,
};

#[cfg(feature = "adapter-gemini")]
pub use crate::runtime::{build_runtime, build_runtime_with};

pub use mchat::prelude::*;
pub use mobserve::prelude::*;
pub use mprovider::prelude::*;
