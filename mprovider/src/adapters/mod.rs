#[cfg(feature = "adapter-gemini")]
pub mod gemini;
