//! Shared identifiers and sampling primitives for murmur workspace crates.
//!
//! ```rust
//! use mcommon::{ConversationId, MessageId, SamplingParams};
//!
//! let conversation = ConversationId::from("conv-1");
//! let message = MessageId::new("msg-1");
//! let params = SamplingParams::default().with_temperature(0.7).with_max_tokens(1024);
//!
//! assert_eq!(conversation.as_str(), "conv-1");
//! assert_eq!(message.to_string(), "msg-1");
//! assert_eq!(params.temperature, Some(0.7));
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use mcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod id {
    //! Cross-crate identifier newtypes.
    //!
    //! ```rust
    //! use mcommon::{ConversationId, MessageId};
    //!
    //! let conversation = ConversationId::new("conv-42");
    //! let message = MessageId::from("msg-42");
    //!
    //! assert_eq!(conversation.to_string(), "conv-42");
    //! assert_eq!(message.as_str(), "msg-42");
    //! ```

    use std::fmt::{Display, Formatter};

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ConversationId(String);

    impl ConversationId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for ConversationId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for ConversationId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for ConversationId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct MessageId(String);

    impl MessageId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for MessageId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for MessageId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for MessageId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }
}

pub mod sampling {
    //! Sampling settings shared by request types and conversation records.
    //!
    //! ```rust
    //! use mcommon::SamplingParams;
    //!
    //! let params = SamplingParams::default()
    //!     .with_temperature(0.2)
    //!     .with_max_tokens(128)
    //!     .with_top_p(0.95)
    //!     .with_stop_sequence("END");
    //!
    //! assert_eq!(params.temperature, Some(0.2));
    //! assert_eq!(params.max_tokens, Some(128));
    //! assert_eq!(params.stop_sequences, vec!["END".to_string()]);
    //! ```

    #[derive(Debug, Clone, PartialEq, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct SamplingParams {
        pub temperature: Option<f32>,
        pub max_tokens: Option<u32>,
        pub top_p: Option<f32>,
        pub top_k: Option<u32>,
        pub presence_penalty: Option<f32>,
        pub frequency_penalty: Option<f32>,
        pub stop_sequences: Vec<String>,
    }

    impl SamplingParams {
        pub fn with_temperature(mut self, temperature: f32) -> Self {
            self.temperature = Some(temperature);
            self
        }

        pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
            self.max_tokens = Some(max_tokens);
            self
        }

        pub fn with_top_p(mut self, top_p: f32) -> Self {
            self.top_p = Some(top_p);
            self
        }

        pub fn with_top_k(mut self, top_k: u32) -> Self {
            self.top_k = Some(top_k);
            self
        }

        pub fn with_presence_penalty(mut self, penalty: f32) -> Self {
            self.presence_penalty = Some(penalty);
            self
        }

        pub fn with_frequency_penalty(mut self, penalty: f32) -> Self {
            self.frequency_penalty = Some(penalty);
            self
        }

        pub fn with_stop_sequence(mut self, sequence: impl Into<String>) -> Self {
            self.stop_sequences.push(sequence.into());
            self
        }
    }
}

pub use future::BoxFuture;
pub use id::{ConversationId, MessageId};
pub use sampling::SamplingParams;

#[cfg(test)]
mod tests {
    use super::{ConversationId, MessageId, SamplingParams};

    #[test]
    fn id_newtypes_round_trip_strings() {
        let conversation = ConversationId::new("conv-1");
        let message = MessageId::from("msg-1");

        assert_eq!(conversation.as_str(), "conv-1");
        assert_eq!(message.as_str(), "msg-1");
        assert_eq!(conversation.to_string(), "conv-1");
        assert_eq!(message.to_string(), "msg-1");
    }

    #[test]
    fn sampling_params_builder_helpers_set_values() {
        let params = SamplingParams::default()
            .with_temperature(0.3)
            .with_max_tokens(123)
            .with_top_p(0.9)
            .with_top_k(40)
            .with_presence_penalty(0.1)
            .with_frequency_penalty(0.2)
            .with_stop_sequence("STOP");

        assert_eq!(params.temperature, Some(0.3));
        assert_eq!(params.max_tokens, Some(123));
        assert_eq!(params.top_p, Some(0.9));
        assert_eq!(params.top_k, Some(40));
        assert_eq!(params.presence_penalty, Some(0.1));
        assert_eq!(params.frequency_penalty, Some(0.2));
        assert_eq!(params.stop_sequences, vec!["STOP".to_string()]);
    }
}
