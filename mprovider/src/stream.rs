//! Streaming chunk contracts and in-memory stream utilities.
//!
//! ```rust
//! use mprovider::{BoxedChunkStream, StreamChunk, VecChunkStream};
//!
//! let stream = VecChunkStream::new(vec![Ok(StreamChunk::delta("hello"))]);
//! let _boxed: BoxedChunkStream<'static> = Box::pin(stream);
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::{FinishReason, ProviderError, TokenUsage};

/// One incremental unit of a streamed response. `finish_reason` and `usage`
/// are populated only on the terminal chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChunk {
    pub delta: String,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<TokenUsage>,
}

impl StreamChunk {
    pub fn delta(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            finish_reason: None,
            usage: None,
        }
    }

    pub fn terminal(
        delta: impl Into<String>,
        finish_reason: FinishReason,
        usage: TokenUsage,
    ) -> Self {
        Self {
            delta: delta.into(),
            finish_reason: Some(finish_reason),
            usage: Some(usage),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.finish_reason.is_some()
    }
}

/// Provider chunk stream contract.
///
/// Invariants for consumers:
/// - Chunks are emitted in source order and the sequence is finite.
/// - A terminal chunk, when present, arrives last.
/// - The stream observes its cancellation token before each yield and fails
///   with the cancelled classification mid-iteration once aborted.
/// - Once the stream yields `None`, it must not yield additional items.
pub trait ChunkStream: Stream<Item = Result<StreamChunk, ProviderError>> + Send {}

impl<T> ChunkStream for T where T: Stream<Item = Result<StreamChunk, ProviderError>> + Send {}

impl std::fmt::Debug for dyn ChunkStream + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ChunkStream")
    }
}

pub type BoxedChunkStream<'a> = Pin<Box<dyn ChunkStream + 'a>>;

#[derive(Debug)]
pub struct VecChunkStream {
    chunks: VecDeque<Result<StreamChunk, ProviderError>>,
}

impl VecChunkStream {
    pub fn new(chunks: Vec<Result<StreamChunk, ProviderError>>) -> Self {
        Self {
            chunks: chunks.into(),
        }
    }
}

impl Stream for VecChunkStream {
    type Item = Result<StreamChunk, ProviderError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<StreamChunk, ProviderError>>> {
        Poll::Ready(self.chunks.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    #[tokio::test]
    async fn vec_chunk_stream_yields_chunks_in_order() {
        let mut stream = VecChunkStream::new(vec![
            Ok(StreamChunk::delta("one")),
            Ok(StreamChunk::delta("two")),
            Ok(StreamChunk::terminal(
                "",
                FinishReason::Stop,
                TokenUsage::default(),
            )),
        ]);

        let first = stream.next().await.expect("first chunk").expect("ok");
        assert_eq!(first.delta, "one");
        assert!(!first.is_terminal());

        let second = stream.next().await.expect("second chunk").expect("ok");
        assert_eq!(second.delta, "two");

        let terminal = stream.next().await.expect("terminal chunk").expect("ok");
        assert!(terminal.is_terminal());
        assert_eq!(terminal.finish_reason, Some(FinishReason::Stop));

        assert!(stream.next().await.is_none());
    }
}
