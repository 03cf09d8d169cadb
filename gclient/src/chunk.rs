//! Streaming chunk contracts and in-memory stream utilities.
//!
//! ```rust
//! use gclient::{BoxedChunkStream, StreamChunk, VecChunkStream};
//!
//! let stream = VecChunkStream::new(vec![Ok(StreamChunk::ContentDelta("hello".into()))]);
//! let _boxed: BoxedChunkStream<'static> = Box::pin(stream);
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::{ClientError, FinishReason};

/// Wire-level slice of one fragmented tool call, keyed by `index`.
///
/// Fragments exist only between the transport and the assembler; nothing
/// downstream of assembly ever sees one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolCallFragment {
    pub index: u32,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

impl ToolCallFragment {
    pub fn at(index: u32) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = Some(arguments.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    ContentDelta(String),
    ToolCallFragments(Vec<ToolCallFragment>),
    Finish(FinishReason),
}

/// Chunk stream contract.
///
/// Invariants for consumers:
/// - Chunks arrive in source order; fragments for one index are emitted in
///   the order their bytes arrived.
/// - `Finish` is the only completion signal and arrives after all deltas.
/// - Backend failures surface as `Err` items; no chunk follows one.
/// - Once the stream yields `None`, it must not yield additional items.
pub trait ChunkStream: Stream<Item = Result<StreamChunk, ClientError>> + Send {}

impl<T> ChunkStream for T where T: Stream<Item = Result<StreamChunk, ClientError>> + Send {}

pub type BoxedChunkStream<'a> = Pin<Box<dyn ChunkStream + 'a>>;

#[derive(Debug)]
pub struct VecChunkStream {
    chunks: VecDeque<Result<StreamChunk, ClientError>>,
}

impl VecChunkStream {
    pub fn new(chunks: Vec<Result<StreamChunk, ClientError>>) -> Self {
        Self {
            chunks: chunks.into(),
        }
    }
}

impl Stream for VecChunkStream {
    type Item = Result<StreamChunk, ClientError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<StreamChunk, ClientError>>> {
        Poll::Ready(self.chunks.pop_front())
    }
}
