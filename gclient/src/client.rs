use gcommon::BoxFuture;

use crate::{BoxedChunkStream, ClientError, CompletionRequest, CompletionResponse};

pub type ClientFuture<'a, T> = BoxFuture<'a, T>;

/// Boundary to the remote completion backend.
///
/// Implementations own HTTP/TLS, transport-level retry policy, and the
/// mapping of backend failures onto [`ClientError`]; the turn engine only
/// consumes decoded responses and chunk streams.
pub trait CompletionClient: Send + Sync {
    fn submit<'a>(
        &'a self,
        request: CompletionRequest,
    ) -> ClientFuture<'a, Result<CompletionResponse, ClientError>>;

    fn submit_streaming<'a>(
        &'a self,
        request: CompletionRequest,
    ) -> ClientFuture<'a, Result<BoxedChunkStream<'a>, ClientError>>;
}
