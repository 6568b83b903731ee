//! Byte transport and SSE decoding for the answer stream.
mod http;
pub mod sse;

use std::collections::VecDeque;
use std::pin::Pin;

use futures::StreamExt as _;
use futures::stream;
use tracing::{debug, warn};

use crate::errors::ConsumeError;
use crate::request::QueryBody;
use crate::stream::{StreamEvent, parse_payload};

pub use http::ReqwestTransport;
pub use sse::{SseDecoder, SseFrame, Utf8StreamDecoder};

/// Raw response body as a stream of byte chunks.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, ConsumeError>> + Send + 'static>>;

/// Typed events decoded from a `ByteStream`.
pub type EventStream =
    Pin<Box<dyn futures::Stream<Item = Result<StreamEvent, ConsumeError>> + Send + 'static>>;

/// Opens the streamed answer response.
///
/// Implementations must fail from `open_stream` (not from the returned stream)
/// when the request cannot be sent or the status is not a success.
#[async_trait::async_trait]
pub trait AnswerTransport: Send + Sync {
    async fn open_stream(&self, body: &QueryBody) -> Result<ByteStream, ConsumeError>;
}

/// Decodes a byte stream into typed events.
///
/// Malformed payloads and unknown event types are logged and skipped. A read
/// error ends the stream with that error. Dropping the returned stream drops
/// the underlying byte stream.
pub fn decode_event_stream(request_id: uuid::Uuid, bytes_stream: ByteStream) -> EventStream {
    struct State {
        request_id: uuid::Uuid,
        bytes_stream: ByteStream,
        decoder: SseDecoder,
        pending: VecDeque<StreamEvent>,
        done: bool,
    }

    Box::pin(stream::try_unfold(
        State {
            request_id,
            bytes_stream,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Ok(Some((event, state)));
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        for frame in state.decoder.push_chunk(&chunk) {
                            for payload in &frame.data {
                                if let Some(event) = decode_payload(state.request_id, payload) {
                                    state.pending.push_back(event);
                                }
                            }
                        }
                    }
                    Some(Err(e)) => return Err(e),
                    None => {
                        let leftover = state.decoder.finish();
                        if leftover > 0 {
                            debug!(
                                event = "answer.trailing_fragment_discarded",
                                domain = "stream",
                                request_id = %state.request_id,
                                leftover_bytes = leftover as u64
                            );
                        }
                        state.done = true;
                    }
                }
            }
        },
    ))
}

fn decode_payload(request_id: uuid::Uuid, payload: &str) -> Option<StreamEvent> {
    match parse_payload(payload) {
        Ok(Some(event)) => Some(event),
        Ok(None) => {
            debug!(
                event = "answer.unknown_event_type",
                domain = "stream",
                request_id = %request_id,
                payload_len = payload.len() as u64
            );
            None
        }
        Err(err) => {
            warn!(
                event = "answer.frame_skipped",
                domain = "stream",
                request_id = %request_id,
                error = %err,
                payload_len = payload.len() as u64,
                "skipping malformed stream payload"
            );
            None
        }
    }
}
