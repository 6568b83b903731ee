use std::sync::Arc;

use futures::StreamExt as _;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use crate::errors::ConsumeError;
use crate::request::AnswerRequest;
use crate::session::{StreamOutcome, StreamSession};
use crate::stream::StreamEvent;
use crate::transport::{AnswerTransport, EventStream, decode_event_stream};

/// Handle used to abandon an in-flight answer stream.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl Default for AbortHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Requests cancellation.
    ///
    /// The running call drops its transport stream and returns
    /// `ConsumeError::Cancelled`. Events already delivered stay valid.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Consumes streamed answers from the backend.
///
/// Every call owns its own connection and `StreamSession`, so one consumer can
/// serve any number of concurrent calls.
#[derive(Clone)]
pub struct StreamingAnswerConsumer {
    transport: Arc<dyn AnswerTransport>,
    stream_buffer_capacity: usize,
}

impl StreamingAnswerConsumer {
    pub fn new(transport: Arc<dyn AnswerTransport>) -> Self {
        Self {
            transport,
            stream_buffer_capacity: 128,
        }
    }

    /// Sets the channel capacity used by `start_stream`. Zero is treated as one.
    pub fn with_stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.stream_buffer_capacity = capacity.max(1);
        self
    }

    /// Streams an answer, calling `on_event` for every parsed event in arrival
    /// order, and returns the accumulated session once the stream ends.
    ///
    /// Fails without calling `on_event` when the request cannot be sent or the
    /// status is not a success. Malformed frames are skipped. The call returns
    /// `Ok` even if the connection closes without `done`; check
    /// `StreamSession::outcome`.
    pub async fn consume<F>(
        &self,
        request: &AnswerRequest,
        on_event: F,
    ) -> Result<StreamSession, ConsumeError>
    where
        F: FnMut(StreamEvent),
    {
        self.consume_with_abort(request, &AbortHandle::new(), on_event)
            .await
    }

    /// Same as `consume`, but stops with `ConsumeError::Cancelled` as soon as
    /// `abort` is triggered.
    pub async fn consume_with_abort<F>(
        &self,
        request: &AnswerRequest,
        abort: &AbortHandle,
        mut on_event: F,
    ) -> Result<StreamSession, ConsumeError>
    where
        F: FnMut(StreamEvent),
    {
        let mut pump = self.open(request, abort).await?;
        while let Some(event) = pump.next().await? {
            on_event(event);
        }
        Ok(pump.finish())
    }

    /// Opens the stream and returns a channel-backed handle.
    ///
    /// Request and status failures are returned here; later failures arrive
    /// through `AnswerStream::finish`.
    pub async fn start_stream(&self, request: AnswerRequest) -> Result<AnswerStream, ConsumeError> {
        let abort_handle = AbortHandle::new();
        let pump = self.open(&request, &abort_handle).await?;
        let request_id = pump.session.request_id();

        let (tx, rx) = mpsc::channel(self.stream_buffer_capacity);
        let (final_tx, final_rx) = oneshot::channel();
        tokio::spawn(pump_task(pump, tx, final_tx));

        Ok(AnswerStream {
            request_id,
            rx,
            final_rx,
            abort_handle,
        })
    }

    async fn open(
        &self,
        request: &AnswerRequest,
        abort: &AbortHandle,
    ) -> Result<EventPump, ConsumeError> {
        let request_id = uuid::Uuid::new_v4();
        let mut abort_rx = abort.subscribe();
        if abort.is_aborted() {
            return Err(ConsumeError::Cancelled);
        }

        let body = request.to_body();
        debug!(
            event = "answer.stream_opening",
            domain = "stream",
            request_id = %request_id,
            mode = %body.mode,
            top_k = body.top_k,
            query_len = body.query.len() as u64
        );
        let bytes_stream = tokio::select! {
            biased;
            _ = wait_for_abort(&mut abort_rx) => {
                debug!(event = "answer.cancelled", domain = "stream", request_id = %request_id, phase = "open");
                return Err(ConsumeError::Cancelled);
            }
            opened = self.transport.open_stream(&body) => opened?,
        };

        Ok(EventPump {
            events: decode_event_stream(request_id, bytes_stream),
            session: StreamSession::new(request_id),
            abort_rx,
            dropped_after_terminal: 0,
        })
    }
}

/// Pulls events from the decoded stream into a session.
struct EventPump {
    events: EventStream,
    session: StreamSession,
    abort_rx: watch::Receiver<bool>,
    dropped_after_terminal: u64,
}

impl EventPump {
    /// Next event to deliver, or `None` at end of stream.
    ///
    /// Events that arrive after the session is terminal are applied to nothing
    /// and not delivered; the stream is still read to its end.
    async fn next(&mut self) -> Result<Option<StreamEvent>, ConsumeError> {
        let request_id = self.session.request_id();
        loop {
            let next = tokio::select! {
                biased;
                _ = wait_for_abort(&mut self.abort_rx) => {
                    debug!(
                        event = "answer.cancelled",
                        domain = "stream",
                        request_id = %request_id,
                        phase = "read",
                        events_seen = self.session.events_seen()
                    );
                    return Err(ConsumeError::Cancelled);
                }
                next = self.events.next() => next,
            };
            match next {
                Some(Ok(event)) => {
                    if self.session.apply(&event) {
                        return Ok(Some(event));
                    }
                    self.dropped_after_terminal += 1;
                    warn!(
                        event = "answer.event_after_terminal",
                        domain = "stream",
                        request_id = %request_id,
                        kind = event.kind(),
                        "dropping event received after stream end"
                    );
                }
                Some(Err(err)) => {
                    warn!(
                        event = "answer.stream_failed",
                        domain = "stream",
                        request_id = %request_id,
                        events_seen = self.session.events_seen(),
                        error = %err
                    );
                    return Err(err);
                }
                None => return Ok(None),
            }
        }
    }

    fn finish(self) -> StreamSession {
        let request_id = self.session.request_id();
        match self.session.outcome() {
            StreamOutcome::Open => warn!(
                event = "answer.ended_without_terminal",
                domain = "stream",
                request_id = %request_id,
                events_seen = self.session.events_seen(),
                "stream closed without done or error"
            ),
            outcome => debug!(
                event = "answer.stream_finished",
                domain = "stream",
                request_id = %request_id,
                outcome = ?outcome,
                events_seen = self.session.events_seen(),
                answer_len = self.session.answer().len() as u64,
                sources = self.session.sources().len() as u64,
                dropped_after_terminal = self.dropped_after_terminal
            ),
        }
        self.session
    }
}

async fn wait_for_abort(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Every handle is gone: the caller has abandoned the stream.
            return;
        }
    }
}

async fn pump_task(
    mut pump: EventPump,
    tx: mpsc::Sender<StreamEvent>,
    final_tx: oneshot::Sender<Result<StreamSession, ConsumeError>>,
) {
    let result = loop {
        let next = tokio::select! {
            biased;
            _ = tx.closed() => {
                debug!(
                    event = "answer.cancelled",
                    domain = "stream",
                    request_id = %pump.session.request_id(),
                    phase = "receiver_dropped",
                    events_seen = pump.session.events_seen()
                );
                break Err(ConsumeError::Cancelled);
            }
            next = pump.next() => next,
        };
        match next {
            Ok(Some(event)) => {
                if tx.send(event).await.is_err() {
                    break Err(ConsumeError::protocol_msg(
                        "answer stream receiver dropped during output",
                    ));
                }
            }
            Ok(None) => break Ok(pump.finish()),
            Err(err) => break Err(err),
        }
    };
    drop(tx);
    let _ = final_tx.send(result);
}

/// Channel-backed handle returned by `StreamingAnswerConsumer::start_stream`.
pub struct AnswerStream {
    request_id: uuid::Uuid,
    rx: mpsc::Receiver<StreamEvent>,
    final_rx: oneshot::Receiver<Result<StreamSession, ConsumeError>>,
    abort_handle: AbortHandle,
}

impl AnswerStream {
    pub fn request_id(&self) -> uuid::Uuid {
        self.request_id
    }

    /// Returns a handle that can cancel the stream. Dropping the `AnswerStream`
    /// cancels it as well.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Waits for the next event. Returns `None` once the stream has ended.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Drains any remaining events and returns the final session.
    pub async fn finish(mut self) -> Result<StreamSession, ConsumeError> {
        while self.rx.recv().await.is_some() {}
        match self.final_rx.await {
            Ok(result) => result,
            Err(_) => Err(ConsumeError::protocol_msg(format!(
                "answer task ended without final result (request_id={})",
                self.request_id
            ))),
        }
    }
}
