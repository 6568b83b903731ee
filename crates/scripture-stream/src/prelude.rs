//! Common imports for typical client usage.
pub use crate::{
    AbortHandle, AnswerRequest, AnswerStream, ClientConfig, ConsumeError, ScriptureClient,
    SearchMode, SourceRecord, SourceSelection, StreamEvent, StreamOutcome, StreamSession,
    StreamingAnswerConsumer,
};
