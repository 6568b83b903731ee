//! Client for the scripture-study answer backend.
//!
//! The core piece is [`StreamingAnswerConsumer`], which reads the backend's
//! server-sent event stream, turns each `data:` payload into a typed
//! [`StreamEvent`], hands events to a callback in arrival order, and returns
//! the accumulated [`StreamSession`] when the stream ends.
//!
//! ```no_run
//! use scripture_stream::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ConsumeError> {
//! let client = ScriptureClient::from_env()?;
//! let request = AnswerRequest::new("What does it mean to endure to the end?")
//!     .mode("Book of Mormon Only")
//!     .max_results(5);
//!
//! let session = client
//!     .answer_consumer()
//!     .consume(&request, |event| {
//!         if let StreamEvent::Content { content } = event {
//!             print!("{content}");
//!         }
//!     })
//!     .await?;
//!
//! for source in session.sources() {
//!     println!("{} ({:.2})", source.display_citation(), source.score);
//! }
//! # Ok(())
//! # }
//! ```

/// HTTP client and the request/response endpoints.
pub mod client;
/// Client configuration.
pub mod config;
/// Streaming consumer, abort handle, and channel-backed stream.
pub mod consumer;
/// Public error type.
pub mod errors;
/// Source selection tokens and their translation into a backend filter.
pub mod filter;
/// Server-side answer modes.
pub mod mode;
/// Logging setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Outbound request and its wire body.
pub mod request;
/// Per-call accumulator.
pub mod session;
/// Retrieved passage model.
pub mod source;
/// Typed stream events.
pub mod stream;
/// Byte transport and SSE decoding.
pub mod transport;

pub use client::{HealthStatus, ScriptureClient, SearchResponse, SourceCollection};
pub use config::ClientConfig;
pub use consumer::{AbortHandle, AnswerStream, StreamingAnswerConsumer};
pub use errors::ConsumeError;
pub use filter::{SourceFilter, SourceSelection, SourceType, parse_selections, translate_selections};
pub use mode::SearchMode;
pub use request::{AnswerRequest, QueryBody};
pub use session::{StreamOutcome, StreamSession};
pub use source::SourceRecord;
pub use stream::StreamEvent;
pub use transport::{AnswerTransport, ByteStream, ReqwestTransport};
