use serde::Deserialize;

use crate::source::{SourceRecord, WireSource, flatten_sources, null_as_default};

/// Typed event parsed from one `data:` payload of the answer stream.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Retrieval finished; generation is about to start.
    SearchComplete {
        search_time_ms: f64,
        total_sources: u32,
    },
    /// Incremental answer fragment, to be appended in arrival order.
    Content { content: String },
    /// Complete list of supporting passages; replaces any earlier list.
    Sources { sources: Vec<SourceRecord> },
    /// Generation finished.
    Done,
    /// Generation failed after the stream had started.
    Error { error: String },
}

impl StreamEvent {
    /// True for `Done` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }

    /// Short name of the event kind, as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::SearchComplete { .. } => "search_complete",
            StreamEvent::Content { .. } => "content",
            StreamEvent::Sources { .. } => "sources",
            StreamEvent::Done => "done",
            StreamEvent::Error { .. } => "error",
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    SearchComplete {
        search_time_ms: f64,
        #[serde(default, deserialize_with = "null_as_default")]
        total_sources: u32,
    },
    Content {
        content: String,
    },
    Sources {
        #[serde(default, deserialize_with = "null_as_default")]
        sources: Vec<WireSource>,
    },
    Done,
    Error {
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

/// Parses one `data:` payload.
///
/// Returns `Ok(None)` for well-formed payloads whose `type` is not one of the
/// known event kinds.
pub(crate) fn parse_payload(payload: &str) -> Result<Option<StreamEvent>, serde_json::Error> {
    let event = match serde_json::from_str::<WireEvent>(payload)? {
        WireEvent::SearchComplete {
            search_time_ms,
            total_sources,
        } => StreamEvent::SearchComplete {
            search_time_ms,
            total_sources,
        },
        WireEvent::Content { content } => StreamEvent::Content { content },
        WireEvent::Sources { sources } => StreamEvent::Sources {
            sources: flatten_sources(sources),
        },
        WireEvent::Done => StreamEvent::Done,
        WireEvent::Error { error, message } => StreamEvent::Error {
            error: error
                .or(message)
                .unwrap_or_else(|| "unknown server error".to_string()),
        },
        WireEvent::Unknown => return Ok(None),
    };
    Ok(Some(event))
}
