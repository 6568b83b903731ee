use crate::source::SourceRecord;
use crate::stream::StreamEvent;

/// How an answer stream ended, as far as the session can tell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamOutcome {
    /// No terminal event has been seen. After `consume` returns this means the
    /// connection closed without `done`.
    Open,
    /// The server sent `done`.
    Completed,
    /// The server sent an in-band `error`.
    Failed { message: String },
}

/// Per-call accumulator for one streamed answer.
///
/// Owned by a single `consume` call and handed back to the caller when the
/// stream ends; nothing in it is shared between calls.
#[derive(Clone, Debug)]
pub struct StreamSession {
    request_id: uuid::Uuid,
    answer: String,
    sources: Vec<SourceRecord>,
    search_time_seconds: Option<f64>,
    total_sources: Option<u32>,
    events_seen: u64,
    outcome: StreamOutcome,
}

impl StreamSession {
    pub(crate) fn new(request_id: uuid::Uuid) -> Self {
        Self {
            request_id,
            answer: String::new(),
            sources: Vec::new(),
            search_time_seconds: None,
            total_sources: None,
            events_seen: 0,
            outcome: StreamOutcome::Open,
        }
    }

    /// Applies an event. Returns `false`, leaving the session untouched, once a
    /// terminal event has already been applied.
    pub fn apply(&mut self, event: &StreamEvent) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.events_seen += 1;
        match event {
            StreamEvent::SearchComplete {
                search_time_ms,
                total_sources,
            } => {
                self.search_time_seconds = Some(search_time_ms / 1000.0);
                self.total_sources = Some(*total_sources);
            }
            StreamEvent::Content { content } => self.answer.push_str(content),
            StreamEvent::Sources { sources } => self.sources = sources.clone(),
            StreamEvent::Done => self.outcome = StreamOutcome::Completed,
            StreamEvent::Error { error } => {
                self.outcome = StreamOutcome::Failed {
                    message: error.clone(),
                }
            }
        }
        true
    }

    /// Id used to correlate this call in logs.
    pub fn request_id(&self) -> uuid::Uuid {
        self.request_id
    }

    /// Answer text accumulated so far.
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Consumes the session and returns the answer text.
    pub fn into_answer(self) -> String {
        self.answer
    }

    /// Most recent source list.
    pub fn sources(&self) -> &[SourceRecord] {
        &self.sources
    }

    /// Retrieval time reported by `search_complete`, in seconds.
    pub fn search_time_seconds(&self) -> Option<f64> {
        self.search_time_seconds
    }

    /// Source count reported by `search_complete`.
    pub fn total_sources(&self) -> Option<u32> {
        self.total_sources
    }

    /// Number of events applied.
    pub fn events_seen(&self) -> u64 {
        self.events_seen
    }

    pub fn outcome(&self) -> &StreamOutcome {
        &self.outcome
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.outcome, StreamOutcome::Open)
    }
}
