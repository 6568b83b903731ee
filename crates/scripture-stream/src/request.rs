use crate::filter::{SourceFilter, SourceSelection, translate_selections};
use crate::mode::SearchMode;

/// Result count used when the caller gives no hint.
pub const DEFAULT_TOP_K: u32 = 10;

/// A question for the answer or search endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct AnswerRequest {
    pub query: String,
    pub mode: SearchMode,
    pub max_results: Option<u32>,
    pub selections: Vec<SourceSelection>,
}

impl AnswerRequest {
    /// Creates a request with the default mode and no filter.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            mode: SearchMode::Default,
            max_results: None,
            selections: Vec::new(),
        }
    }

    pub fn mode(mut self, mode: impl Into<SearchMode>) -> Self {
        self.mode = mode.into();
        self
    }

    pub fn max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn selections(mut self, selections: Vec<SourceSelection>) -> Self {
        self.selections = selections;
        self
    }

    pub fn select(mut self, selection: SourceSelection) -> Self {
        self.selections.push(selection);
        self
    }

    /// Builds the JSON body sent to the backend.
    pub fn to_body(&self) -> QueryBody {
        QueryBody {
            query: self.query.clone(),
            mode: self.mode,
            top_k: self.max_results.unwrap_or(DEFAULT_TOP_K),
            source_filter: translate_selections(&self.selections),
        }
    }
}

/// Wire body for the streaming and search endpoints.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct QueryBody {
    pub query: String,
    pub mode: SearchMode,
    pub top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_filter: Option<SourceFilter>,
}
