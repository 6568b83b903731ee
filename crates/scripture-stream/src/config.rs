use std::time::Duration;

use crate::errors::ConsumeError;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configuration for the scripture search backend client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the search/answer API.
    pub base_url: String,
    /// Optional bearer token sent with every request.
    pub api_key: Option<String>,
    /// Overall timeout for non-streaming requests.
    ///
    /// Streaming requests only use `connect_timeout`; an answer may take longer
    /// than any fixed request timeout to generate.
    pub timeout: Duration,
    /// Timeout for establishing the TCP/TLS connection.
    pub connect_timeout: Duration,
    /// Bounded event buffer used by `AnswerStream`.
    pub stream_buffer_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientConfig {
    /// Creates a config with sensible defaults for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            stream_buffer_capacity: 128,
        }
    }

    /// Builds a config from the environment.
    ///
    /// - `SCRIPTURE_API_URL`: base URL (default `http://localhost:8000`).
    /// - `SCRIPTURE_API_KEY`: optional bearer token.
    /// - `SCRIPTURE_TIMEOUT_SECS`: optional non-streaming request timeout.
    pub fn from_env() -> Result<Self, ConsumeError> {
        let base_url = std::env::var("SCRIPTURE_API_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(base_url);
        if let Ok(key) = std::env::var("SCRIPTURE_API_KEY")
            && !key.trim().is_empty()
        {
            config.api_key = Some(key);
        }
        if let Ok(raw) = std::env::var("SCRIPTURE_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                ConsumeError::Config(format!("SCRIPTURE_TIMEOUT_SECS must be an integer, got {raw:?}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        config.validate()?;
        Ok(config)
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the bearer token.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Overrides the non-streaming request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the `AnswerStream` channel capacity.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.stream_buffer_capacity = capacity;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConsumeError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ConsumeError::Config("base_url must not be empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConsumeError::Config(format!(
                "base_url must start with http:// or https://, got {base:?}"
            )));
        }
        if self.stream_buffer_capacity == 0 {
            return Err(ConsumeError::Config(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim().trim_end_matches('/'), path)
    }

    pub(crate) fn stream_url(&self) -> String {
        self.endpoint("/api/ask/stream")
    }

    pub(crate) fn search_url(&self) -> String {
        self.endpoint("/api/search")
    }

    pub(crate) fn health_url(&self) -> String {
        self.endpoint("/api/health")
    }

    pub(crate) fn sources_url(&self) -> String {
        self.endpoint("/api/sources")
    }
}
