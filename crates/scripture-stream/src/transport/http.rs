use futures::TryStreamExt as _;
use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::ConsumeError;
use crate::request::QueryBody;

use super::{AnswerTransport, ByteStream};

/// `AnswerTransport` backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl ReqwestTransport {
    /// Builds a transport with its own HTTP client.
    ///
    /// Only a connect timeout is applied; a whole-request timeout would cut off
    /// long answers mid-generation.
    pub fn new(config: &ClientConfig) -> Result<Self, ConsumeError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ConsumeError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    pub(crate) fn with_client(client: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            client,
            url: config.stream_url(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait::async_trait]
impl AnswerTransport for ReqwestTransport {
    async fn open_stream(&self, body: &QueryBody) -> Result<ByteStream, ConsumeError> {
        debug!(
            event = "answer.request_started",
            domain = "http",
            mode = %body.mode,
            top_k = body.top_k,
            has_filter = body.source_filter.is_some()
        );
        let mut http_req = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(body);
        if let Some(key) = &self.api_key {
            http_req = http_req.bearer_auth(key);
        }

        let response = http_req
            .send()
            .await
            .map_err(|e| ConsumeError::transport(format!("answer request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            debug!(
                event = "answer.request_rejected",
                domain = "http",
                status = status.as_u16(),
                body_len = body.len() as u64
            );
            return Err(ConsumeError::status(status, body));
        }

        Ok(Box::pin(response.bytes_stream().map_err(|e| {
            ConsumeError::transport(format!("answer stream read failed: {e}"))
        })))
    }
}
