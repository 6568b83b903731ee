use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ClientConfig;
use crate::consumer::StreamingAnswerConsumer;
use crate::errors::ConsumeError;
use crate::filter::SourceType;
use crate::request::AnswerRequest;
use crate::source::{SourceRecord, WireSource, flatten_sources, null_as_default};
use crate::transport::ReqwestTransport;

/// Ranked results from the synchronous search endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResponse {
    pub results: Vec<SourceRecord>,
    pub search_time_ms: Option<f64>,
    pub total: Option<u32>,
}

#[derive(Deserialize)]
struct WireSearchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    results: Vec<WireSource>,
    #[serde(default)]
    search_time_ms: Option<f64>,
    #[serde(default)]
    total: Option<u32>,
}

/// Backend health report.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub index_size: Option<u64>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(
            self.status.trim().to_ascii_lowercase().as_str(),
            "ok" | "healthy"
        )
    }
}

/// One searchable collection listed by the backend.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceCollection {
    pub name: String,
    pub source_type: SourceType,
    #[serde(default)]
    pub document_count: Option<u64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireSourceList {
    Bare(Vec<SourceCollection>),
    Enveloped { sources: Vec<SourceCollection> },
}

/// Client for the scripture search backend.
///
/// Holds one HTTP connection pool, shared by the streaming consumer it hands
/// out and by the request/response endpoints.
#[derive(Clone)]
pub struct ScriptureClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl ScriptureClient {
    pub fn new(config: ClientConfig) -> Result<Self, ConsumeError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ConsumeError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// Creates a client from `ClientConfig::from_env`.
    pub fn from_env() -> Result<Self, ConsumeError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Streaming consumer over this client's connection pool.
    pub fn answer_consumer(&self) -> StreamingAnswerConsumer {
        let transport = ReqwestTransport::with_client(self.http.clone(), &self.config);
        StreamingAnswerConsumer::new(Arc::new(transport))
            .with_stream_buffer_capacity(self.config.stream_buffer_capacity)
    }

    /// Runs a synchronous search and returns the ranked passages.
    pub async fn search(&self, request: &AnswerRequest) -> Result<SearchResponse, ConsumeError> {
        let body = request.to_body();
        let req = self.http.post(self.config.search_url()).json(&body);
        let wire: WireSearchResponse = self.send_json(req, "search").await?;
        Ok(SearchResponse {
            results: flatten_sources(wire.results),
            search_time_ms: wire.search_time_ms,
            total: wire.total,
        })
    }

    pub async fn health(&self) -> Result<HealthStatus, ConsumeError> {
        let req = self.http.get(self.config.health_url());
        self.send_json(req, "health").await
    }

    /// Lists the collections the backend can search.
    pub async fn sources(&self) -> Result<Vec<SourceCollection>, ConsumeError> {
        let req = self.http.get(self.config.sources_url());
        let list: WireSourceList = self.send_json(req, "sources").await?;
        Ok(match list {
            WireSourceList::Bare(sources) | WireSourceList::Enveloped { sources } => sources,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        mut req: reqwest::RequestBuilder,
        endpoint: &'static str,
    ) -> Result<T, ConsumeError> {
        req = req.timeout(self.config.timeout);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }
        debug!(event = "http.request_started", domain = "http", endpoint = endpoint);
        let response = req
            .send()
            .await
            .map_err(|e| ConsumeError::transport(format!("{endpoint} request failed: {e}")))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ConsumeError::transport(format!("{endpoint} body read failed: {e}")))?;
        if !status.is_success() {
            debug!(
                event = "http.request_rejected",
                domain = "http",
                endpoint = endpoint,
                status = status.as_u16(),
                body_len = text.len() as u64
            );
            return Err(ConsumeError::status(status, text));
        }
        serde_json::from_str(&text)
            .map_err(|e| ConsumeError::Decode(format!("invalid {endpoint} response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::StreamOutcome;
    use crate::stream::StreamEvent;
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::TcpListener;

    /// Serves one connection: reads the request head and body, then writes the
    /// status line and each body chunk with a flush in between, then closes.
    async fn serve_once(
        status: &'static str,
        content_type: &'static str,
        chunks: Vec<Vec<u8>>,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let request = read_request(&mut socket).await;
            let head = format!(
                "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\nconnection: close\r\n\r\n"
            );
            socket.write_all(head.as_bytes()).await.expect("write head");
            for chunk in chunks {
                socket.write_all(&chunk).await.expect("write chunk");
                socket.flush().await.expect("flush");
                tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            }
            let _ = socket.shutdown().await;
            request
        });
        (format!("http://{addr}"), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut tmp = [0_u8; 1024];
        loop {
            let n = socket.read(&mut tmp).await.expect("read");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&tmp[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn client(base_url: &str) -> ScriptureClient {
        ScriptureClient::new(ClientConfig::new(base_url).api_key("secret")).expect("client")
    }

    #[tokio::test]
    async fn streams_answer_over_http_in_small_chunks() {
        let body = concat!(
            "data: {\"type\":\"search_complete\",\"search_time_ms\":80,\"total_sources\":1}\n\n",
            "data: {\"type\":\"content\",\"content\":\"Charity never faileth\"}\n\n",
            "data: {\"type\":\"sources\",\"sources\":[{\"content\":\"Charity never faileth\",\"score\":0.95,\"rank\":1,\"metadata\":{\"standard_work\":\"Book of Mormon\",\"book\":\"Moroni\",\"chapter\":7,\"verse\":46}}]}\n\n",
            "data: {\"type\":\"done\"}\n\n",
        )
        .as_bytes();
        let chunks = body.chunks(7).map(<[u8]>::to_vec).collect();
        let (base_url, server) = serve_once("200 OK", "text/event-stream", chunks).await;

        let mut kinds = Vec::new();
        let session = client(&base_url)
            .answer_consumer()
            .consume(
                &AnswerRequest::new("What is charity?").mode("Book of Mormon Only"),
                |event| kinds.push(event.kind()),
            )
            .await
            .expect("consume");

        assert_eq!(kinds, vec!["search_complete", "content", "sources", "done"]);
        assert_eq!(session.answer(), "Charity never faileth");
        assert_eq!(session.sources()[0].display_citation(), "Moroni 7:46");
        assert_eq!(session.outcome(), &StreamOutcome::Completed);

        let request = server.await.expect("server");
        assert!(request.starts_with("POST /api/ask/stream"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer secret"));
        assert!(request.contains("\"mode\":\"book_of_mormon_only\""));
        assert!(request.contains("\"top_k\":10"));
    }

    #[tokio::test]
    async fn http_500_rejects_without_events() {
        let (base_url, _server) = serve_once(
            "500 Internal Server Error",
            "text/plain",
            vec![b"index unavailable".to_vec()],
        )
        .await;
        let mut events: Vec<StreamEvent> = Vec::new();
        let err = client(&base_url)
            .answer_consumer()
            .consume(&AnswerRequest::new("q"), |event| events.push(event))
            .await
            .expect_err("500 must reject");
        assert!(events.is_empty());
        assert!(matches!(
            err,
            ConsumeError::Status { status: 500, ref body } if body.contains("index unavailable")
        ));
    }

    #[tokio::test]
    async fn connection_refused_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let err = client(&format!("http://{addr}"))
            .answer_consumer()
            .consume(&AnswerRequest::new("q"), |_| {})
            .await
            .expect_err("nothing listening");
        assert!(matches!(err, ConsumeError::Transport(_)));
    }

    #[tokio::test]
    async fn standalone_transport_streams_without_client() {
        let body = concat!(
            "data: {\"type\":\"content\",\"content\":\"Faith, \"}\n\n",
            "data: {\"type\":\"content\",\"content\":\"hope, and charity\"}\n\n",
            "data: {\"type\":\"done\"}\n\n",
        );
        let (base_url, server) =
            serve_once("200 OK", "text/event-stream", vec![body.as_bytes().to_vec()]).await;

        let transport = ReqwestTransport::new(&ClientConfig::new(&base_url).api_key("token-7"))
            .expect("transport");
        let session = StreamingAnswerConsumer::new(Arc::new(transport))
            .consume(&AnswerRequest::new("What abides?").max_results(3), |_| {})
            .await
            .expect("consume");
        assert_eq!(session.outcome(), &StreamOutcome::Completed);
        assert_eq!(session.into_answer(), "Faith, hope, and charity");

        let request = server.await.expect("server");
        assert!(request.starts_with("POST /api/ask/stream"));
        assert!(request.to_ascii_lowercase().contains("accept: text/event-stream"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer token-7"));
        assert!(request.contains("\"top_k\":3"));
    }

    #[test]
    fn standalone_transport_rejects_invalid_config() {
        let err = ReqwestTransport::new(&ClientConfig::new("ftp://scriptures.local"))
            .err()
            .expect("invalid scheme");
        assert!(matches!(err, ConsumeError::Config(_)));
    }

    #[tokio::test]
    async fn search_flattens_results() {
        let (base_url, server) = serve_once(
            "200 OK",
            "application/json",
            vec![br#"{"results":[{"content":"Be still","score":0.7,"rank":1,"metadata":{"standard_work":"Old Testament","book":"Psalms","chapter":46,"verse":"10"}}],"search_time_ms":42.5,"total":1}"#.to_vec()],
        )
        .await;
        let response = client(&base_url)
            .search(&AnswerRequest::new("peace").max_results(1))
            .await
            .expect("search");
        assert_eq!(response.total, Some(1));
        assert_eq!(response.search_time_ms, Some(42.5));
        assert_eq!(response.results[0].source, "Old Testament");
        assert_eq!(response.results[0].display_citation(), "Psalms 46:10");
        let request = server.await.expect("server");
        assert!(request.starts_with("POST /api/search"));
        assert!(request.contains("\"top_k\":1"));
    }

    #[tokio::test]
    async fn health_reports_status() {
        let (base_url, _server) = serve_once(
            "200 OK",
            "application/json",
            vec![br#"{"status":"ok","version":"1.4.0","index_size":41234}"#.to_vec()],
        )
        .await;
        let health = client(&base_url).health().await.expect("health");
        assert!(health.is_healthy());
        assert_eq!(health.index_size, Some(41234));
    }

    #[tokio::test]
    async fn sources_accepts_enveloped_list() {
        let (base_url, _server) = serve_once(
            "200 OK",
            "application/json",
            vec![br#"{"sources":[{"name":"Book of Mormon","source_type":"scripture","document_count":6604},{"name":"General Conference","source_type":"conference"}]}"#.to_vec()],
        )
        .await;
        let sources = client(&base_url).sources().await.expect("sources");
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[1].source_type, SourceType::Conference);
        assert_eq!(sources[1].document_count, None);
    }

    #[tokio::test]
    async fn undecodable_json_is_a_decode_error() {
        let (base_url, _server) =
            serve_once("200 OK", "application/json", vec![b"<html>".to_vec()]).await;
        let err = client(&base_url).health().await.expect_err("bad body");
        assert!(matches!(err, ConsumeError::Decode(msg) if msg.contains("health")));
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(matches!(
            ScriptureClient::new(ClientConfig::new("localhost:8000")),
            Err(ConsumeError::Config(_))
        ));
    }
}
