use std::time::Duration;

use futures::TryStreamExt;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde_json::{json, Value};
use tokio_util::io::StreamReader;
use tracing::{debug, error};

use tandem_core::config::PlatformConfig;
use tandem_core::error::{Result, TransportError};
use tandem_core::types::{Message, ThreadId};

/// Input of one run: the turns appended to the thread.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunInput {
    pub messages: Vec<Message>,
}

impl RunInput {
    /// A single human turn.
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::human(content)],
        }
    }
}

/// Parsed body of a non-streaming run submission.
#[derive(Debug, Clone)]
pub struct RunHandle {
    pub run_id: Option<String>,
    pub body: Value,
}

/// A thread state document, as returned by `GET /threads/{id}/state`.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadState(pub Value);

impl ThreadState {
    /// Step names the platform still has to execute.
    pub fn pending_steps(&self) -> Vec<String> {
        match self.0.get("next") {
            Some(Value::Array(steps)) => steps
                .iter()
                .map(|s| s.as_str().map(str::to_string).unwrap_or_else(|| s.to_string()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// True once `next` is absent, empty or falsy (`0` counts as idle).
    pub fn is_idle(&self) -> bool {
        match self.0.get("next") {
            None | Some(Value::Null) => true,
            Some(Value::Array(steps)) => steps.is_empty(),
            Some(Value::String(s)) => s.is_empty(),
            Some(Value::Bool(b)) => !b,
            Some(Value::Object(o)) => o.is_empty(),
            Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        }
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// A live streaming run response. Dropping it closes the connection.
pub struct StreamHandle {
    response: Response,
}

impl StreamHandle {
    pub fn status(&self) -> u16 {
        self.response.status().as_u16()
    }

    /// Decode the body to the end in `chunk_size` reads.
    pub async fn frames(self, chunk_size: usize) -> Result<Vec<Value>> {
        let body = self.response.bytes_stream().map_err(std::io::Error::other);
        tandem_llm::decode_frames(StreamReader::new(body), chunk_size).await
    }
}

/// What `submit_run` hands back, depending on the requested mode.
pub enum Submission {
    Run(RunHandle),
    Stream(StreamHandle),
}

/// HTTP client for the graph platform's thread and run endpoints.
///
/// Every call performs exactly one request. Connections are not kept in an
/// idle pool, so a connection lives only as long as the response that owns it.
/// JSON requests are bounded by `request_timeout`; run streams are not.
pub struct PlatformClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl PlatformClient {
    pub fn new(config: &PlatformConfig) -> std::result::Result<Self, TransportError> {
        Ok(Self::with_base_url(config.base_url(), config.api_key.clone())?
            .with_timeout(config.request_timeout()))
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> std::result::Result<Self, TransportError> {
        let http = Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            request_timeout: Duration::from_secs(30),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }
        req
    }

    /// Send one request and parse a 2xx JSON body.
    async fn execute_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> std::result::Result<Value, TransportError> {
        let mut req = self.request(method.clone(), path).timeout(self.request_timeout);
        if let Some(body) = body {
            req = req.json(body);
        }

        let result = async {
            let response = req
                .send()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;
            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;

            if !status.is_success() {
                return Err(TransportError::Status {
                    status: status.as_u16(),
                    body: text,
                });
            }
            serde_json::from_str::<Value>(&text).map_err(|e| TransportError::Decode(e.to_string()))
        }
        .await;

        if let Err(e) = &result {
            error!(%method, path, error = %e, "Platform request failed");
        }
        result
    }

    /// Create a new thread.
    pub async fn create_thread(&self) -> std::result::Result<ThreadId, TransportError> {
        let body = json!({ "metadata": {}, "if_exists": "raise" });
        let data = self.execute_json(Method::POST, "/threads", Some(&body)).await?;

        let thread_id = data
            .get("thread_id")
            .and_then(Value::as_str)
            .ok_or_else(|| TransportError::Decode("response has no thread_id".into()))?;
        debug!(thread_id, "Created thread");
        Ok(ThreadId::from_str(thread_id))
    }

    /// Fetch the current state document of a thread.
    pub async fn get_thread_state(
        &self,
        thread_id: &ThreadId,
    ) -> std::result::Result<ThreadState, TransportError> {
        let path = format!("/threads/{}/state", thread_id);
        self.execute_json(Method::GET, &path, None)
            .await
            .map(ThreadState)
    }

    /// Submit a run and return its parsed creation body.
    pub async fn create_run(
        &self,
        thread_id: &ThreadId,
        input: &RunInput,
        assistant_id: &str,
    ) -> std::result::Result<RunHandle, TransportError> {
        let path = format!("/threads/{}/runs", thread_id);
        let body = json!({ "input": input, "assistant_id": assistant_id });
        let data = self.execute_json(Method::POST, &path, Some(&body)).await?;

        let run_id = data.get("run_id").and_then(Value::as_str).map(str::to_string);
        Ok(RunHandle { run_id, body: data })
    }

    /// Submit a run in `updates` stream mode and return the live response.
    pub async fn stream_run(
        &self,
        thread_id: &ThreadId,
        input: &RunInput,
        assistant_id: &str,
    ) -> std::result::Result<StreamHandle, TransportError> {
        let path = format!("/threads/{}/runs/stream", thread_id);
        let body = json!({
            "input": input,
            "assistant_id": assistant_id,
            "stream_mode": "updates",
        });

        let response = match self.request(Method::POST, &path).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                let err = TransportError::Network(e.to_string());
                error!(method = "POST", path = %path, error = %err, "Platform request failed");
                return Err(err);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let err = TransportError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            };
            error!(method = "POST", path = %path, error = %err, "Platform request failed");
            return Err(err);
        }
        Ok(StreamHandle { response })
    }

    /// Submit a run either as a stream or as a plain run creation.
    pub async fn submit_run(
        &self,
        thread_id: &ThreadId,
        input: &RunInput,
        assistant_id: &str,
        stream: bool,
    ) -> std::result::Result<Submission, TransportError> {
        if stream {
            self.stream_run(thread_id, input, assistant_id)
                .await
                .map(Submission::Stream)
        } else {
            self.create_run(thread_id, input, assistant_id)
                .await
                .map(Submission::Run)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client_for(server: &Server) -> PlatformClient {
        PlatformClient::with_base_url(server.url(), Some("lg-key".into())).unwrap()
    }

    #[tokio::test]
    async fn test_create_thread_sends_raise_policy() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/threads")
            .match_header("x-api-key", "lg-key")
            .match_body(Matcher::Json(json!({"metadata": {}, "if_exists": "raise"})))
            .with_status(200)
            .with_body(r#"{"thread_id": "t-123", "created_at": "2026-01-01T00:00:00Z"}"#)
            .create_async()
            .await;

        let thread_id = client_for(&server).create_thread().await.unwrap();
        mock.assert_async().await;
        assert_eq!(thread_id, ThreadId::from_str("t-123"));
    }

    #[tokio::test]
    async fn test_create_thread_without_id_is_decode_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/threads")
            .with_status(200)
            .with_body(r#"{"status": "ok"}"#)
            .create_async()
            .await;

        let err = client_for(&server).create_thread().await.unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[tokio::test]
    async fn test_status_error_carries_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/threads/t-1/state")
            .with_status(404)
            .with_body("thread not found")
            .create_async()
            .await;

        let err = client_for(&server)
            .get_thread_state(&ThreadId::from_str("t-1"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "HTTP 404: thread not found");
    }

    #[tokio::test]
    async fn test_malformed_json_is_decode_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/threads/t-1/state")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let err = client_for(&server)
            .get_thread_state(&ThreadId::from_str("t-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[tokio::test]
    async fn test_network_failure_is_network_error() {
        // Nothing listens on port 9 of localhost in the test environment.
        let client = PlatformClient::with_base_url("http://127.0.0.1:9", None).unwrap();
        let err = client.create_thread().await.unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }

    #[tokio::test]
    async fn test_silent_server_hits_request_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and hold the connection without answering.
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let client = PlatformClient::with_base_url(format!("http://{}", addr), None)
            .unwrap()
            .with_timeout(Duration::from_millis(50));
        let started = std::time::Instant::now();
        let err = client
            .get_thread_state(&ThreadId::from_str("t-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Network(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_new_uses_configured_timeout() {
        let config = PlatformConfig {
            url: "http://127.0.0.1:2024".into(),
            request_timeout_secs: 7,
            ..Default::default()
        };
        let client = PlatformClient::new(&config).unwrap();
        assert_eq!(client.request_timeout, Duration::from_secs(7));
        assert_eq!(client.base_url(), "http://127.0.0.1:2024");
    }

    #[tokio::test]
    async fn test_create_run_extracts_run_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/threads/t-1/runs")
            .match_body(Matcher::PartialJson(json!({
                "assistant_id": "math_agent",
                "input": {"messages": [{"type": "human", "content": "2+2"}]}
            })))
            .with_status(200)
            .with_body(r#"{"run_id": "r-9", "status": "pending"}"#)
            .create_async()
            .await;

        let handle = client_for(&server)
            .create_run(&ThreadId::from_str("t-1"), &RunInput::human("2+2"), "math_agent")
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(handle.run_id.as_deref(), Some("r-9"));
        assert_eq!(handle.body["status"], "pending");
    }

    #[tokio::test]
    async fn test_submit_run_stream_mode() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/threads/t-1/runs/stream")
            .match_body(Matcher::PartialJson(json!({"stream_mode": "updates"})))
            .with_status(200)
            .with_body("data: {\"a\":1}\n\ndata: {\"b\":2}\n\ndata: [DONE]\n\n")
            .create_async()
            .await;

        let submission = client_for(&server)
            .submit_run(&ThreadId::from_str("t-1"), &RunInput::human("x"), "math_agent", true)
            .await
            .unwrap();
        let Submission::Stream(handle) = submission else {
            panic!("expected a stream handle");
        };
        assert_eq!(handle.status(), 200);
        let frames = handle.frames(4).await.unwrap();
        mock.assert_async().await;
        assert_eq!(frames, vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[test]
    fn test_thread_state_idle_detection() {
        assert!(ThreadState(json!({"values": {}})).is_idle());
        assert!(ThreadState(json!({"next": []})).is_idle());
        assert!(ThreadState(json!({"next": null})).is_idle());
        let busy = ThreadState(json!({"next": ["agent", "tools"]}));
        assert!(!busy.is_idle());
        assert_eq!(busy.pending_steps(), vec!["agent", "tools"]);
    }

    #[test]
    fn test_thread_state_numeric_next() {
        assert!(ThreadState(json!({"next": 0})).is_idle());
        assert!(ThreadState(json!({"next": 0.0})).is_idle());
        assert!(!ThreadState(json!({"next": 2})).is_idle());
        assert!(ThreadState(json!({"next": false})).is_idle());
        assert!(!ThreadState(json!({"next": "agent"})).is_idle());
    }
}
