//! Test scaffolding for driving the storefront client against a scripted
//! in-process HTTP server.
//!
//! The mock server binds an ephemeral port and answers requests from a
//! prepared script, one response per request in order. Every request is
//! captured (method, path, auth header, body) so tests can assert on what
//! the client actually sent. Unscripted requests get a 500 so a test that
//! makes more calls than expected fails loudly.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::expect_used)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// One scripted response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
}

impl MockResponse {
    /// A 200 response with a JSON body.
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// An error response with the API's `{"message": ...}` body shape.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: serde_json::json!({ "message": message }).to_string(),
        }
    }
}

/// One captured request.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

impl CapturedRequest {
    /// The request body parsed as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the body is not valid JSON.
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("captured request body should be JSON")
    }

    /// The bearer token from the Authorization header, if any.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.authorization.as_deref()?.strip_prefix("Bearer ")
    }
}

/// Scripted mock of the storefront REST API.
pub struct MockApi {
    addr: SocketAddr,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    script: Arc<Mutex<VecDeque<MockResponse>>>,
    handle: JoinHandle<()>,
}

impl MockApi {
    /// Bind an ephemeral port and start answering from `script`.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start(script: Vec<MockResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        let captured = Arc::new(Mutex::new(Vec::new()));
        let script = Arc::new(Mutex::new(VecDeque::from(script)));

        let captured_task = Arc::clone(&captured);
        let script_task = Arc::clone(&script);
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let captured = Arc::clone(&captured_task);
                let script = Arc::clone(&script_task);
                tokio::spawn(async move {
                    serve_one(stream, captured, script).await;
                });
            }
        });

        Self {
            addr,
            captured,
            script,
            handle,
        }
    }

    /// Base URL for pointing a client at this server.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far, in order.
    pub async fn captured(&self) -> Vec<CapturedRequest> {
        self.captured.lock().await.clone()
    }

    /// Append more responses to the script.
    pub async fn push_responses(&self, responses: Vec<MockResponse>) {
        self.script.lock().await.extend(responses);
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Read one HTTP/1.1 request off the stream, record it, and write the next
/// scripted response (or a 500 when the script is exhausted).
async fn serve_one(
    mut stream: TcpStream,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    script: Arc<Mutex<VecDeque<MockResponse>>>,
) {
    let Some(request) = read_request(&mut stream).await else {
        return;
    };
    captured.lock().await.push(request);

    let response = script.lock().await.pop_front().unwrap_or(MockResponse {
        status: 500,
        body: r#"{"message":"unscripted request"}"#.to_string(),
    });

    let reason = match response.status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    let payload = format!(
        "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        response.status,
        reason,
        response.body.len(),
        response.body
    );
    let _ = stream.write_all(payload.as_bytes()).await;
    let _ = stream.shutdown().await;
}

async fn read_request(stream: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 4096];

    let header_end = loop {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(chunk.get(..read)?);
        if let Some(position) = find_header_end(&buffer) {
            break position;
        }
        if buffer.len() > 1_048_576 {
            return None;
        }
    };

    let head = String::from_utf8_lossy(buffer.get(..header_end)?).to_string();
    let mut lines = head.lines();
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }

    let content_length: usize = headers
        .get("content-length")
        .and_then(|value| value.parse().ok())
        .unwrap_or(0);
    let body_start = header_end + 4;
    while buffer.len() < body_start + content_length {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(chunk.get(..read)?);
    }

    let body = buffer
        .get(body_start..body_start + content_length)
        .map(|bytes| String::from_utf8_lossy(bytes).to_string())
        .unwrap_or_default();

    Some(CapturedRequest {
        method,
        path,
        authorization: headers.get("authorization").cloned(),
        body,
    })
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}
