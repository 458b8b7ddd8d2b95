//! In-process mock of the research backend for integration tests.
//!
//! Routes are single-use and matched in registration order, so a test can
//! queue two different answers for the same endpoint.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    content_type: &'static str,
    chunks: Vec<Vec<u8>>,
    streamed: bool,
    declared_len: Option<usize>,
}

impl MockResponse {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            chunks: vec![body.to_string().into_bytes()],
            streamed: false,
            declared_len: None,
        }
    }

    /// Close-delimited `text/event-stream` body written chunk by chunk.
    pub fn sse(chunks: &[&[u8]]) -> Self {
        Self {
            status: 200,
            content_type: "text/event-stream",
            chunks: chunks.iter().map(|c| c.to_vec()).collect(),
            streamed: true,
            declared_len: None,
        }
    }

    /// SSE body made of one `data: <json>\n` line per event.
    pub fn sse_events(events: &[serde_json::Value]) -> Self {
        let lines: Vec<Vec<u8>> = events
            .iter()
            .map(|e| format!("data: {e}\n\n").into_bytes())
            .collect();
        Self {
            status: 200,
            content_type: "text/event-stream",
            chunks: lines,
            streamed: true,
            declared_len: None,
        }
    }

    pub fn bytes(content_type: &'static str, body: Vec<u8>) -> Self {
        Self { status: 200, content_type, chunks: vec![body], streamed: false, declared_len: None }
    }

    /// Announces `declared_len` bytes, sends `body`, then closes the
    /// connection early.
    pub fn truncated(content_type: &'static str, body: Vec<u8>, declared_len: usize) -> Self {
        Self {
            status: 200,
            content_type,
            chunks: vec![body],
            streamed: false,
            declared_len: Some(declared_len),
        }
    }

    pub fn status(status: u16) -> Self {
        Self::json(status, serde_json::json!({"detail": "mock error"}))
    }
}

struct Route {
    method: &'static str,
    path: String,
    response: MockResponse,
    used: bool,
}

pub struct MockBackend {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    routes: Arc<Mutex<Vec<Route>>>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock backend");
        let addr = listener.local_addr().expect("local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let routes: Arc<Mutex<Vec<Route>>> = Arc::new(Mutex::new(Vec::new()));

        let req_log = Arc::clone(&requests);
        let route_table = Arc::clone(&routes);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let req_log = Arc::clone(&req_log);
                let route_table = Arc::clone(&route_table);
                tokio::spawn(async move {
                    let _ = handle(stream, req_log, route_table).await;
                });
            }
        });

        Self { addr, requests, routes }
    }

    /// Queue a response for the next `method path` request.
    pub fn route(&self, method: &'static str, path: impl Into<String>, response: MockResponse) -> &Self {
        self.routes.lock().unwrap().push(Route {
            method,
            path: path.into(),
            response,
            used: false,
        });
        self
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }
}

/// A base URL nothing is listening on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}")
}

pub fn session_json(id: &str) -> serde_json::Value {
    serde_json::json!({
        "session_id": id,
        "thread_id": format!("thread-{id}"),
        "created_at": "2024-05-01T10:00:00",
        "message": "Session created successfully"
    })
}

async fn handle(
    mut stream: TcpStream,
    req_log: Arc<Mutex<Vec<RecordedRequest>>>,
    routes: Arc<Mutex<Vec<Route>>>,
) -> std::io::Result<()> {
    let Some(request) = read_request(&mut stream).await else {
        return Ok(());
    };
    req_log.lock().unwrap().push(request.clone());

    let response = {
        let mut routes = routes.lock().unwrap();
        routes
            .iter_mut()
            .find(|r| !r.used && r.method == request.method && r.path == request.path)
            .map(|r| {
                r.used = true;
                r.response.clone()
            })
    };
    let response = response.unwrap_or_else(|| MockResponse::status(404));
    write_response(&mut stream, &response).await
}

async fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];
    loop {
        let n = stream.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);

        let parsed = {
            let mut headers = [httparse::EMPTY_HEADER; 32];
            let mut req = httparse::Request::new(&mut headers);
            match req.parse(&buf).ok()? {
                httparse::Status::Complete(header_len) => {
                    let content_length = req
                        .headers
                        .iter()
                        .find(|h| h.name.eq_ignore_ascii_case("content-length"))
                        .and_then(|h| std::str::from_utf8(h.value).ok())
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    Some((
                        req.method?.to_string(),
                        req.path?.to_string(),
                        header_len,
                        content_length,
                    ))
                }
                httparse::Status::Partial => None,
            }
        };

        if let Some((method, path, header_len, content_length)) = parsed {
            while buf.len() < header_len + content_length {
                let n = stream.read(&mut tmp).await.ok()?;
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&tmp[..n]);
            }
            let end = (header_len + content_length).min(buf.len());
            let body = String::from_utf8_lossy(&buf[header_len..end]).to_string();
            return Some(RecordedRequest { method, path, body });
        }
    }
}

async fn write_response(stream: &mut TcpStream, resp: &MockResponse) -> std::io::Result<()> {
    let reason = match resp.status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    };
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nConnection: close\r\n",
        resp.status, reason, resp.content_type
    );
    if !resp.streamed {
        let len = resp
            .declared_len
            .unwrap_or_else(|| resp.chunks.iter().map(Vec::len).sum());
        head.push_str(&format!("Content-Length: {len}\r\n"));
    }
    head.push_str("\r\n");
    stream.write_all(head.as_bytes()).await?;

    for chunk in &resp.chunks {
        stream.write_all(chunk).await?;
        stream.flush().await?;
        if resp.streamed {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
    stream.shutdown().await
}
