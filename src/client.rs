//! HTTP client for the research backend.
//!
//! Covers session lifecycle, request/response chat, quick actions, health,
//! PDF retrieval, and the streaming transport behind `/chat/stream`. The
//! client holds no conversation state; that lives in
//! [`ConversationState`](crate::dispatcher::ConversationState).

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::stream::BoxStream;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::protocol::{
    ChatRequest, ChatResponse, DeleteResponse, HealthResponse, QuickAction, QuickActionRequest,
    SessionResponse, SessionStatus, StreamEvent,
};
use crate::sse::EventDecoder;

/// Client for the research backend's HTTP+SSE API.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ResearchClient {
    config: ClientConfig,
    client: reqwest::Client,
}

impl ResearchClient {
    /// Build a client from a resolved config.
    pub fn new(config: ClientConfig) -> Self {
        // No client-wide timeout: streams run as long as the backend talks.
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    /// Start building a client aimed at `base_url`.
    pub fn builder(base_url: impl Into<String>) -> ResearchClientBuilder {
        ResearchClientBuilder::new(base_url)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    /// `POST /sessions`. No retry.
    pub async fn create_session(&self) -> Result<SessionResponse> {
        let url = self.url("/sessions");
        let resp = self
            .send(self.client.post(&url).timeout(self.config.request_timeout), &url)
            .await?;
        let session: SessionResponse = decode_json(resp, &url).await?;
        info!(session_id = %session.session_id, thread_id = %session.thread_id, "session created");
        Ok(session)
    }

    /// `GET /sessions/{id}`: full server-side snapshot, for resynchronising.
    pub async fn get_session_status(&self, session_id: &str) -> Result<SessionStatus> {
        let url = self.url(&format!("/sessions/{session_id}"));
        let resp = self
            .send(self.client.get(&url).timeout(self.config.request_timeout), &url)
            .await?;
        decode_json(resp, &url).await
    }

    /// `DELETE /sessions/{id}`.
    ///
    /// Callers replacing a session should treat failure as non-fatal: the
    /// session may already have expired server-side.
    pub async fn delete_session(&self, session_id: &str) -> Result<DeleteResponse> {
        let url = self.url(&format!("/sessions/{session_id}"));
        let resp = self
            .send(self.client.delete(&url).timeout(self.config.request_timeout), &url)
            .await?;
        decode_json(resp, &url).await
    }

    // -----------------------------------------------------------------------
    // Chat
    // -----------------------------------------------------------------------

    /// `POST /chat`: one request, one full response.
    pub async fn send_message(&self, session_id: &str, message: &str) -> Result<ChatResponse> {
        let url = self.url("/chat");
        let body = ChatRequest { session_id, message };
        let resp = self
            .send(
                self.client.post(&url).json(&body).timeout(self.config.request_timeout),
                &url,
            )
            .await?;
        decode_json(resp, &url).await
    }

    /// `POST /chat/stream`, returning the lazily decoded event sequence.
    ///
    /// Fails before yielding anything if the request cannot be sent or the
    /// status is not 2xx.
    pub async fn open_stream(&self, session_id: &str, message: &str) -> Result<EventStream> {
        let url = self.url("/chat/stream");
        let body = ChatRequest { session_id, message };
        let resp = self.send(self.client.post(&url).json(&body), &url).await?;
        debug!(session_id = %session_id, "stream opened");
        Ok(EventStream::from_chunks(resp.bytes_stream()))
    }

    /// Callback form of [`open_stream`](Self::open_stream): `on_event` runs
    /// once per well-formed event, in arrival order, until the body closes.
    ///
    /// A failed read ends the call with that error; events already delivered
    /// stay delivered.
    pub async fn stream_message<F>(
        &self,
        session_id: &str,
        message: &str,
        mut on_event: F,
    ) -> Result<()>
    where
        F: FnMut(StreamEvent),
    {
        let mut events = self.open_stream(session_id, message).await?;
        while let Some(event) = events.next_event().await {
            on_event(event?);
        }
        Ok(())
    }

    /// `POST /quick-action`.
    pub async fn execute_quick_action(
        &self,
        session_id: &str,
        action: QuickAction,
    ) -> Result<ChatResponse> {
        let url = self.url("/quick-action");
        let body = QuickActionRequest { session_id, action };
        let resp = self
            .send(
                self.client.post(&url).json(&body).timeout(self.config.request_timeout),
                &url,
            )
            .await?;
        decode_json(resp, &url).await
    }

    // -----------------------------------------------------------------------
    // Artifacts and health
    // -----------------------------------------------------------------------

    /// Where the session's generated PDF can be fetched.
    pub fn pdf_url(&self, session_id: &str) -> String {
        self.url(&format!("/pdf/{session_id}"))
    }

    /// Copy the session's PDF to `dest` byte for byte. Returns bytes written.
    ///
    /// The body lands in `<dest>.part` first and is renamed over `dest`
    /// only once complete, so a failed download leaves nothing at `dest`.
    pub async fn download_pdf(&self, session_id: &str, dest: &Path) -> Result<u64> {
        let url = self.pdf_url(session_id);
        let resp = self.send(self.client.get(&url), &url).await?;

        let part = partial_path(dest);
        let written = match write_body(resp, &part).await {
            Ok(n) => n,
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&part).await {
                    warn!(path = %part.display(), error = %rm, "could not remove partial download");
                }
                return Err(e);
            }
        };
        if let Err(e) = tokio::fs::rename(&part, dest).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e.into());
        }
        info!(session_id = %session_id, path = %dest.display(), bytes = written, "pdf saved");
        Ok(written)
    }

    /// `GET /health`.
    pub async fn check_health(&self) -> Result<HealthResponse> {
        let url = self.url("/health");
        let resp = self
            .send(self.client.get(&url).timeout(self.config.request_timeout), &url)
            .await?;
        decode_json(resp, &url).await
    }

    async fn send(&self, req: reqwest::RequestBuilder, url: &str) -> Result<reqwest::Response> {
        debug!(url = %url, "request");
        let resp = req.send().await.map_err(|e| ClientError::Connect {
            url: url.to_string(),
            detail: e.to_string(),
        })?;

        if !resp.status().is_success() {
            return Err(ClientError::Http {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp)
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

async fn write_body(resp: reqwest::Response, path: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut body = resp.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

async fn decode_json<T: DeserializeOwned>(resp: reqwest::Response, url: &str) -> Result<T> {
    let bytes = resp.bytes().await.map_err(|e| ClientError::Decode {
        url: url.to_string(),
        detail: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode {
        url: url.to_string(),
        detail: e.to_string(),
    })
}

/// Builder for [`ResearchClient`].
pub struct ResearchClientBuilder {
    config: ClientConfig,
}

impl ResearchClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            config: ClientConfig::new(base_url),
        }
    }

    /// Override the TCP connect timeout (default 5 s).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Override the request/response timeout (default 30 s).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn build(self) -> ResearchClient {
        ResearchClient::new(self.config)
    }
}

// ---------------------------------------------------------------------------
// EventStream
// ---------------------------------------------------------------------------

/// Lazy, finite, non-restartable sequence of [`StreamEvent`]s read from a
/// response body.
///
/// Owns the body: dropping the stream, on any path, releases the
/// connection.
pub struct EventStream {
    body: BoxStream<'static, Result<Vec<u8>>>,
    decoder: EventDecoder,
    ready: VecDeque<StreamEvent>,
    finished: bool,
}

impl EventStream {
    /// Wrap any chunk stream. Used for HTTP bodies and for feeding canned
    /// chunks in tests.
    pub fn from_chunks<S, B, E>(chunks: S) -> Self
    where
        S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
        B: AsRef<[u8]> + 'static,
        E: Into<ClientError> + 'static,
    {
        let body = chunks.map(|chunk| chunk.map(|b| b.as_ref().to_vec()).map_err(Into::into));
        Self {
            body: Box::pin(body),
            decoder: EventDecoder::new(),
            ready: VecDeque::new(),
            finished: false,
        }
    }

    /// Next event, `None` once the body has closed and everything buffered
    /// has been yielded. A read failure is yielded once, then the stream ends.
    pub async fn next_event(&mut self) -> Option<Result<StreamEvent>> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Some(Ok(event));
            }
            if self.finished {
                return None;
            }
            match self.body.next().await {
                Some(Ok(chunk)) => self.ready.extend(self.decoder.push(&chunk)),
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                None => {
                    self.finished = true;
                    self.ready.extend(self.decoder.finish());
                }
            }
        }
    }

    /// Lines that started with `data: ` but did not parse.
    pub fn malformed(&self) -> usize {
        self.decoder.malformed()
    }
}
