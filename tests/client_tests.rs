//! External tests for the HTTP client against an in-process mock backend.

mod common;

use std::time::Duration;

use common::{dead_url, session_json, MockBackend, MockResponse};
use research_assistant::client::ResearchClient;
use research_assistant::error::{ClientError, ErrorCategory};
use research_assistant::protocol::{QuickAction, Role, StreamEvent};
use serde_json::json;

fn client_for(backend: &MockBackend) -> ResearchClient {
    ResearchClient::builder(backend.url())
        .request_timeout(Duration::from_secs(5))
        .build()
}

// -- Sessions -----------------------------------------------------------------

#[tokio::test]
async fn test_create_session_returns_ids() {
    let backend = MockBackend::start().await;
    backend.route("POST", "/sessions", MockResponse::json(200, session_json("s-1")));

    let session = client_for(&backend).create_session().await.unwrap();
    assert_eq!(session.session_id, "s-1");
    assert_eq!(session.thread_id, "thread-s-1");
    assert_eq!(backend.requests_to("POST", "/sessions").len(), 1);
}

#[tokio::test]
async fn test_create_session_non_2xx_is_http_error() {
    let backend = MockBackend::start().await;
    backend.route("POST", "/sessions", MockResponse::status(500));

    let err = client_for(&backend).create_session().await.unwrap_err();
    assert!(matches!(err, ClientError::Http { status: 500, .. }), "got {err:?}");
    assert_eq!(err.category(), ErrorCategory::Request);
}

#[tokio::test]
async fn test_create_session_is_not_retried() {
    let backend = MockBackend::start().await;
    backend.route("POST", "/sessions", MockResponse::status(503));
    backend.route("POST", "/sessions", MockResponse::json(200, session_json("s-2")));

    assert!(client_for(&backend).create_session().await.is_err());
    assert_eq!(backend.requests_to("POST", "/sessions").len(), 1);
}

#[tokio::test]
async fn test_create_session_bad_json_is_decode_error() {
    let backend = MockBackend::start().await;
    backend.route("POST", "/sessions", MockResponse::json(200, json!({"unexpected": true})));

    let err = client_for(&backend).create_session().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_unreachable_backend_is_connect_error() {
    let client = ResearchClient::builder(dead_url().await)
        .connect_timeout(Duration::from_secs(1))
        .build();
    let err = client.create_session().await.unwrap_err();
    assert!(matches!(err, ClientError::Connect { .. }), "got {err:?}");
    assert_eq!(err.category(), ErrorCategory::Unreachable);
}

#[tokio::test]
async fn test_get_session_status_snapshot() {
    let backend = MockBackend::start().await;
    backend.route(
        "GET",
        "/sessions/s-1",
        MockResponse::json(
            200,
            json!({
                "session_id": "s-1",
                "chat_history": [
                    {"role": "user", "content": "find RAG papers"},
                    {"role": "assistant", "content": "Found 3"}
                ],
                "tools_used": ["arxiv_search"],
                "papers_found": ["Paper A"],
                "pdf_path": null,
                "created_at": "2024-05-01T10:00:00"
            }),
        ),
    );

    let status = client_for(&backend).get_session_status("s-1").await.unwrap();
    assert_eq!(status.chat_history.len(), 2);
    assert_eq!(status.chat_history[0].role, Role::User);
    assert_eq!(status.tools_used, vec!["arxiv_search".to_string()]);
    assert!(status.pdf_path.is_none());
}

#[tokio::test]
async fn test_delete_session() {
    let backend = MockBackend::start().await;
    backend.route(
        "DELETE",
        "/sessions/s-1",
        MockResponse::json(200, json!({"message": "Session deleted", "session_id": "s-1"})),
    );

    let resp = client_for(&backend).delete_session("s-1").await.unwrap();
    assert_eq!(resp.session_id, "s-1");
}

#[tokio::test]
async fn test_delete_unknown_session_is_404() {
    let backend = MockBackend::start().await;
    let err = client_for(&backend).delete_session("gone").await.unwrap_err();
    assert!(matches!(err, ClientError::Http { status: 404, .. }));
}

// -- Chat and quick actions ----------------------------------------------------

#[tokio::test]
async fn test_send_message_posts_session_and_text() {
    let backend = MockBackend::start().await;
    backend.route(
        "POST",
        "/chat",
        MockResponse::json(
            200,
            json!({
                "response": "Here are 2 papers",
                "tools_used": ["arxiv_search"],
                "papers_found": ["A", "B"],
                "pdf_path": null
            }),
        ),
    );

    let resp = client_for(&backend).send_message("s-1", "find RAG papers").await.unwrap();
    assert_eq!(resp.response, "Here are 2 papers");
    assert_eq!(resp.papers_found.len(), 2);

    let sent = backend.requests_to("POST", "/chat");
    assert_eq!(sent[0].json(), json!({"session_id": "s-1", "message": "find RAG papers"}));
}

#[tokio::test]
async fn test_quick_action_sends_wire_name() {
    let backend = MockBackend::start().await;
    backend.route(
        "POST",
        "/quick-action",
        MockResponse::json(200, json!({"response": "Searching everything", "tools_used": []})),
    );

    let resp = client_for(&backend)
        .execute_quick_action("s-1", QuickAction::SearchAll)
        .await
        .unwrap();
    assert_eq!(resp.response, "Searching everything");

    let sent = backend.requests_to("POST", "/quick-action");
    assert_eq!(sent[0].json(), json!({"session_id": "s-1", "action": "search_all"}));
}

#[tokio::test]
async fn test_health() {
    let backend = MockBackend::start().await;
    backend.route(
        "GET",
        "/health",
        MockResponse::json(
            200,
            json!({"status": "healthy", "active_sessions": 3, "timestamp": "2024-05-01T10:00:00"}),
        ),
    );

    let health = client_for(&backend).check_health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.active_sessions, 3);
}

// -- Streaming -------------------------------------------------------------------

#[tokio::test]
async fn test_stream_message_delivers_events_in_order() {
    let backend = MockBackend::start().await;
    backend.route(
        "POST",
        "/chat/stream",
        MockResponse::sse_events(&[
            json!({"type": "tool", "tool_name": "arxiv_search"}),
            json!({"type": "message", "content": "Found 3"}),
            json!({"type": "message", "content": "Found 3 papers"}),
            json!({"type": "done"}),
        ]),
    );

    let mut events = Vec::new();
    client_for(&backend)
        .stream_message("s-1", "find RAG papers", |e| events.push(e))
        .await
        .unwrap();

    assert_eq!(
        events,
        vec![
            StreamEvent::Tool { tool_name: "arxiv_search".into() },
            StreamEvent::Message { content: "Found 3".into() },
            StreamEvent::Message { content: "Found 3 papers".into() },
            StreamEvent::Done,
        ]
    );
    let sent = backend.requests_to("POST", "/chat/stream");
    assert_eq!(sent[0].json(), json!({"session_id": "s-1", "message": "find RAG papers"}));
}

#[tokio::test]
async fn test_stream_skips_malformed_and_foreign_lines() {
    let backend = MockBackend::start().await;
    backend.route(
        "POST",
        "/chat/stream",
        MockResponse::sse(&[
            b": keep-alive\n",
            b"data: {not json}\n",
            b"event: ping\n",
            b"data: {\"type\":\"message\",\"content\":\"ok\"}\n",
            b"data: {\"type\":\"done\"}\n",
        ]),
    );

    let mut stream = client_for(&backend).open_stream("s-1", "hi").await.unwrap();
    let mut events = Vec::new();
    while let Some(e) = stream.next_event().await {
        events.push(e.unwrap());
    }
    assert_eq!(events, vec![StreamEvent::Message { content: "ok".into() }, StreamEvent::Done]);
    assert_eq!(stream.malformed(), 1);
}

#[tokio::test]
async fn test_stream_reassembles_split_lines_and_multibyte_text() {
    let line = "data: {\"type\":\"message\",\"content\":\"résumé 🧬\"}\n".as_bytes();
    // split inside the emoji's four bytes
    let cut = line.len() - 6;
    let (head, tail) = line.split_at(cut);
    let backend = MockBackend::start().await;
    backend.route("POST", "/chat/stream", MockResponse::sse(&[head, tail]));

    let mut events = Vec::new();
    client_for(&backend)
        .stream_message("s-1", "hi", |e| events.push(e))
        .await
        .unwrap();
    assert_eq!(events, vec![StreamEvent::Message { content: "résumé 🧬".into() }]);
}

#[tokio::test]
async fn test_stream_processes_trailing_line_without_newline() {
    let backend = MockBackend::start().await;
    backend.route("POST", "/chat/stream", MockResponse::sse(&[b"data: {\"type\":\"done\"}"]));

    let mut events = Vec::new();
    client_for(&backend)
        .stream_message("s-1", "hi", |e| events.push(e))
        .await
        .unwrap();
    assert_eq!(events, vec![StreamEvent::Done]);
}

#[tokio::test]
async fn test_stream_non_2xx_fails_before_any_event() {
    let backend = MockBackend::start().await;
    backend.route("POST", "/chat/stream", MockResponse::status(500));

    let mut called = false;
    let err = client_for(&backend)
        .stream_message("s-1", "hi", |_| called = true)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Http { status: 500, .. }));
    assert!(!called);
}

// -- PDF ---------------------------------------------------------------------------

#[tokio::test]
async fn test_download_pdf_copies_bytes() {
    let pdf: Vec<u8> = b"%PDF-1.4\n\x00\x01\x02binary\xff".to_vec();
    let backend = MockBackend::start().await;
    backend.route("GET", "/pdf/s-1", MockResponse::bytes("application/pdf", pdf.clone()));

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("paper.pdf");
    let written = client_for(&backend).download_pdf("s-1", &dest).await.unwrap();

    assert_eq!(written, pdf.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), pdf);
}

#[tokio::test]
async fn test_download_missing_pdf_leaves_no_file() {
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("paper.pdf");

    let err = client_for(&backend).download_pdf("s-1", &dest).await.unwrap_err();
    assert!(matches!(err, ClientError::Http { status: 404, .. }));
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_download_cut_short_leaves_nothing_behind() {
    let backend = MockBackend::start().await;
    backend.route(
        "GET",
        "/pdf/s-1",
        MockResponse::truncated("application/pdf", b"%PDF-1.4 partial".to_vec(), 100_000),
    );
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("research_s-1.pdf");

    assert!(client_for(&backend).download_pdf("s-1", &dest).await.is_err());
    assert!(!dest.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_download_replaces_existing_file_only_when_complete() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("paper.pdf");
    std::fs::write(&dest, b"old copy").unwrap();

    let backend = MockBackend::start().await;
    backend.route("GET", "/pdf/s-1", MockResponse::truncated("application/pdf", b"new".to_vec(), 4096));
    backend.route("GET", "/pdf/s-1", MockResponse::bytes("application/pdf", b"new copy".to_vec()));
    let client = client_for(&backend);

    assert!(client.download_pdf("s-1", &dest).await.is_err());
    assert_eq!(std::fs::read(&dest).unwrap(), b"old copy");

    assert_eq!(client.download_pdf("s-1", &dest).await.unwrap(), 8);
    assert_eq!(std::fs::read(&dest).unwrap(), b"new copy");
}
