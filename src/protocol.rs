use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Pre-canned actions served by `/quick-action`.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickAction {
    WritePaper,
    SearchAll,
}

impl std::fmt::Display for QuickAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuickAction::WritePaper => write!(f, "write_paper"),
            QuickAction::SearchAll => write!(f, "search_all"),
        }
    }
}

impl QuickAction {
    /// Label shown on the sidebar button.
    pub fn label(&self) -> &'static str {
        match self {
            QuickAction::WritePaper => "Write Research Paper",
            QuickAction::SearchAll => "Search All Databases",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

// -- Session endpoints ------------------------------------------------------

/// `POST /sessions`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub thread_id: String,
    pub created_at: String,
    #[serde(default)]
    pub message: String,
}

/// One entry of a server-side chat history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

/// `GET /sessions/{id}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionStatus {
    pub session_id: String,
    #[serde(default)]
    pub chat_history: Vec<HistoryMessage>,
    #[serde(default)]
    pub tools_used: Vec<String>,
    #[serde(default)]
    pub papers_found: Vec<String>,
    #[serde(default)]
    pub pdf_path: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

/// `DELETE /sessions/{id}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub session_id: String,
}

// -- Chat endpoints ---------------------------------------------------------

/// Body for `/chat` and `/chat/stream`.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub session_id: &'a str,
    pub message: &'a str,
}

/// Body for `/quick-action`.
#[derive(Debug, Serialize)]
pub struct QuickActionRequest<'a> {
    pub session_id: &'a str,
    pub action: QuickAction,
}

/// Response of `/chat` and `/quick-action`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(default)]
    pub tools_used: Vec<String>,
    #[serde(default)]
    pub papers_found: Vec<String>,
    #[serde(default)]
    pub pdf_path: Option<String>,
}

/// `GET /health`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub active_sessions: u64,
    #[serde(default)]
    pub timestamp: String,
}

// -- Stream events ----------------------------------------------------------

/// One JSON payload from a `data: ` line of `/chat/stream`.
///
/// `Message` carries the whole assistant text so far, never a delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Tool {
        #[serde(default)]
        tool_name: String,
    },
    Message {
        #[serde(default)]
        content: String,
    },
    Pdf {
        #[serde(default)]
        pdf_path: String,
    },
    Done,
    Error {
        #[serde(default)]
        message: String,
    },
}

impl StreamEvent {
    /// `done` and `error` end a turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }

    /// Wire name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Tool { .. } => "tool",
            StreamEvent::Message { .. } => "message",
            StreamEvent::Pdf { .. } => "pdf",
            StreamEvent::Done => "done",
            StreamEvent::Error { .. } => "error",
        }
    }
}
