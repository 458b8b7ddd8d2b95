//! Conversation state and the transitions that mutate it.
//!
//! [`ConversationState`] is the single owner of everything the chat view
//! shows: transcript, active tool, accumulated tools and papers, the PDF
//! pointer and the loading flag. It changes only through the methods here.
//! Presentation code reads it by shared reference.
//!
//! A turn is `Idle -> AwaitingFirstEvent -> Streaming* -> Done | Failed`.
//! Each turn hands out a [`TurnTicket`] tagged with the session id and turn
//! number current at the time; events presented with any other ticket are
//! discarded, so a stream outliving its session cannot touch the new one.

use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::protocol::{ChatResponse, Role, SessionResponse, SessionStatus, StreamEvent};
use crate::tools::{describe_tool, ToolDisplay};

/// Greeting shown when the first session of a run opens.
pub const WELCOME_MESSAGE: &str = "Welcome to your AI Research Assistant! 👋\n\n\
I can help you:\n\
• 🔍 Search across multiple academic databases\n\
• 📥 Download and analyze research papers\n\
• 📊 Identify research gaps and opportunities\n\
• 📄 Generate publication-ready documents\n\n\
Tell me what research topic interests you!";

/// Greeting shown when the user explicitly starts over.
pub const NEW_SESSION_MESSAGE: &str =
    "New session started! How can I help you with your research today?";

/// Notification shown when the backend reports a generated PDF.
pub const PDF_READY_NOTICE: &str = "Your research paper PDF is ready to download";

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

/// Side channel for user-visible notifications.
pub trait Notifier {
    fn notify(&self, kind: NoticeKind, message: &str);
}

/// Notifier that just remembers what it was told.
#[derive(Debug, Default)]
pub struct NoticeLog {
    notices: Mutex<Vec<(NoticeKind, String)>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, oldest first.
    pub fn notices(&self) -> Vec<(NoticeKind, String)> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    /// Messages recorded with `kind`.
    pub fn of_kind(&self, kind: NoticeKind) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, kind: NoticeKind, message: &str) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push((kind, message.to_string()));
        }
    }
}

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Display string, e.g. `14:02:11` or `Just now`.
    pub timestamp: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), timestamp: now_display() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), timestamp: now_display() }
    }
}

/// Local wall-clock time as shown next to messages.
pub fn now_display() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// The backend session this conversation belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub session_id: String,
    pub thread_id: String,
    pub created_at: String,
}

impl From<&SessionResponse> for ActiveSession {
    fn from(resp: &SessionResponse) -> Self {
        Self {
            session_id: resp.session_id.clone(),
            thread_id: resp.thread_id.clone(),
            created_at: resp.created_at.clone(),
        }
    }
}

/// Insertion-ordered list with set semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupList {
    items: Vec<String>,
}

impl DedupList {
    /// Add `item` unless already present. Returns whether it was new.
    pub fn insert(&mut self, item: &str) -> bool {
        if self.contains(item) {
            return false;
        }
        self.items.push(item.to_string());
        true
    }

    pub fn extend<'a>(&mut self, items: impl IntoIterator<Item = &'a String>) {
        for item in items {
            self.insert(item);
        }
    }

    pub fn contains(&self, item: &str) -> bool {
        self.items.iter().any(|i| i == item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    AwaitingFirstEvent,
    Streaming,
    Done,
    Failed,
}

impl TurnPhase {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, TurnPhase::AwaitingFirstEvent | TurnPhase::Streaming)
    }
}

/// Handle for one in-flight turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnTicket {
    session_id: String,
    turn: u64,
}

impl TurnTicket {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }
}

/// What [`ConversationState::dispatch`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// State changed; the turn continues.
    Applied,
    /// State changed; the turn is over.
    Terminal,
    /// Ticket was stale or the turn had already ended. Nothing changed.
    Discarded,
}

// ---------------------------------------------------------------------------
// ConversationState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ConversationState {
    session: Option<ActiveSession>,
    messages: Vec<Message>,
    active_tool: Option<ToolDisplay>,
    tools_used: DedupList,
    papers_found: DedupList,
    pdf_path: Option<String>,
    loading: bool,
    phase: TurnPhase,
    pending_tools: Vec<String>,
    // Transcript index of the assistant entry owned by the in-flight turn.
    streaming_index: Option<usize>,
    turn: u64,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            session: None,
            messages: Vec::new(),
            active_tool: None,
            tools_used: DedupList::default(),
            papers_found: DedupList::default(),
            pdf_path: None,
            loading: false,
            phase: TurnPhase::Idle,
            pending_tools: Vec::new(),
            streaming_index: None,
            turn: 0,
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn session(&self) -> Option<&ActiveSession> {
        self.session.as_ref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session_id.as_str())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn active_tool(&self) -> Option<&ToolDisplay> {
        self.active_tool.as_ref()
    }

    pub fn tools_used(&self) -> &DedupList {
        &self.tools_used
    }

    pub fn papers_found(&self) -> &DedupList {
        &self.papers_found
    }

    pub fn pdf_path(&self) -> Option<&str> {
        self.pdf_path.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    // -- session lifecycle --------------------------------------------------

    /// Adopt a freshly created session. Everything scoped to the previous
    /// session is dropped and any outstanding ticket becomes stale.
    pub fn start_session(&mut self, resp: &SessionResponse, greeting: &str) {
        self.reset();
        self.session = Some(ActiveSession::from(resp));
        self.messages.push(Message {
            role: Role::Assistant,
            content: greeting.to_string(),
            timestamp: "Just now".to_string(),
        });
    }

    /// Forget the current session without adopting a new one.
    pub fn end_session(&mut self) {
        self.reset();
        self.session = None;
    }

    fn reset(&mut self) {
        self.messages.clear();
        self.active_tool = None;
        self.tools_used.clear();
        self.papers_found.clear();
        self.pdf_path = None;
        self.loading = false;
        self.phase = TurnPhase::Idle;
        self.pending_tools.clear();
        self.streaming_index = None;
        self.turn += 1;
    }

    /// Replace local state with a server snapshot of the same session.
    ///
    /// Refused (returns `false`) while a turn is loading or when the
    /// snapshot belongs to another session.
    pub fn resync(&mut self, status: &SessionStatus) -> bool {
        if self.loading || self.session_id() != Some(status.session_id.as_str()) {
            return false;
        }
        self.messages = status
            .chat_history
            .iter()
            .map(|m| Message { role: m.role, content: m.content.clone(), timestamp: String::new() })
            .collect();
        self.tools_used.clear();
        self.tools_used.extend(&status.tools_used);
        self.papers_found.clear();
        self.papers_found.extend(&status.papers_found);
        self.pdf_path = status.pdf_path.clone().filter(|p| !p.is_empty());
        true
    }

    // -- turns --------------------------------------------------------------

    /// Open a turn for a user message: append it and start loading.
    pub fn begin_turn(&mut self, text: &str) -> Result<TurnTicket> {
        let ticket = self.open_turn()?;
        self.messages.push(Message::user(text));
        Ok(ticket)
    }

    /// Open a turn that has no user message (quick actions).
    pub fn begin_action(&mut self) -> Result<TurnTicket> {
        self.open_turn()
    }

    fn open_turn(&mut self) -> Result<TurnTicket> {
        let session_id = self.session_id().ok_or(ClientError::NoSession)?.to_string();
        if self.loading {
            return Err(ClientError::TurnInProgress);
        }
        self.turn += 1;
        self.loading = true;
        self.phase = TurnPhase::AwaitingFirstEvent;
        self.pending_tools.clear();
        self.streaming_index = None;
        Ok(TurnTicket { session_id, turn: self.turn })
    }

    fn is_current(&self, ticket: &TurnTicket) -> bool {
        self.phase.is_in_flight()
            && ticket.turn == self.turn
            && self.session_id() == Some(ticket.session_id.as_str())
    }

    /// Apply one stream event to the turn identified by `ticket`.
    pub fn dispatch(
        &mut self,
        ticket: &TurnTicket,
        event: StreamEvent,
        notifier: &dyn Notifier,
    ) -> Dispatch {
        if !self.is_current(ticket) {
            debug!(
                ticket_session = %ticket.session_id,
                ticket_turn = ticket.turn,
                kind = event.kind(),
                "discarding event for stale turn"
            );
            return Dispatch::Discarded;
        }

        match event {
            StreamEvent::Tool { tool_name } => {
                self.active_tool = Some(describe_tool(&tool_name));
                self.pending_tools.push(tool_name);
                self.phase = TurnPhase::Streaming;
                Dispatch::Applied
            }
            StreamEvent::Message { content } => {
                match self.streaming_index {
                    Some(i) => self.messages[i].content = content,
                    None => {
                        self.messages.push(Message::assistant(content));
                        self.streaming_index = Some(self.messages.len() - 1);
                    }
                }
                self.phase = TurnPhase::Streaming;
                Dispatch::Applied
            }
            StreamEvent::Pdf { pdf_path } => {
                if pdf_path.is_empty() {
                    warn!("pdf event without a path");
                } else {
                    self.pdf_path = Some(pdf_path);
                    notifier.notify(NoticeKind::Success, PDF_READY_NOTICE);
                }
                self.phase = TurnPhase::Streaming;
                Dispatch::Applied
            }
            StreamEvent::Done => {
                self.complete();
                Dispatch::Terminal
            }
            StreamEvent::Error { message } => {
                self.fail(&message, notifier);
                Dispatch::Terminal
            }
        }
    }

    /// The stream closed. If it did so without `done` or `error`, the turn
    /// is completed as if `done` had arrived.
    pub fn close_turn(&mut self, ticket: &TurnTicket) -> Dispatch {
        if !self.is_current(ticket) {
            return Dispatch::Discarded;
        }
        debug!(turn = ticket.turn, "stream ended without a terminal event");
        self.complete();
        Dispatch::Terminal
    }

    /// The request behind the turn failed (could not connect, non-2xx,
    /// read error). Content already streamed is kept.
    pub fn fail_turn(
        &mut self,
        ticket: &TurnTicket,
        message: &str,
        notifier: &dyn Notifier,
    ) -> Dispatch {
        if !self.is_current(ticket) {
            return Dispatch::Discarded;
        }
        self.fail(message, notifier);
        Dispatch::Terminal
    }

    /// Fold a full `/chat` or `/quick-action` response into the turn.
    pub fn complete_with_response(&mut self, ticket: &TurnTicket, resp: &ChatResponse) -> Dispatch {
        if !self.is_current(ticket) {
            return Dispatch::Discarded;
        }
        self.tools_used.extend(&resp.tools_used);
        self.papers_found.extend(&resp.papers_found);
        if let Some(path) = resp.pdf_path.as_deref().filter(|p| !p.is_empty()) {
            self.pdf_path = Some(path.to_string());
        }
        self.messages.push(Message::assistant(resp.response.clone()));
        self.complete();
        Dispatch::Terminal
    }

    fn complete(&mut self) {
        for tool in std::mem::take(&mut self.pending_tools) {
            self.tools_used.insert(&tool);
        }
        self.settle(TurnPhase::Done);
    }

    fn fail(&mut self, message: &str, notifier: &dyn Notifier) {
        self.pending_tools.clear();
        self.settle(TurnPhase::Failed);
        notifier.notify(NoticeKind::Error, message);
    }

    fn settle(&mut self, phase: TurnPhase) {
        self.active_tool = None;
        self.loading = false;
        self.streaming_index = None;
        self.phase = phase;
    }
}
