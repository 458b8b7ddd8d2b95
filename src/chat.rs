//! The chat view's controller.
//!
//! [`ChatSession`] owns the [`ConversationState`], the HTTP client and the
//! notifier, and turns user intents (send, quick action, new session,
//! refresh, download) into client calls plus state transitions. Every path
//! leaves the state settled: no failure leaves a turn loading.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::client::ResearchClient;
use crate::dispatcher::{
    ConversationState, Dispatch, NoticeKind, Notifier, TurnPhase, TurnTicket, NEW_SESSION_MESSAGE,
    WELCOME_MESSAGE,
};
use crate::protocol::QuickAction;

/// Last known backend health, shown in the status header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Unknown,
    Healthy { active_sessions: u64 },
    Degraded { status: String },
    Unreachable,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Unknown => write!(f, "unknown"),
            HealthStatus::Healthy { active_sessions } => {
                write!(f, "healthy ({active_sessions} active sessions)")
            }
            HealthStatus::Degraded { status } => write!(f, "{status}"),
            HealthStatus::Unreachable => write!(f, "unreachable"),
        }
    }
}

pub struct ChatSession<N: Notifier> {
    client: ResearchClient,
    state: ConversationState,
    notifier: N,
    health: HealthStatus,
    streaming: bool,
}

impl<N: Notifier> ChatSession<N> {
    pub fn new(client: ResearchClient, notifier: N) -> Self {
        Self {
            client,
            state: ConversationState::new(),
            notifier,
            health: HealthStatus::Unknown,
            streaming: true,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn client(&self) -> &ResearchClient {
        &self.client
    }

    pub fn health(&self) -> &HealthStatus {
        &self.health
    }

    /// Use `/chat/stream` (default) or plain `/chat`.
    pub fn set_streaming(&mut self, streaming: bool) {
        self.streaming = streaming;
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Create the first session of the run. On failure no greeting is shown
    /// and there is no session.
    pub async fn open(&mut self) -> bool {
        self.create_and_adopt(WELCOME_MESSAGE).await
    }

    /// Drop the current session (best-effort server delete) and start over.
    pub async fn new_session(&mut self) -> bool {
        if let Some(old) = self.state.session_id().map(str::to_string) {
            if let Err(e) = self.client.delete_session(&old).await {
                warn!(session_id = %old, error = %e, "could not delete old session, continuing");
            }
        }
        self.state.end_session();
        let created = self.create_and_adopt(NEW_SESSION_MESSAGE).await;
        if created {
            self.notifier.notify(NoticeKind::Success, "New session started");
        }
        created
    }

    async fn create_and_adopt(&mut self, greeting: &str) -> bool {
        match self.client.create_session().await {
            Ok(resp) => {
                self.state.start_session(&resp, greeting);
                true
            }
            Err(e) => {
                self.notifier
                    .notify(NoticeKind::Error, &format!("Failed to create session: {e}"));
                false
            }
        }
    }

    /// Pull the server's view of the session and replace the local one.
    pub async fn refresh(&mut self) -> bool {
        let Some(session_id) = self.state.session_id().map(str::to_string) else {
            self.notifier.notify(NoticeKind::Error, "No active session");
            return false;
        };
        match self.client.get_session_status(&session_id).await {
            Ok(status) => {
                let applied = self.state.resync(&status);
                if !applied {
                    warn!(session_id = %session_id, "session snapshot not applied");
                }
                applied
            }
            Err(e) => {
                self.notifier
                    .notify(NoticeKind::Error, &format!("Failed to get session status: {e}"));
                false
            }
        }
    }

    /// Probe `/health` and remember the outcome.
    pub async fn check_health(&mut self) -> &HealthStatus {
        self.health = match self.client.check_health().await {
            Ok(h) if h.status == "healthy" => HealthStatus::Healthy {
                active_sessions: h.active_sessions,
            },
            Ok(h) => HealthStatus::Degraded { status: h.status },
            Err(e) => {
                self.notifier
                    .notify(NoticeKind::Error, &format!("Health check failed: {e}"));
                HealthStatus::Unreachable
            }
        };
        &self.health
    }

    // -----------------------------------------------------------------------
    // Turns
    // -----------------------------------------------------------------------

    /// Send a user message and drive the turn to completion.
    pub async fn send_message(&mut self, text: &str) -> TurnPhase {
        self.send_message_with(text, |_| {}).await
    }

    /// Like [`send_message`](Self::send_message), calling `on_update` with
    /// the state after every applied event.
    pub async fn send_message_with<F>(&mut self, text: &str, mut on_update: F) -> TurnPhase
    where
        F: FnMut(&ConversationState),
    {
        let ticket = match self.state.begin_turn(text) {
            Ok(t) => t,
            Err(e) => {
                self.notifier.notify(NoticeKind::Error, &e.to_string());
                return self.state.phase();
            }
        };
        on_update(&self.state);

        if self.streaming {
            self.run_stream(&ticket, text, &mut on_update).await;
        } else {
            match self.client.send_message(ticket.session_id(), text).await {
                Ok(resp) => {
                    self.state.complete_with_response(&ticket, &resp);
                }
                Err(e) => {
                    self.state.fail_turn(&ticket, &e.to_string(), &self.notifier);
                }
            }
        }
        on_update(&self.state);
        self.state.phase()
    }

    async fn run_stream<F>(&mut self, ticket: &TurnTicket, text: &str, on_update: &mut F)
    where
        F: FnMut(&ConversationState),
    {
        let mut events = match self.client.open_stream(ticket.session_id(), text).await {
            Ok(events) => events,
            Err(e) => {
                self.state.fail_turn(ticket, &e.to_string(), &self.notifier);
                return;
            }
        };

        while let Some(item) = events.next_event().await {
            match item {
                Ok(event) => match self.state.dispatch(ticket, event, &self.notifier) {
                    Dispatch::Applied => on_update(&self.state),
                    Dispatch::Terminal | Dispatch::Discarded => return,
                },
                Err(e) => {
                    self.state.fail_turn(ticket, &e.to_string(), &self.notifier);
                    return;
                }
            }
        }
        self.state.close_turn(ticket);
    }

    /// Run a quick action. All-or-nothing: on failure nothing is merged.
    pub async fn quick_action(&mut self, action: QuickAction) -> TurnPhase {
        let ticket = match self.state.begin_action() {
            Ok(t) => t,
            Err(e) => {
                self.notifier.notify(NoticeKind::Error, &e.to_string());
                return self.state.phase();
            }
        };
        info!(action = %action, session_id = %ticket.session_id(), "quick action");
        self.notifier
            .notify(NoticeKind::Info, &format!("Triggered: {}", action.label()));

        match self.client.execute_quick_action(ticket.session_id(), action).await {
            Ok(resp) => {
                self.state.complete_with_response(&ticket, &resp);
            }
            Err(e) => {
                self.state.fail_turn(
                    &ticket,
                    &format!("Failed to execute quick action: {e}"),
                    &self.notifier,
                );
            }
        }
        self.state.phase()
    }

    // -----------------------------------------------------------------------
    // Artifacts
    // -----------------------------------------------------------------------

    /// Save the session's PDF. Without `dest`, it goes to the configured
    /// download directory as `research_<session>.pdf`.
    pub async fn download_pdf(&mut self, dest: Option<&Path>) -> Option<PathBuf> {
        let Some(session_id) = self.state.session_id().map(str::to_string) else {
            self.notifier.notify(NoticeKind::Error, "No active session");
            return None;
        };
        if self.state.pdf_path().is_none() {
            self.notifier
                .notify(NoticeKind::Error, "No PDF has been generated for this session yet");
            return None;
        }

        let dest = match dest {
            Some(p) => p.to_path_buf(),
            None => self
                .client
                .config()
                .pdf_dir
                .join(format!("research_{session_id}.pdf")),
        };
        match self.client.download_pdf(&session_id, &dest).await {
            Ok(_) => {
                self.notifier
                    .notify(NoticeKind::Success, &format!("PDF saved to {}", dest.display()));
                Some(dest)
            }
            Err(e) => {
                self.notifier
                    .notify(NoticeKind::Error, &format!("Failed to download PDF: {e}"));
                None
            }
        }
    }
}
