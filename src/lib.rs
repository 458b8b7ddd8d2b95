//! Client for the AI research assistant backend.
//!
//! The backend keeps sessions, runs research tools and renders PDFs; this
//! crate talks to it over HTTP and Server-Sent Events and folds the streamed
//! events into a conversation the terminal front end can render.
//!
//! ```rust,ignore
//! let client = ResearchClient::builder("http://localhost:8000").build();
//! let mut chat = ChatSession::new(client, ConsoleNotifier);
//! if chat.open().await {
//!     chat.send_message("recent work on protein folding").await;
//! }
//! ```

pub mod chat;
pub mod cli;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod render;
pub mod sse;
pub mod tools;

pub use chat::{ChatSession, HealthStatus};
pub use client::{EventStream, ResearchClient, ResearchClientBuilder};
pub use config::ClientConfig;
pub use dispatcher::{
    ConversationState, Dispatch, Message, NoticeKind, NoticeLog, Notifier, TurnPhase, TurnTicket,
};
pub use error::{ClientError, ErrorCategory, Result};
pub use protocol::{QuickAction, Role, StreamEvent};
pub use render::ConsoleNotifier;
