//! Terminal presentation: transcript entries, tool activity, the session
//! sidebar, and a notifier that prints to stderr.
//!
//! Everything here reads state; nothing mutates it.

use colored::*;
use tracing::{error, info};

use crate::chat::HealthStatus;
use crate::dispatcher::{ConversationState, Message, NoticeKind, Notifier};
use crate::protocol::{QuickAction, Role};
use crate::tools::ToolDisplay;

/// Header line printed once at startup.
pub fn render_header(base_url: &str, health: &HealthStatus) -> String {
    let health_str = match health {
        HealthStatus::Healthy { .. } => health.to_string().bright_green(),
        HealthStatus::Unknown => health.to_string().normal(),
        HealthStatus::Degraded { .. } => health.to_string().bright_yellow(),
        HealthStatus::Unreachable => health.to_string().bright_red(),
    };
    format!(
        "{}\n{}: {}\n{}: {}\n{}",
        "AI RESEARCH ASSISTANT".bright_cyan().bold(),
        "Backend".bright_yellow(),
        base_url,
        "Health".bright_yellow(),
        health_str,
        "=".repeat(50).bright_blue()
    )
}

/// One transcript entry with its role label and timestamp.
pub fn render_message(message: &Message) -> String {
    let label = match message.role {
        Role::User => "You".bright_white().bold(),
        Role::Assistant => "Assistant".bright_cyan().bold(),
    };
    if message.timestamp.is_empty() {
        format!("{label}\n{}", message.content)
    } else {
        format!("{label} {}\n{}", message.timestamp.dimmed(), message.content)
    }
}

/// The "tool running" indicator.
pub fn render_tool_activity(tool: &ToolDisplay) -> String {
    format!(
        "{} {} {}",
        tool.icon.glyph(),
        tool.name.bright_yellow().bold(),
        tool.status.dimmed()
    )
}

/// Session info, quick actions, tools, papers and PDF status.
pub fn render_sidebar(state: &ConversationState) -> String {
    let mut out = Vec::new();

    out.push(format!("{}", "SESSION INFO".bright_yellow()));
    match state.session() {
        Some(s) => {
            let status = if state.is_loading() { "Working" } else { "Active" };
            out.push(format!("  {} {}", "●".bright_green(), status));
            out.push(format!("  id: {}", s.session_id));
            let created = if s.created_at.is_empty() { "Just now" } else { s.created_at.as_str() };
            out.push(format!("  created: {created}"));
        }
        None => out.push(format!("  {}", "No active session".italic())),
    }

    out.push(format!("{}", "QUICK ACTIONS".bright_yellow()));
    out.push(format!("  /search  {}", QuickAction::SearchAll.label()));
    out.push(format!("  /paper   {}", QuickAction::WritePaper.label()));
    out.push("  /new     Start New Session".to_string());

    out.push(format!(
        "{}",
        format!("TOOLS USED ({})", state.tools_used().len()).bright_yellow()
    ));
    if state.tools_used().is_empty() {
        out.push(format!("  {}", "No tools used yet".italic()));
    } else {
        out.extend(state.tools_used().iter().map(|t| format!("  {} {t}", "✓".bright_green())));
    }

    out.push(format!(
        "{}",
        format!("PAPERS FOUND ({})", state.papers_found().len()).bright_yellow()
    ));
    if state.papers_found().is_empty() {
        out.push(format!("  {}", "No papers discovered yet".italic()));
    } else {
        out.extend(state.papers_found().iter().map(|p| format!("  - {p}")));
    }

    if let Some(path) = state.pdf_path() {
        out.push(format!("{}", "PDF STATUS".bright_yellow()));
        out.push(format!("  {} PDF Generated ({path})", "✓".bright_green()));
        out.push("  /pdf [path] to download".to_string());
    }

    out.join("\n")
}

pub fn render_help() -> String {
    [
        "Type a message to ask the assistant. Commands:",
        "  /new            start a new session",
        "  /search         search all databases",
        "  /paper          write a research paper",
        "  /status         show session sidebar (resyncs with the server)",
        "  /pdf [path]     download the generated PDF",
        "  /health         check backend health",
        "  /help           show this help",
        "  /quit           exit",
    ]
    .join("\n")
}

/// Turns successive full-text `message` payloads into what must be written
/// to a terminal that cannot rewrite earlier output.
#[derive(Debug, Default)]
pub struct StreamPrinter {
    printed: String,
}

impl StreamPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text to write so the terminal shows `content`. When `content`
    /// extends what was printed, only the new suffix; otherwise a newline
    /// and the whole text again.
    pub fn update(&mut self, content: &str) -> String {
        let out = match content.strip_prefix(self.printed.as_str()) {
            Some(suffix) => suffix.to_string(),
            None => format!("\n{content}"),
        };
        self.printed = content.to_string();
        out
    }

    pub fn has_output(&self) -> bool {
        !self.printed.is_empty()
    }
}

/// Prints notifications to stderr and mirrors them into the log.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Info => {
                info!(notice = %message, "info");
                eprintln!("{} {}", "[info]".bright_blue(), message);
            }
            NoticeKind::Success => {
                info!(notice = %message, "success");
                eprintln!("{} {}", "[ok]".bright_green(), message);
            }
            NoticeKind::Error => {
                error!(notice = %message, "error");
                eprintln!("{} {}", "[error]".bright_red().bold(), message);
            }
        }
    }
}
