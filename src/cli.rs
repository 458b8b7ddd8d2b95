use std::path::PathBuf;

use clap::Parser;
use clap_complete::Shell;

use crate::protocol::QuickAction;

#[derive(Parser)]
#[command(name = "research-chat")]
#[command(version)]
#[command(about = "Terminal chat client for the AI research assistant backend")]
pub struct Args {
    /// Backend base URL (overrides config file and RESEARCH_API_URL)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Path to a TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Send one message, print the answer and exit
    #[arg(long, short)]
    pub message: Option<String>,

    /// Run one quick action and exit
    #[arg(long, value_enum)]
    pub quick_action: Option<QuickAction>,

    /// Use the request/response endpoint instead of streaming
    #[arg(long)]
    pub no_stream: bool,

    /// Check backend health and exit
    #[arg(long)]
    pub health: bool,

    /// Debug-level logging on stderr (RUST_LOG still wins)
    #[arg(long, short)]
    pub verbose: bool,

    /// Print shell completions and exit
    #[arg(long, value_enum)]
    pub completions: Option<Shell>,
}

impl Args {
    /// `tracing` filter directive implied by the flags.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "research_assistant=debug,research_chat=debug"
        } else {
            "research_assistant=warn,research_chat=warn"
        }
    }
}

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    NewSession,
    Quick(QuickAction),
    Status,
    Pdf(Option<PathBuf>),
    Health,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

/// Interpret a line typed at the prompt. Anything not starting with `/` is
/// a message.
pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Send(line.to_string());
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or("").to_lowercase();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    match name.as_str() {
        "new" => Command::NewSession,
        "search" | "search-all" => Command::Quick(QuickAction::SearchAll),
        "paper" | "write-paper" => Command::Quick(QuickAction::WritePaper),
        "status" => Command::Status,
        "pdf" => Command::Pdf(arg.map(PathBuf::from)),
        "health" => Command::Health,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}
