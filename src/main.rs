use std::io::{self, Write};

use clap::{CommandFactory, Parser};
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use research_assistant::chat::{ChatSession, HealthStatus};
use research_assistant::cli::{parse_command, Args, Command};
use research_assistant::client::ResearchClient;
use research_assistant::config::ClientConfig;
use research_assistant::dispatcher::TurnPhase;
use research_assistant::protocol::{QuickAction, Role};
use research_assistant::render::{
    render_header, render_help, render_message, render_sidebar, render_tool_activity,
    ConsoleNotifier, StreamPrinter,
};

type Chat = ChatSession<ConsoleNotifier>;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {}", "error:".bright_red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "research-chat", &mut io::stdout());
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter())),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = ClientConfig::load(args.config.as_deref())?;
    if let Some(url) = &args.api_url {
        config = config.with_base_url(url);
    }

    let mut chat = ChatSession::new(ResearchClient::new(config), ConsoleNotifier);
    chat.set_streaming(!args.no_stream);

    if args.health {
        let health = chat.check_health().await.clone();
        println!("{health}");
        if health == HealthStatus::Unreachable {
            return Err("backend unreachable".into());
        }
        return Ok(());
    }

    if let Some(text) = args.message.as_deref() {
        open_or_fail(&mut chat).await?;
        return finish(run_turn(&mut chat, text).await);
    }
    if let Some(action) = args.quick_action {
        open_or_fail(&mut chat).await?;
        return finish(run_quick_action(&mut chat, action).await);
    }

    repl(&mut chat).await
}

async fn open_or_fail(chat: &mut Chat) -> Result<(), Box<dyn std::error::Error>> {
    if chat.open().await {
        Ok(())
    } else {
        Err("could not create a session".into())
    }
}

fn finish(phase: TurnPhase) -> Result<(), Box<dyn std::error::Error>> {
    match phase {
        TurnPhase::Failed => Err("the assistant could not complete the request".into()),
        _ => Ok(()),
    }
}

async fn repl(chat: &mut Chat) -> Result<(), Box<dyn std::error::Error>> {
    chat.check_health().await;
    println!("{}", render_header(chat.client().base_url(), chat.health()));

    if chat.open().await {
        for message in chat.state().messages() {
            println!("{}\n", render_message(message));
        }
    } else {
        eprintln!("{}", "Use /new to try again.".dimmed());
    }
    println!("{}", "Type /help for commands.".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".bright_green().bold());
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_command(&line) {
            Command::Empty => {}
            Command::Send(text) => {
                run_turn(chat, &text).await;
            }
            Command::NewSession => {
                if chat.new_session().await {
                    if let Some(greeting) = chat.state().messages().first() {
                        println!("{}\n", render_message(greeting));
                    }
                }
            }
            Command::Quick(action) => {
                run_quick_action(chat, action).await;
            }
            Command::Status => {
                chat.refresh().await;
                println!("{}", render_sidebar(chat.state()));
            }
            Command::Pdf(dest) => {
                chat.download_pdf(dest.as_deref()).await;
            }
            Command::Health => {
                println!("{}", chat.check_health().await);
            }
            Command::Help => println!("{}", render_help()),
            Command::Quit => break,
            Command::Unknown(cmd) => {
                eprintln!("unknown command {cmd}, try /help");
            }
        }
    }
    Ok(())
}

/// Send one message, echoing tool activity and the growing answer.
async fn run_turn(chat: &mut Chat, text: &str) -> TurnPhase {
    let before = chat.state().messages().len();
    let mut printer = StreamPrinter::new();
    let mut last_tool: Option<String> = None;

    let phase = chat
        .send_message_with(text, |state| {
            if let Some(tool) = state.active_tool() {
                if last_tool.as_deref() != Some(tool.tool.as_str()) {
                    println!("{}", render_tool_activity(tool));
                    last_tool = Some(tool.tool.clone());
                }
            }
            // user message sits at `before`, the answer right after it
            let messages = state.messages();
            if messages.len() > before + 1 {
                if let Some(answer) = messages.last().filter(|m| m.role == Role::Assistant) {
                    if !printer.has_output() {
                        println!("{}", "Assistant".bright_cyan().bold());
                    }
                    print!("{}", printer.update(&answer.content));
                    let _ = io::stdout().flush();
                }
            }
        })
        .await;

    if printer.has_output() {
        println!("\n");
    }
    phase
}

async fn run_quick_action(chat: &mut Chat, action: QuickAction) -> TurnPhase {
    let phase = chat.quick_action(action).await;
    if phase == TurnPhase::Done {
        if let Some(answer) = chat.state().messages().last() {
            println!("{}\n", render_message(answer));
        }
    }
    phase
}
