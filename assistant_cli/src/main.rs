// assistant_cli/src/main.rs

use anyhow::Context;
use chat_store::{MemorySessionStore, SqliteSessionStore};
use common_utils::AppConfig;
use orchestrator::Orchestrator;
use router_core::{Role, SessionStore};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const HELP: &str = "Commands: /new, /list, /open <id>, /history, /delete <id>, /stats, exit";

/// One line of REPL input.
#[derive(Debug, PartialEq, Eq)]
enum CliCommand {
    Exit,
    Help,
    New,
    List,
    Open(String),
    History,
    Delete(String),
    Stats,
    Ask(String),
    Unknown(String),
}

fn parse_line(line: &str) -> Option<CliCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return Some(CliCommand::Exit);
    }
    if !line.starts_with('/') {
        return Some(CliCommand::Ask(line.to_string()));
    }

    let mut parts = line.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).unwrap_or_default();
    let command = match (name, arg.is_empty()) {
        ("/help", _) => CliCommand::Help,
        ("/new", _) => CliCommand::New,
        ("/list", _) => CliCommand::List,
        ("/history", _) => CliCommand::History,
        ("/stats", _) => CliCommand::Stats,
        ("/open", false) => CliCommand::Open(arg.to_string()),
        ("/delete", false) => CliCommand::Delete(arg.to_string()),
        _ => CliCommand::Unknown(line.to_string()),
    };
    Some(command)
}

fn new_conversation_id() -> String {
    Uuid::new_v4().to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never mix with answers.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let ephemeral = std::env::args().skip(1).any(|arg| arg == "--ephemeral");
    let config = AppConfig::from_env()?;
    let store: Arc<dyn SessionStore> = if ephemeral {
        Arc::new(MemorySessionStore::new())
    } else {
        Arc::new(
            SqliteSessionStore::open(&config.database_path)
                .with_context(|| format!("cannot open {}", config.database_path.display()))?,
        )
    };
    let orchestrator = Orchestrator::from_config(&config, store)?;

    println!("CodeBurrito assistant ({:?} variant). Type 'exit' to quit.", orchestrator.variant());
    println!("{}", HELP);

    let mut editor = DefaultEditor::new()?;
    let mut conversation_id = new_conversation_id();

    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let Some(command) = parse_line(&line) else {
            continue;
        };
        let _ = editor.add_history_entry(line.as_str());

        match command {
            CliCommand::Exit => break,
            CliCommand::Help => println!("{}", HELP),
            CliCommand::New => {
                conversation_id = new_conversation_id();
                println!("Started conversation {}", conversation_id);
            }
            CliCommand::List => match orchestrator.list_conversations().await {
                Ok(list) if list.is_empty() => println!("No saved conversations."),
                Ok(list) => {
                    for c in list {
                        let marker = if c.id == conversation_id { "*" } else { " " };
                        println!(
                            "{} {}  {}  ({} messages, {})",
                            marker,
                            c.id,
                            c.title,
                            c.message_count,
                            c.updated_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                }
                Err(e) => eprintln!("[Error] {}", e),
            },
            CliCommand::Open(id) => {
                conversation_id = id;
                println!("Switched to conversation {}", conversation_id);
            }
            CliCommand::History => match orchestrator.history(&conversation_id).await {
                Ok(messages) => {
                    // tool plumbing stays out of the transcript
                    for m in messages.iter().filter(|m| m.role != Role::Tool && !m.has_tool_calls()) {
                        println!("[{}] {}", m.role, m.content);
                    }
                }
                Err(e) => eprintln!("[Error] {}", e),
            },
            CliCommand::Delete(id) => match orchestrator.delete_conversation(&id).await {
                Ok(()) => {
                    println!("Deleted conversation {}", id);
                    if id == conversation_id {
                        conversation_id = new_conversation_id();
                    }
                }
                Err(e) => eprintln!("[Error] {}", e),
            },
            CliCommand::Stats => {
                let stats = orchestrator.stats();
                println!(
                    "Total: {}  Coding: {}  General: {}  Tool calls: {}",
                    stats.total_queries, stats.coding_queries, stats.general_queries, stats.tool_calls
                );
            }
            CliCommand::Ask(text) => {
                debug!("[CLI] Sending turn on {}", conversation_id);
                match orchestrator.handle_turn(&conversation_id, &text).await {
                    Ok(outcome) => {
                        if let Some(route) = outcome.route {
                            println!("[{}]", route);
                        }
                        println!("{}", outcome.answer);
                    }
                    Err(e) => eprintln!("[Error] {}", e),
                }
            }
            CliCommand::Unknown(raw) => eprintln!("Unknown command '{}'. {}", raw, HELP),
        }
    }

    println!("Bye!");
    Ok(())
}
