//! searchly - terminal chat client for the Searchly backend

mod config;

use clap::Parser;
use searchly_chat::{ChatSession, HttpTransport, Message, SearchStage, SessionEvent};
use searchly_stream::ChatClient;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::broadcast;

/// searchly - streamed AI answers with web search
#[derive(Parser, Debug)]
#[command(name = "searchly")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the chat backend
    #[arg(short, long)]
    base_url: Option<String>,

    /// Run a single prompt and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("searchly=debug")
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    // Load config file and merge with CLI args (CLI takes precedence)
    let cfg = config::Config::load();
    let base_url = args
        .base_url
        .or(cfg.base_url)
        .unwrap_or_else(|| config::DEFAULT_BASE_URL.to_string());
    tracing::debug!("chat backend: {base_url}");

    let client = ChatClient::new(base_url);
    let session = ChatSession::new(Arc::new(HttpTransport::new(client)));

    // Non-interactive mode
    if let Some(prompt) = args.command {
        run_prompt(&session, &prompt).await?;
        return Ok(());
    }

    run_interactive(session).await
}

/// Tracks what the renderer has already written for the current turn.
#[derive(Default)]
struct TurnRenderer {
    printed_chars: usize,
    stages_seen: usize,
}

impl TurnRenderer {
    /// Print whatever the updated message added: new search stages first,
    /// then the content suffix that has not been written yet.
    fn render(&mut self, message: &Message) {
        if let Some(search) = &message.search {
            for stage in &search.stages[self.stages_seen..] {
                match stage {
                    SearchStage::Searching => println!("[searching: {}]", search.query),
                    SearchStage::Reading => {
                        println!("[reading {} results]", search.urls.len());
                        for url in &search.urls {
                            println!("  {}", url);
                        }
                    }
                    SearchStage::Writing => println!("[writing]"),
                    SearchStage::Error => println!(
                        "[search failed: {}]",
                        search.error.as_deref().unwrap_or("unknown")
                    ),
                }
            }
            self.stages_seen = search.stages.len();
        }

        // Content grows append-only; chars, not bytes, so multi-byte
        // text indexes safely.
        let chars: Vec<char> = message.content.chars().collect();
        if chars.len() > self.printed_chars {
            let new_text: String = chars[self.printed_chars..].iter().collect();
            print!("{}", new_text);
            io::stdout().flush().ok();
            self.printed_chars = chars.len();
        }
    }
}

/// Run one turn to completion, rendering events as they arrive.
/// Ctrl-C aborts the stream; the partial answer stands.
async fn consume_turn(
    session: &ChatSession,
    receiver: &mut broadcast::Receiver<SessionEvent>,
) -> anyhow::Result<()> {
    let mut renderer = TurnRenderer::default();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                session.abort();
            }
            event = receiver.recv() => match event {
                Ok(SessionEvent::TurnStart { .. }) => {}
                Ok(SessionEvent::MessageUpdate { message }) => {
                    renderer.render(&message);
                }
                Ok(SessionEvent::TurnEnd { message }) => {
                    renderer.render(&message);
                    println!();
                    return Ok(());
                }
                Ok(SessionEvent::Error { message }) => {
                    eprintln!("\nError: {}", message);
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            }
        }
    }
}

async fn run_prompt(session: &ChatSession, prompt: &str) -> anyhow::Result<()> {
    println!("searchly> {}", prompt);
    println!();

    let mut receiver = session.subscribe();
    session.send(prompt)?;
    consume_turn(session, &mut receiver).await
}

async fn run_interactive(session: ChatSession) -> anyhow::Result<()> {
    if std::io::IsTerminal::is_terminal(&io::stderr()) {
        eprintln!("searchly - type a question, /new for a fresh conversation, exit to quit");
        eprintln!();
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }
        if input == "/new" {
            session.reset();
            println!("Started a new conversation.");
            println!();
            continue;
        }

        println!();

        let mut receiver = session.subscribe();
        session.set_draft(input);
        if let Err(e) = session.send_draft() {
            eprintln!("Error: {}", e);
            continue;
        }
        consume_turn(&session, &mut receiver).await?;
        println!();
    }

    Ok(())
}
