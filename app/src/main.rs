#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use std::io::Write as _;

use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

use triage_config::Config;
use triage_engine::{ConsultationEngine, EngineConfig};
use triage_providers::GeminiProvider;
use triage_store::JsonFileStore;

type Engine = ConsultationEngine<GeminiProvider, JsonFileStore>;

#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Virtual clinician consultation sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new consultation session
    Start,
    /// Chat with the clinician (interactive unless -m is given)
    Chat {
        /// Continue an existing session
        #[arg(short, long)]
        session: Option<Uuid>,

        /// Single message to send
        #[arg(short = 'm', long)]
        message: Option<String>,
    },
    /// List stored sessions, most recently updated first
    Sessions,
    /// Load a stored session into the cache and show it
    Load { session: Uuid },
    /// Show a session's history without touching the cache
    History { session: Uuid },
    /// Generate a consultation summary artifact
    Summary { session: Uuid },
    /// Replace a session with a fresh one under the same id
    Restart { session: Uuid },
    /// Delete a session and its summary artifact
    Delete { session: Uuid },
    /// Show cache and store counts
    Stats,
    /// Initialize configuration
    Init,
    /// Show version
    Version,
}

fn build_engine() -> anyhow::Result<Engine> {
    let config = Config::load()?;
    info!("Loaded config from ~/triage/config.json");

    let provider = GeminiProvider::new(config.providers.gemini.api_key.clone());
    let (sessions_dir, summaries_dir) = config.storage.resolve()?;
    let store = JsonFileStore::new(sessions_dir, summaries_dir)?;

    let engine_config = EngineConfig {
        model: config.engine.model.clone(),
        max_history: config.engine.max_history,
        session_ttl_secs: config.engine.session_ttl_secs,
        limits: config.engine.limits(),
    };

    Ok(ConsultationEngine::new(provider, store, engine_config))
}

async fn run_interactive(engine: &Engine, session: Option<Uuid>) -> anyhow::Result<()> {
    let session_id = match session {
        Some(id) => {
            let view = engine.load_session(id).await?;
            println!(
                "=== Resumed session {id} ({} messages) ===",
                view.history.len()
            );
            id
        }
        None => {
            let started = engine.start_session().await?;
            println!("=== Session {} ===", started.session_id);
            println!("\n{}\n", started.message);
            started.session_id
        }
    };
    println!("Type 'exit', 'quit', or Ctrl+C to end the session.\n");

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if matches!(input, "exit" | "quit" | "q") {
            println!("\nSession {session_id} saved.");
            break;
        }

        if input.is_empty() {
            continue;
        }

        match engine.chat(Some(session_id), input).await {
            Ok(turn) => println!("\n{}\n", turn.reply),
            Err(e) => eprintln!("Error: {e}"),
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Start => {
            let engine = build_engine()?;
            let started = engine.start_session().await?;
            println!("Session: {}", started.session_id);
            println!("\n{}", started.message);
        }
        Commands::Chat { session, message } => {
            let engine = build_engine()?;
            if let Some(msg) = message {
                let turn = engine.chat(session, &msg).await?;
                println!("Session: {}", turn.session_id);
                println!("\n{}", turn.reply);
            } else {
                run_interactive(&engine, session).await?;
            }
        }
        Commands::Sessions => {
            let engine = build_engine()?;
            let listings = engine.list_sessions().await?;
            if listings.is_empty() {
                println!("No stored sessions.");
            }
            for listing in listings {
                println!(
                    "{}  {}  {} message(s)  {}{}",
                    listing.session_id,
                    listing.last_updated.format("%Y-%m-%d %H:%M:%S"),
                    listing.message_count,
                    listing.name.as_deref().unwrap_or("(no name)"),
                    if listing.has_summary { "  [summary]" } else { "" },
                );
            }
        }
        Commands::Load { session } => {
            let engine = build_engine()?;
            let view = engine.load_session(session).await?;
            println!(
                "Session {} (from {}): {} message(s), {} question(s) asked",
                view.session_id,
                if view.from_cache { "cache" } else { "store" },
                view.history.len(),
                view.questions_asked,
            );
        }
        Commands::History { session } => {
            let engine = build_engine()?;
            let view = engine.history(session).await?;
            for msg in &view.history {
                println!(
                    "[{}] {:?}: {}",
                    msg.timestamp.format("%H:%M:%S"),
                    msg.role,
                    msg.content
                );
            }
        }
        Commands::Summary { session } => {
            let engine = build_engine()?;
            let result = engine.generate_summary(session).await?;
            println!("{}", result.summary);
            println!("\nSaved as: {}", result.document_ref);
        }
        Commands::Restart { session } => {
            let engine = build_engine()?;
            let restarted = engine.restart_session(session).await?;
            println!("{}", restarted.message);
        }
        Commands::Delete { session } => {
            let engine = build_engine()?;
            engine.delete_session(session).await?;
            println!("Session {session} deleted.");
        }
        Commands::Stats => {
            let engine = build_engine()?;
            let stats = engine.stats().await?;
            println!("Active sessions:  {}", stats.active_sessions);
            println!("Stored sessions:  {}", stats.stored_sessions);
        }
        Commands::Init => {
            Config::create_config()?;
        }
        Commands::Version => {
            println!("triage {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
