use std::fs::OpenOptions;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use healthai_core::{Config, CredentialResolver, GroqClient, Orchestrator, PromptRequest, SecretStore, Session};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "healthai")]
#[command(about = "AI health advisor: meal plans, workouts, yoga routines and a wellness coach")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Model to use (defaults to the configured model)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the wellness coach a single question and print the answer
    Ask {
        /// Your question
        question: String,
    },
    /// List known models
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Ignoring unreadable config: {}", e);
        Config::new()
    });

    if let Err(e) = init_logging(&config) {
        eprintln!("Logging disabled: {}", e);
    }

    let orchestrator = build_orchestrator(&cli, &config);

    match cli.command {
        None => run_tui(orchestrator).await,
        Some(Commands::Ask { question }) => ask(&orchestrator, &question).await,
        Some(Commands::Models) => {
            for model in GroqClient::list_models() {
                let marker = if model == orchestrator.client().model() { " (current)" } else { "" };
                println!("  • {}{}", model, marker);
            }
            Ok(())
        }
    }
}

/// Log to a file in the config directory; the terminal belongs to the TUI.
fn init_logging(config: &Config) -> Result<()> {
    let dir = Config::config_dir()?;
    std::fs::create_dir_all(&dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("healthai.log"))?;

    let filter = EnvFilter::try_from_env("HEALTHAI_LOG")
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn build_orchestrator(cli: &Cli, config: &Config) -> Orchestrator {
    let timeout = cli
        .timeout
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.timeout());

    let client = GroqClient::new("")
        .with_base_url(cli.base_url.as_deref().unwrap_or(config.base_url()))
        .with_model(cli.model.as_deref().unwrap_or(config.model()))
        .with_timeout(timeout);

    info!(model = client.model(), base_url = client.base_url(), "starting");
    Orchestrator::new(CredentialResolver::new(SecretStore::load_default()), client)
}

async fn ask(orchestrator: &Orchestrator, question: &str) -> Result<()> {
    let mut session = Session::new();
    let reply = orchestrator
        .submit(&mut session, &PromptRequest::freeform(question))
        .await;

    if reply.is_error() {
        eprintln!("{}", reply.text());
        std::process::exit(1);
    }
    println!("{}", reply.text());
    Ok(())
}

async fn run_tui(orchestrator: Orchestrator) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut app = App::new(orchestrator);

    let result = event_loop(&mut terminal, &mut app).await;

    tui::restore()?;
    if let Some(in_flight) = app.in_flight.take() {
        warn!("exiting with a completion still in flight");
        in_flight.task.abort();
    }
    info!(turns = app.session.len(), "session ended");
    result
}

async fn event_loop(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = tui::EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}
