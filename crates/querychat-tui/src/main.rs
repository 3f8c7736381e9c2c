use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use querychat_core::{Config, QueryBackend, QueryClient, TranscriptController};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "querychat")]
#[command(about = "Terminal chat client for a JSON query endpoint", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Query endpoint URL (overrides config and QUERYCHAT_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Value for the X-API-Key header (overrides config and QUERYCHAT_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Where to write logs
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat window (default)
    Chat,
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config.clone() {
        Some(path) => Some(path),
        None => Config::get_config_path().ok(),
    };

    let log_path = match (&cli.log_file, &config_path) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(config)) => config.parent().map(|dir| dir.join("querychat.log")),
        (None, None) => None,
    };
    if let Some(path) = &log_path {
        init_logging(path)?;
    }

    let mut config = match &config_path {
        Some(path) => Config::load_from(path).unwrap_or_else(|e| {
            warn!(error = %e, path = %path.display(), "ignoring unreadable config");
            Config::new()
        }),
        None => Config::new(),
    };
    config.apply_env();
    config.apply_overrides(cli.endpoint.clone(), cli.api_key.clone());

    let endpoint = config.endpoint().to_string();
    let client = QueryClient::new(&endpoint).with_api_key(config.api_key.clone());
    let backend: Arc<dyn QueryBackend> = Arc::new(client);
    info!(%endpoint, "starting");

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let mut app = App::new(backend, &endpoint, config, config_path);
            run_chat(&mut app).await
        }
        Commands::Ask { question } => ask(backend, &question).await,
    }
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("could not open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("querychat_core=info,querychat=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run_chat(app: &mut App) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = loop {
        if let Err(e) = terminal.draw(|frame| ui::render(app, frame)) {
            break Err(e.into());
        }

        match events.next().await {
            Some(event) => {
                if let Err(e) = handler::handle_event(app, event) {
                    break Err(e);
                }
            }
            None => break Ok(()),
        }

        if app.should_quit {
            break Ok(());
        }
    };

    tui::restore()?;
    result
}

async fn ask(backend: Arc<dyn QueryBackend>, question: &str) -> Result<()> {
    let mut controller = TranscriptController::new(backend);
    if controller.submit(question).is_none() {
        bail!("question is empty");
    }

    controller.settle().await;

    if let Some(reply) = controller.transcript().last() {
        println!("{}", reply.text);
    }
    Ok(())
}
