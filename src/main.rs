use std::fs::{self, OpenOptions};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use companion_chat::handler::{self, Dispatcher};
use companion_chat::{tui, ui, App, CompanionClient, Config};

#[derive(Parser)]
#[command(name = "companion-chat")]
#[command(about = "Chat with the Student Companion AI from the terminal")]
struct Cli {
    /// Backend base URL (overrides config and COMPANION_URL)
    #[arg(short, long)]
    url: Option<String>,
    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single message and print the reply
    Ask {
        /// Your message
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = Config::load()?.with_env_overrides().with_url_override(cli.url);

    init_logging(&config, cli.verbose)?;

    let client = CompanionClient::from_config(&config)?;
    if let Some((email, password)) = config.credentials() {
        client.login(email, password).await?;
    }

    match cli.command {
        Some(Commands::Ask { message }) => {
            let reply = handler::ask_once(&client, &message).await?;
            if reply.failed {
                eprintln!("{}", reply.text);
                return Ok(ExitCode::FAILURE);
            }
            println!("{}", reply.text);
            Ok(ExitCode::SUCCESS)
        }
        None => run_tui(client).await.map(|_| ExitCode::SUCCESS),
    }
}

/// The TUI owns stderr, so logs go to a file
fn init_logging(config: &Config, verbose: bool) -> Result<()> {
    let log_path = config.log_path()?;
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("companion_chat={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!(path = %log_path.display(), "logging initialized");
    Ok(())
}

async fn run_tui(client: CompanionClient) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = tui::EventHandler::new();
    let mut app = App::new(client.base_url());
    let dispatcher = Dispatcher::new(client, events.sender());

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event, &dispatcher),
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    tracing::info!(in_flight = app.in_flight(), "exiting");
    result
}
