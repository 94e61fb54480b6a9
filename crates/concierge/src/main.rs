//! Concierge - travel planning from the terminal

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{auth_command, chat_command, init_command, setup_command, status_command};

/// Concierge - plan and book trips by chatting
#[derive(Parser)]
#[command(name = "concierge")]
#[command(about = "◆ A travel concierge for your terminal")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config and data directory
    Init,
    /// Chat with the travel concierge
    Chat {
        /// Send one message and print the answer
        #[arg(short, long)]
        message: Option<String>,
        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Authorize Google Calendar access
    Auth,
    /// Show configuration and credential status
    Status,
    /// Interactive setup wizard
    Setup,
}

fn init_tracing(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // chat keeps the terminal for the transcript unless asked otherwise
    match &cli.command {
        Commands::Chat { verbose: true, .. } => init_tracing("debug"),
        Commands::Chat { .. } => init_tracing("warn"),
        _ => init_tracing("info"),
    }

    let result = match cli.command {
        Commands::Init => init_command().await,
        Commands::Chat { message, .. } => chat_command(message).await,
        Commands::Auth => auth_command().await,
        Commands::Status => status_command().await,
        Commands::Setup => setup_command().await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}
