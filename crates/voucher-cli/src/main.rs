//! CLI application for turning receipt scans into cash vouchers.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, process, words};

/// Receipt OCR - read payment receipts into cash vouchers
#[derive(Parser)]
#[command(name = "voucher")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a single document
    Process(process::ProcessArgs),

    /// Process multiple documents
    Batch(batch::BatchArgs),

    /// Print an amount in words
    Words(words::WordsArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Provider credentials may live in a local .env file
    dotenvy::dotenv().ok();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Process(args) => process::run(args, cli.config.as_deref()).await,
        Commands::Batch(args) => batch::run(args, cli.config.as_deref()).await,
        Commands::Words(args) => words::run(args).await,
        Commands::Config(args) => config::run(args, cli.config.as_deref()).await,
    }
}
