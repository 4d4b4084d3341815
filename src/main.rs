use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod action;
mod config;
mod control;
mod daemon;
mod registry;

use config::Config;
use registry::Registry;

#[derive(Parser)]
#[command(name = "nodoze")]
#[command(author, version, about = "Keep the host awake by simulating trivial input", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon main loop (blocks until interrupted)
    Daemon,

    /// Ask the running daemon to begin nudging
    Start,

    /// Ask the running daemon to stop nudging
    Stop,

    /// Flip between active and inactive
    Toggle,

    /// Exit 0 if the daemon is active, 1 otherwise (prints nothing)
    Query,

    /// Print whether the daemon is active
    Status,

    /// Print registry paths and daemon parameters
    Diagnostic,

    /// Print version metadata
    Version,
}

fn init_logging(verbose: bool, level: &str) {
    let filter = if verbose {
        EnvFilter::new("nodoze=debug")
    } else {
        EnvFilter::new(format!("nodoze={}", level))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    init_logging(cli.verbose, &config.logging.level);

    let registry = Registry::new(config.pid_path(), config.active_path());

    match cli.command {
        Commands::Daemon => {
            info!("Starting nodoze daemon...");
            daemon::run(&config).await?;
        }

        Commands::Start => control::start(&registry),

        Commands::Stop => control::stop(&registry),

        Commands::Toggle => control::toggle(&registry),

        Commands::Query => {
            std::process::exit(if control::query(&registry) { 0 } else { 1 });
        }

        Commands::Status => control::status(&registry),

        Commands::Diagnostic => control::diagnostic(&config, &registry),

        Commands::Version => {
            println!("nodoze {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
