use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod sink;
mod watch;

#[derive(Parser)]
#[command(name = "automute-cli", version, about = "Automute CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mute window management
    Window {
        #[command(subcommand)]
        action: commands::window::WindowAction,
    },
    /// Print the current mute decision and window status as JSON
    Status(commands::status::StatusArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Run the mute scheduler in the foreground
    Run,
}

fn init_tracing() {
    let configured = automute_core::Config::load_or_default().log.filter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured));
    // stdout carries JSON output; logs go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Window { action } => commands::window::run(action),
        Commands::Status(args) => commands::status::run(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Run => commands::run::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
