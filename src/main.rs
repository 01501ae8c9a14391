use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use etf_tracker::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for etf_tracker::AppCommand {
    fn from(cmd: Commands) -> etf_tracker::AppCommand {
        match cmd {
            Commands::Run => etf_tracker::AppCommand::Run,
            Commands::Preview { message } => etf_tracker::AppCommand::Preview {
                show_message: message,
            },
            Commands::Check => etf_tracker::AppCommand::Check,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch prices, build the report and deliver it to Telegram
    Run,
    /// Fetch prices and print the report without delivering it
    Preview {
        /// Also print the Telegram message that would be sent
        #[arg(short, long)]
        message: bool,
    },
    /// Verify Telegram credentials and provider connectivity
    Check,
}

// A run is strictly sequential, so a single-threaded runtime is enough.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => etf_tracker::cli::setup::setup(),
        Some(cmd) => etf_tracker::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
