use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use coinfolio::core::SortMode;
use coinfolio::core::config::AppConfig;
use coinfolio::core::log::init_logging;

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

impl From<Commands> for coinfolio::AppCommand {
    fn from(cmd: Commands) -> coinfolio::AppCommand {
        match cmd {
            Commands::Markets { search, sort } => coinfolio::AppCommand::Markets { search, sort },
            Commands::Portfolio { sort } => coinfolio::AppCommand::Portfolio { sort },
            Commands::Hold { coin_id, quantity } => {
                coinfolio::AppCommand::Hold { coin_id, quantity }
            }
            Commands::Detail { coin_id } => coinfolio::AppCommand::Detail { coin_id },
            Commands::Image { coin_id } => coinfolio::AppCommand::Image { coin_id },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display live prices and market statistics
    Markets {
        /// Filter by name, symbol or id
        #[arg(short, long)]
        search: Option<String>,
        /// rank, rank-desc, price, price-desc, holdings, holdings-desc
        #[arg(long, default_value_t = SortMode::default())]
        sort: SortMode,
    },
    /// Display held coins and total portfolio value
    Portfolio {
        /// rank, rank-desc, price, price-desc, holdings, holdings-desc
        #[arg(long, default_value_t = SortMode::default())]
        sort: SortMode,
    },
    /// Set the held quantity of a coin; zero removes it
    Hold {
        coin_id: String,
        #[arg(allow_negative_numbers = true)]
        quantity: f64,
    },
    /// Display descriptive details for a coin
    Detail { coin_id: String },
    /// Fetch a coin's image into the local cache
    Image { coin_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(cli.config_path.as_deref()),
        Some(cmd) => coinfolio::run_command(cmd.into(), cli.config_path.as_deref()).await,
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

fn setup(config_path: Option<&str>) -> Result<()> {
    match config_path {
        Some(path) => coinfolio::cli::setup::setup_at_path(path),
        None => coinfolio::cli::setup::setup_at_path(AppConfig::default_config_path()?),
    }
}
