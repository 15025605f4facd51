use crate::board::{run_board, run_classify, run_close, run_periods};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tier_board::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "tier-board",
    about = "Classify sales representatives into achievement tiers and freeze closed periods",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Classify a CSV export offline, without a branch feed or snapshot log
    Classify(ClassifyArgs),
    /// Print a branch board, live or as frozen for a closed month
    Board(BoardArgs),
    /// Close a month for a branch, freezing the current feed rows
    Close(CloseArgs),
    /// List closed periods for a branch, newest first
    Periods(PeriodsArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct ClassifyArgs {
    /// CSV export with one row per representative
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Only print the comparison detail for this representative
    #[arg(long)]
    pub(crate) representative: Option<String>,
    /// Emit JSON instead of a text table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct BoardArgs {
    /// Branch key as configured in APP_BRANCHES
    #[arg(long)]
    pub(crate) branch: String,
    /// Serve the stored snapshot instead of the live feed
    #[arg(long)]
    pub(crate) frozen: bool,
    #[arg(long)]
    pub(crate) year: Option<i32>,
    #[arg(long)]
    pub(crate) month: Option<u32>,
    /// Emit JSON instead of a text table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct CloseArgs {
    #[arg(long)]
    pub(crate) branch: String,
    #[arg(long)]
    pub(crate) year: i32,
    #[arg(long)]
    pub(crate) month: u32,
}

#[derive(Args, Debug)]
pub(crate) struct PeriodsArgs {
    #[arg(long)]
    pub(crate) branch: String,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Classify(args) => run_classify(args),
        Command::Board(args) => run_board(args).await,
        Command::Close(args) => run_close(args).await,
        Command::Periods(args) => run_periods(args).await,
    }
}
