use crate::commands::{run_import, run_score, ImportArgs, ScoreArgs};
use crate::demo::{run_demo, DemoArgs};
use crate::report::{run_report, ReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use wellbeing_monitor::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Wellbeing Monitor",
    about = "Score wellbeing surveys and report classroom, school and map risk statuses",
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
    /// Score a single answer set without storing it
    Score(ScoreArgs),
    /// Load roster and survey CSV exports, scoring every survey
    Import(ImportArgs),
    /// Print the map, school or classroom status from a database
    Report(ReportArgs),
    /// Generate a synthetic population and compare both rollup policies
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// SQLite database file; responses stay in memory when neither this nor
    /// APP_DATABASE_PATH is set
    #[arg(long)]
    pub(crate) database: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Import(args) => run_import(args),
        Command::Report(args) => run_report(args),
        Command::Demo(args) => run_demo(args),
    }
}
