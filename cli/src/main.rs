mod generalize;
mod io;
mod report;
mod source;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "seriesgen",
    about = "Downsample time series with Douglas-Peucker or Largest-Triangle-Three-Buckets"
)]
struct Cli {
    /// Log generalizer selection and per-series reduction to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generalize series and write them as JSON
    Generalize(generalize::Opts),
    /// Summarize series before and after generalization
    Report(report::Opts),
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match cli.command {
        Command::Generalize(opts) => generalize::generalize(&opts).await,
        Command::Report(opts) => report::report(&opts).await,
    }
}
