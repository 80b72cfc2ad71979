use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use self::{compare::CompareArg, rank::RankArg};

mod compare;
mod rank;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Log debug events (overridden by `RUST_LOG`)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Rank genes by the survival difference of their expression cohorts
    Rank(#[clap(flatten)] RankArg),
    /// Log-rank test of two patient groups defined by a column
    Compare(#[clap(flatten)] CompareArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    init_tracing(args.verbose);
    match args.mode {
        Mode::Rank(arg) => rank::run(&arg)?,
        Mode::Compare(arg) => compare::run(&arg)?,
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,kmrank=debug"
    } else {
        "warn,kmrank=info"
    };
    // the prefix also matches the kmrank_analysis and kmrank_stats targets
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
