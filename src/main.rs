use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mbootd::cli::Args;
use mbootd::daemon;

fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;

    // RUST_LOG wins over the verbosity flags when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.output.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    daemon::serve(&args.socket).context("daemon exited")?;
    Ok(())
}
