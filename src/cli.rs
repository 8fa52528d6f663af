//! Command-line interface definitions
//!
//! Arguments are grouped by the component that consumes them: the listener
//! setup and the logging layer.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Privileged helper daemon for multi-boot device management
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Listener configuration
    #[command(flatten)]
    pub socket: SocketConfig,

    /// Output and logging configuration
    #[command(flatten)]
    pub output: OutputConfig,
}

/// Unix socket listener configuration
///
/// Used by: `daemon::serve()`
#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Listener Options")]
pub struct SocketConfig {
    /// Path of the Unix socket to listen on
    #[arg(long, default_value = "/run/mbootd.sock")]
    pub socket_path: PathBuf,

    /// Remove a stale socket file left by a previous instance
    #[arg(long)]
    pub replace: bool,
}

/// Output and logging configuration
///
/// Used by: `main()`
#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Output Options")]
pub struct OutputConfig {
    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except errors)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Validate the combination of arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if conflicting options were given or the socket path
    /// is unusable.
    pub fn validate(&self) -> Result<()> {
        if self.output.quiet && self.output.verbose > 0 {
            anyhow::bail!("Cannot use both --quiet and --verbose options");
        }

        if self.socket.socket_path.as_os_str().is_empty() {
            anyhow::bail!("Socket path must not be empty");
        }

        Ok(())
    }
}

impl OutputConfig {
    /// Log filter directive implied by the verbosity flags.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
