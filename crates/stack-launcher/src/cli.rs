use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use stack_probe::{ProbeMode, ReadinessReport, StatusPolicy};

use crate::output::OutputFormat;
use crate::telemetry::LogFormat;

pub const EXIT_SUCCESS: u8 = 0;
/// Missing prerequisite tool or invalid configuration.
pub const EXIT_FAILURE: u8 = 1;
/// Degraded readiness under `--strict`, or issues found by `doctor`.
pub const EXIT_DEGRADED: u8 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "stack-launcher",
    version,
    about = "Launch the housing-price ML serving stack and verify it is reachable"
)]
pub struct Cli {
    /// Project root holding the compose file and data directories.
    #[arg(long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// Format of the final report on stdout.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Format of diagnostic logs on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Pull images, restart the stack and probe every service (default).
    Up {
        #[command(flatten)]
        probe: ProbeArgs,
        /// Probe immediately instead of waiting for services to warm up.
        #[arg(long)]
        no_wait: bool,
    },
    /// Probe the running stack without touching containers.
    Check {
        #[command(flatten)]
        probe: ProbeArgs,
    },
    /// Stop the stack.
    Down,
    /// Diagnose common problems and suggest fixes.
    Doctor {
        /// Start the stack and diagnose again when problems are found.
        #[arg(long)]
        fix: bool,
    },
    /// Print the resolved configuration as JSON.
    Config,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Up {
            probe: ProbeArgs::default(),
            no_wait: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Args)]
pub struct ProbeArgs {
    /// Probe all services at once instead of one after another.
    #[arg(long)]
    pub parallel: bool,
    /// Count only 2xx responses as healthy.
    #[arg(long)]
    pub require_success: bool,
    /// Exit with status 2 when any service is not responding.
    #[arg(long)]
    pub strict: bool,
}

impl ProbeArgs {
    pub fn mode(&self) -> ProbeMode {
        if self.parallel {
            ProbeMode::Concurrent
        } else {
            ProbeMode::Sequential
        }
    }

    pub fn policy(&self) -> StatusPolicy {
        if self.require_success {
            StatusPolicy::Success
        } else {
            StatusPolicy::AnyResponse
        }
    }
}

/// Readiness only affects the exit status under `--strict`.
pub fn readiness_exit_code(report: &ReadinessReport, strict: bool) -> u8 {
    if strict && !report.all_healthy() {
        EXIT_DEGRADED
    } else {
        EXIT_SUCCESS
    }
}
