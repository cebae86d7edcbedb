pub mod cli;
pub mod compose;
pub mod config;
pub mod doctor;
pub mod error;
pub mod launch;
pub mod output;
pub mod prereq;
pub mod setup;
pub mod telemetry;

pub use compose::{CommandOutput, CommandRunner, Invocation, SystemRunner};
pub use config::LaunchConfig;
pub use doctor::{Diagnosis, Issue, suggested_fixes};
pub use error::LaunchError;
pub use launch::Launcher;
pub use output::{Console, OutputFormat};
pub use prereq::{PathLocator, REQUIRED_TOOLS, ToolLocator};
