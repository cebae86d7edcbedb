use std::path::PathBuf;

use thiserror::Error;

use crate::cli::EXIT_FAILURE;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("{tool} is not installed or not in PATH")]
    PrerequisiteMissing { tool: String },
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl LaunchError {
    /// Process exit status for a run that stopped on this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            LaunchError::PrerequisiteMissing { .. }
            | LaunchError::CreateDir { .. }
            | LaunchError::Spawn { .. }
            | LaunchError::Output(_) => EXIT_FAILURE,
        }
    }
}
