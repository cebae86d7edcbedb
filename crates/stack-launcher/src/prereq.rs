use std::ffi::OsString;
use std::path::PathBuf;

use tracing::debug;

/// Executables that must be on `PATH` before anything else happens.
pub const REQUIRED_TOOLS: [&str; 2] = ["docker", "docker-compose"];

/// Finds executables by name.
pub trait ToolLocator: Send + Sync {
    fn locate(&self, tool: &str) -> Option<PathBuf>;
}

/// [`ToolLocator`] that searches a `PATH`-style list of directories with
/// `which`. On Windows each `PATHEXT` extension is tried as well.
#[derive(Debug, Clone, Default)]
pub struct PathLocator {
    path: Option<OsString>,
    cwd: PathBuf,
}

impl PathLocator {
    /// Search the process `PATH`.
    pub fn from_env() -> Self {
        Self {
            path: std::env::var_os("PATH"),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Search exactly the given directories.
    pub fn with_dirs(dirs: &[PathBuf]) -> Self {
        Self {
            path: std::env::join_paths(dirs).ok(),
            cwd: PathBuf::from("."),
        }
    }
}

impl ToolLocator for PathLocator {
    fn locate(&self, tool: &str) -> Option<PathBuf> {
        let path = self.path.as_ref()?;
        match which::which_in(tool, Some(path), &self.cwd) {
            Ok(found) => Some(found),
            Err(e) => {
                debug!(tool, error = %e, "tool not found");
                None
            }
        }
    }
}
