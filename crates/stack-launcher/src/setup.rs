use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::LaunchError;

/// Create each directory under `root`. Existing directories are left alone.
pub fn ensure_directories(root: &Path, dirs: &[String]) -> Result<Vec<PathBuf>, LaunchError> {
    dirs.iter()
        .map(|dir| {
            let path = root.join(dir);
            std::fs::create_dir_all(&path).map_err(|source| LaunchError::CreateDir {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), "directory ready");
            Ok(path)
        })
        .collect()
}
