use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Serialize, Serializer};
use stack_probe::{ServiceCheck, stack_services};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_DOCKER_USERNAME: &str = "mlopsuser";
pub const DEFAULT_TAG: &str = "latest";
pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";
pub const DEFAULT_WARMUP_SECS: u64 = 30;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// Directories the stack bind-mounts, relative to the project root.
pub const PROJECT_DIRECTORIES: [&str; 4] = ["models", "data", "housinglogs", "mlruns"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DOCKER_USERNAME must not be empty")]
    EmptyUsername,
    #[error("TAG {0:?} is not a valid image tag")]
    InvalidTag(String),
    #[error("probe timeout must be greater than zero")]
    ZeroProbeTimeout,
}

/// Launcher settings, resolved once at startup and passed by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchConfig {
    /// Account the compose file pulls the API image from.
    pub docker_username: String,
    pub tag: String,
    /// Compose files in merge order; each becomes one `-f` argument.
    pub compose_files: Vec<PathBuf>,
    pub project_dir: PathBuf,
    pub directories: Vec<String>,
    #[serde(rename = "warmup_secs", serialize_with = "as_secs")]
    pub warmup: Duration,
    #[serde(rename = "probe_timeout_secs", serialize_with = "as_secs")]
    pub probe_timeout: Duration,
}

fn as_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

impl LaunchConfig {
    /// Defaults for everything, rooted at `project_dir`.
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            docker_username: DEFAULT_DOCKER_USERNAME.to_string(),
            tag: DEFAULT_TAG.to_string(),
            compose_files: vec![PathBuf::from(DEFAULT_COMPOSE_FILE)],
            project_dir: project_dir.into(),
            directories: PROJECT_DIRECTORIES.iter().map(|d| d.to_string()).collect(),
            warmup: Duration::from_secs(DEFAULT_WARMUP_SECS),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
        }
    }

    /// Read `DOCKER_USERNAME`, `TAG`, `COMPOSE_FILE`, `STACK_WARMUP_SECS` and
    /// `STACK_PROBE_TIMEOUT_SECS`, falling back to defaults. Empty values
    /// count as unset. `COMPOSE_FILE` is a list separated like `PATH`.
    pub fn from_env(project_dir: impl Into<PathBuf>) -> Self {
        let defaults = Self::new(project_dir);
        Self {
            docker_username: env_string("DOCKER_USERNAME")
                .unwrap_or(defaults.docker_username),
            tag: env_string("TAG").unwrap_or(defaults.tag),
            compose_files: env_string("COMPOSE_FILE")
                .map(|v| split_file_list(&v))
                .filter(|files| !files.is_empty())
                .unwrap_or(defaults.compose_files),
            warmup: env_secs("STACK_WARMUP_SECS", DEFAULT_WARMUP_SECS),
            probe_timeout: env_secs("STACK_PROBE_TIMEOUT_SECS", DEFAULT_PROBE_TIMEOUT_SECS),
            ..defaults
        }
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.docker_username.trim().is_empty() {
            return Err(ConfigError::EmptyUsername);
        }
        let tag_ok = !self.tag.is_empty()
            && !self
                .tag
                .chars()
                .any(|c| c.is_whitespace() || c == '/' || c == ':');
        if !tag_ok {
            return Err(ConfigError::InvalidTag(self.tag));
        }
        if self.probe_timeout.is_zero() {
            return Err(ConfigError::ZeroProbeTimeout);
        }
        Ok(self)
    }

    /// Compose file paths, resolved against the project directory when relative.
    pub fn compose_paths(&self) -> Vec<PathBuf> {
        self.compose_files
            .iter()
            .map(|file| resolve(&self.project_dir, file))
            .collect()
    }

    /// `-f <file>` for each configured file, as a user would type it.
    pub fn compose_flags(&self) -> String {
        self.compose_files
            .iter()
            .map(|file| format!("-f {}", file.display()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Environment exported to every compose invocation.
    pub fn compose_env(&self) -> Vec<(String, String)> {
        vec![
            ("DOCKER_USERNAME".to_string(), self.docker_username.clone()),
            ("TAG".to_string(), self.tag.clone()),
        ]
    }

    pub fn services(&self) -> Vec<ServiceCheck> {
        stack_services(self.probe_timeout)
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn split_file_list(value: &str) -> Vec<PathBuf> {
    std::env::split_paths(value)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

fn env_string(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => {
            debug!(key, value = %v, "using value from env");
            Some(v)
        }
        _ => None,
    }
}

fn env_secs(key: &str, default: u64) -> Duration {
    let secs = match std::env::var(key) {
        Ok(s) => match s.trim().parse::<u64>() {
            Ok(n) => {
                debug!(key, secs = n, "using value from env");
                n
            }
            Err(e) => {
                warn!(key, value = %s, error = %e, "invalid value, using default {default}");
                default
            }
        },
        Err(_) => default,
    };
    Duration::from_secs(secs)
}
