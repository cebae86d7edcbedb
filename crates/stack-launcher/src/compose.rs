use std::path::PathBuf;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::LaunchError;

pub const COMPOSE_PROGRAM: &str = "docker-compose";
pub const DOCKER_PROGRAM: &str = "docker";

/// Captured result of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// One external command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs external commands. Failing to spawn is an error; a non-zero exit is not.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        invocation: &Invocation,
    ) -> impl std::future::Future<Output = Result<CommandOutput, LaunchError>> + Send;
}

/// [`CommandRunner`] backed by real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, LaunchError> {
        debug!(command = %invocation.display(), "running command");
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .current_dir(&invocation.cwd)
            .output()
            .await
            .map_err(|source| LaunchError::Spawn {
                command: invocation.display(),
                source,
            })?;
        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// `docker-compose -f <file>... ...` against the configured compose files.
#[derive(Debug)]
pub struct Compose<'a, R> {
    runner: &'a R,
    files: Vec<PathBuf>,
    cwd: PathBuf,
    env: Vec<(String, String)>,
}

impl<'a, R: CommandRunner> Compose<'a, R> {
    pub fn new(
        runner: &'a R,
        files: Vec<PathBuf>,
        cwd: impl Into<PathBuf>,
        env: Vec<(String, String)>,
    ) -> Self {
        Self {
            runner,
            files,
            cwd: cwd.into(),
            env,
        }
    }

    pub async fn pull(&self) -> Result<CommandOutput, LaunchError> {
        self.compose(&["pull"]).await
    }

    pub async fn down(&self) -> Result<CommandOutput, LaunchError> {
        self.compose(&["down"]).await
    }

    pub async fn up_detached(&self) -> Result<CommandOutput, LaunchError> {
        self.compose(&["up", "-d"]).await
    }

    /// Validate the compose file without printing it.
    pub async fn config_check(&self) -> Result<CommandOutput, LaunchError> {
        self.compose(&["config", "-q"]).await
    }

    /// Names of declared services, and of those currently running.
    pub async fn service_states(&self) -> Result<Option<ServiceStates>, LaunchError> {
        let all = self.compose(&["ps", "--services"]).await?;
        let running = self
            .compose(&["ps", "--services", "--filter", "status=running"])
            .await?;
        if !all.success || !running.success {
            return Ok(None);
        }
        Ok(Some(ServiceStates {
            declared: lines(&all.stdout),
            running: lines(&running.stdout),
        }))
    }

    /// Run a docker (not compose) subcommand in the same directory.
    pub async fn docker(&self, args: &[&str]) -> Result<CommandOutput, LaunchError> {
        let invocation = Invocation {
            program: DOCKER_PROGRAM.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: Vec::new(),
            cwd: self.cwd.clone(),
        };
        self.runner.run(&invocation).await
    }

    async fn compose(&self, args: &[&str]) -> Result<CommandOutput, LaunchError> {
        let mut full: Vec<String> = self
            .files
            .iter()
            .flat_map(|file| ["-f".to_string(), file.display().to_string()])
            .collect();
        full.extend(args.iter().map(|a| a.to_string()));
        let invocation = Invocation {
            program: COMPOSE_PROGRAM.to_string(),
            args: full,
            env: self.env.clone(),
            cwd: self.cwd.clone(),
        };
        let output = self.runner.run(&invocation).await?;
        if output.success {
            info!(command = %invocation.display(), "command succeeded");
        } else {
            warn!(
                command = %invocation.display(),
                code = ?output.code,
                stderr = %output.stderr.trim(),
                "command failed"
            );
        }
        Ok(output)
    }
}

/// Declared vs running compose services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStates {
    pub declared: Vec<String>,
    pub running: Vec<String>,
}

impl ServiceStates {
    pub fn stopped(&self) -> Vec<&str> {
        self.declared
            .iter()
            .filter(|s| !self.running.contains(s))
            .map(String::as_str)
            .collect()
    }
}

fn lines(s: &str) -> Vec<String> {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
