//! Stack diagnostics: daemon, compose file, containers, ports, HTTP health.
//!
//! Nothing here aborts on failure. Every problem becomes an [`Issue`] and
//! the caller decides what to print and how to exit.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use stack_probe::{HealthCheck, ReadinessReport, port_open};
use tracing::{info, warn};

use crate::compose::{COMPOSE_PROGRAM, CommandRunner, DOCKER_PROGRAM};
use crate::error::LaunchError;
use crate::launch::Launcher;
use crate::output::Console;
use crate::prereq::ToolLocator;

const PORT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Issue {
    DockerUnavailable,
    ComposeUnavailable,
    ComposeFileMissing,
    ComposeFileInvalid,
    ContainerStatusUnknown,
    ContainersStopped { services: Vec<String> },
    PortClosed { service: String, port: u16 },
    Unhealthy { service: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnosis {
    pub issues: Vec<Issue>,
    pub report: ReadinessReport,
}

impl Diagnosis {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

impl<L, R, C> Launcher<L, R, C>
where
    L: ToolLocator,
    R: CommandRunner,
    C: HealthCheck,
{
    pub async fn diagnose<W: Write>(
        &self,
        console: &mut Console<W>,
    ) -> Result<Diagnosis, LaunchError> {
        let mut issues = Vec::new();
        let compose = self.compose();

        console.line("🔍 Running diagnostics...")?;
        let docker_ok = match self.locator.locate(DOCKER_PROGRAM) {
            Some(_) => matches!(compose.docker(&["info"]).await, Ok(out) if out.success),
            None => false,
        };
        if docker_ok {
            console.ok("Docker is running")?;
        } else {
            console.fail("Docker is not installed or not running")?;
            issues.push(Issue::DockerUnavailable);
        }

        let missing: Vec<PathBuf> = self
            .config
            .compose_paths()
            .into_iter()
            .filter(|path| !path.is_file())
            .collect();
        if self.locator.locate(COMPOSE_PROGRAM).is_none() {
            console.fail("docker-compose is not installed or not in PATH")?;
            issues.push(Issue::ComposeUnavailable);
        } else if !missing.is_empty() {
            for path in &missing {
                console.fail(&format!("{} not found", path.display()))?;
            }
            issues.push(Issue::ComposeFileMissing);
        } else {
            match compose.config_check().await {
                Ok(out) if out.success => console.ok("Compose file is valid")?,
                Ok(out) => {
                    console.fail(&format!("Compose file error: {}", out.stderr.trim()))?;
                    issues.push(Issue::ComposeFileInvalid);
                }
                Err(e) => {
                    console.fail(&e.to_string())?;
                    issues.push(Issue::ComposeUnavailable);
                }
            }
        }

        console.line("\n📦 Container status:")?;
        match compose.service_states().await {
            Ok(Some(states)) if !states.declared.is_empty() => {
                for name in &states.running {
                    console.ok(&format!("{name}: running"))?;
                }
                let stopped = states.stopped();
                for name in &stopped {
                    console.fail(&format!("{name}: not running"))?;
                }
                if !stopped.is_empty() {
                    issues.push(Issue::ContainersStopped {
                        services: stopped.into_iter().map(str::to_string).collect(),
                    });
                }
            }
            Ok(_) => {
                console.fail("Could not get container status")?;
                issues.push(Issue::ContainerStatusUnknown);
            }
            Err(e) => {
                warn!(error = %e, "container status unavailable");
                console.fail("Could not get container status")?;
                issues.push(Issue::ContainerStatusUnknown);
            }
        }

        let services = self.config.services();

        console.line("\n🔌 Port reachability:")?;
        for service in &services {
            let Some((host, port)) = service.socket_target() else {
                continue;
            };
            if port_open(&host, port, PORT_TIMEOUT).await {
                console.ok(&format!(
                    "{}: port {port} is accepting connections",
                    service.name()
                ))?;
            } else {
                console.fail(&format!("{}: port {port} is not accessible", service.name()))?;
                issues.push(Issue::PortClosed {
                    service: service.name().to_string(),
                    port,
                });
            }
        }

        console.line("\n🏥 Service health:")?;
        let report = self.prober.run(&services).await;
        for check in report.checks() {
            let name = check.service.name();
            match (check.outcome.is_healthy(), check.outcome.elapsed()) {
                (true, Some(elapsed)) => console.ok(&format!(
                    "{name}: healthy (response: {:.2}s)",
                    elapsed.as_secs_f64()
                ))?,
                _ => {
                    console.fail(&format!("{name}: unhealthy"))?;
                    issues.push(Issue::Unhealthy {
                        service: name.to_string(),
                    });
                }
            }
        }

        info!(issues = issues.len(), "diagnostics finished");
        Ok(Diagnosis { issues, report })
    }

    /// Bring the stack up, wait, and diagnose again.
    pub async fn repair<W: Write>(
        &self,
        console: &mut Console<W>,
    ) -> Result<Diagnosis, LaunchError> {
        console.line("\n🔧 Attempting quick fixes...")?;
        let output = self.compose().up_detached().await?;
        if output.success {
            console.ok("Services started")?;
        } else {
            console.fail(&format!(
                "Failed to start services: {}",
                output.stderr.trim()
            ))?;
        }
        if self.warmup && !self.config.warmup.is_zero() {
            console.line("⏳ Waiting for services to be ready...")?;
            tokio::time::sleep(self.config.warmup).await;
        }
        console.line("\n🔍 Running diagnostics again...")?;
        self.diagnose(console).await
    }
}

/// Human suggestions for the issue classes present, in a fixed order.
/// `file_flags` is the `-f <file>` part of a compose command line.
pub fn suggested_fixes(issues: &[Issue], file_flags: &str) -> Vec<String> {
    let has = |pred: fn(&Issue) -> bool| issues.iter().any(pred);
    let compose = format!("{COMPOSE_PROGRAM} {file_flags}");
    let mut fixes = Vec::new();

    if has(|i| matches!(i, Issue::DockerUnavailable)) {
        fixes.push("🔧 Start Docker Desktop or the Docker daemon".to_string());
        fixes.push("   Windows/macOS: start the Docker Desktop application".to_string());
        fixes.push("   Linux: sudo systemctl start docker".to_string());
    }
    if has(|i| matches!(i, Issue::ComposeUnavailable)) {
        fixes.push("🔧 Install Docker Compose and make sure docker-compose is on PATH".to_string());
    }
    if has(|i| matches!(i, Issue::ComposeFileMissing)) {
        fixes.push("🔧 Run from the project root, or point COMPOSE_FILE at it".to_string());
    }
    if has(|i| matches!(i, Issue::ComposeFileInvalid)) {
        fixes.push(format!("🔧 Inspect the compose file: {compose} config"));
    }
    if has(|i| matches!(i, Issue::ContainerStatusUnknown | Issue::ContainersStopped { .. })) {
        fixes.push("🔧 Start the services:".to_string());
        fixes.push(format!("   {compose} up -d"));
    }
    if has(|i| matches!(i, Issue::PortClosed { .. })) {
        fixes.push("🔧 Stop conflicting services or change the published ports".to_string());
    }
    if has(|i| matches!(i, Issue::Unhealthy { .. })) {
        fixes.push("🔧 Wait a few minutes for services to start".to_string());
        fixes.push(format!("🔧 Check logs: {compose} logs"));
        fixes.push(format!("🔧 Restart services: {compose} restart"));
    }
    fixes
}
