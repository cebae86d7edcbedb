use std::io::Write;

use stack_probe::{HealthCheck, Prober, ReadinessReport};
use tracing::info;

use crate::compose::{COMPOSE_PROGRAM, CommandOutput, CommandRunner, Compose};
use crate::config::LaunchConfig;
use crate::error::LaunchError;
use crate::output::Console;
use crate::prereq::{REQUIRED_TOOLS, ToolLocator};
use crate::setup::ensure_directories;

/// The linear launch procedure: check tools, create directories, pull,
/// restart the stack, wait, probe.
///
/// Every collaborator sits behind a trait so the whole sequence can run
/// against fakes.
pub struct Launcher<L, R, C> {
    pub(crate) config: LaunchConfig,
    pub(crate) locator: L,
    pub(crate) runner: R,
    pub(crate) prober: Prober<C>,
    pub(crate) warmup: bool,
}

impl<L, R, C> Launcher<L, R, C>
where
    L: ToolLocator,
    R: CommandRunner,
    C: HealthCheck,
{
    pub fn new(config: LaunchConfig, locator: L, runner: R, prober: Prober<C>) -> Self {
        Self {
            config,
            locator,
            runner,
            prober,
            warmup: true,
        }
    }

    /// Skip the fixed delay between `up` and the first probe.
    pub fn without_warmup(mut self) -> Self {
        self.warmup = false;
        self
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub(crate) fn compose(&self) -> Compose<'_, R> {
        Compose::new(
            &self.runner,
            self.config.compose_paths(),
            self.config.project_dir.clone(),
            self.config.compose_env(),
        )
    }

    pub fn logs_hint(&self) -> String {
        format!("{COMPOSE_PROGRAM} {} logs", self.config.compose_flags())
    }

    /// Fail fast, before any side effect, if a required tool is missing.
    pub fn require_tools<W: Write>(&self, console: &mut Console<W>) -> Result<(), LaunchError> {
        for tool in REQUIRED_TOOLS {
            match self.locator.locate(tool) {
                Some(path) => {
                    info!(tool, path = %path.display(), "found prerequisite");
                    console.ok(&format!("{tool} is available"))?;
                }
                None => {
                    let err = LaunchError::PrerequisiteMissing {
                        tool: tool.to_string(),
                    };
                    console.fail(&err.to_string())?;
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    pub async fn up<W: Write>(
        &self,
        console: &mut Console<W>,
    ) -> Result<ReadinessReport, LaunchError> {
        self.require_tools(console)?;

        console.step("Creating project directories...")?;
        let created = ensure_directories(&self.config.project_dir, &self.config.directories)?;
        for path in &created {
            console.line(&format!("   📁 {}", path.display()))?;
        }

        let compose = self.compose();
        console.step(&format!(
            "Pulling images (DOCKER_USERNAME={}, TAG={})...",
            self.config.docker_username, self.config.tag
        ))?;
        report_command(console, "pull images", &compose.pull().await?)?;

        console.step("Stopping any running containers...")?;
        report_command(console, "stop containers", &compose.down().await?)?;

        console.step("Starting services...")?;
        report_command(console, "start services", &compose.up_detached().await?)?;

        if self.warmup && !self.config.warmup.is_zero() {
            console.line(&format!(
                "⏳ Waiting {}s for services to start...",
                self.config.warmup.as_secs()
            ))?;
            tokio::time::sleep(self.config.warmup).await;
        }

        self.check(console).await
    }

    /// Probe the stack once, without touching containers.
    pub async fn check<W: Write>(
        &self,
        console: &mut Console<W>,
    ) -> Result<ReadinessReport, LaunchError> {
        console.line("🔍 Checking service health...")?;
        let report = self.prober.run(&self.config.services()).await;
        info!(
            healthy = report.healthy_count(),
            total = report.checks().len(),
            "readiness check finished"
        );
        Ok(report)
    }

    pub async fn down<W: Write>(&self, console: &mut Console<W>) -> Result<(), LaunchError> {
        self.require_tools(console)?;
        console.step("Stopping services...")?;
        let output = self.compose().down().await?;
        report_command(console, "stop services", &output)?;
        Ok(())
    }
}

/// Compose failures are reported and the run continues.
fn report_command<W: Write>(
    console: &mut Console<W>,
    what: &str,
    output: &CommandOutput,
) -> std::io::Result<()> {
    if output.success {
        return Ok(());
    }
    let stderr = output.stderr.trim();
    if stderr.is_empty() {
        console.warn(&format!("Failed to {what}"))
    } else {
        console.warn(&format!("Failed to {what}: {stderr}"))
    }
}
