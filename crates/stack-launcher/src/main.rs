use std::io::Write;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use stack_launcher::cli::{
    Cli, Commands, EXIT_DEGRADED, EXIT_FAILURE, ProbeArgs, readiness_exit_code,
};
use stack_launcher::output::{present_report, write_json};
use stack_launcher::{
    Console, LaunchConfig, LaunchError, Launcher, OutputFormat, PathLocator, SystemRunner,
    suggested_fixes, telemetry,
};
use stack_probe::{HttpProbe, Prober, ReadinessReport, ServiceCheck};
use tracing::error;

type SystemLauncher = Launcher<PathLocator, SystemRunner, HttpProbe>;

#[derive(Serialize)]
struct ConfigView<'a> {
    #[serde(flatten)]
    config: &'a LaunchConfig,
    services: Vec<ServiceCheck>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init(cli.log_format);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "stack-launcher failed");
            eprintln!("❌ {e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = LaunchConfig::from_env(&cli.project_dir).validate()?;
    let format = cli.output;

    // With JSON output, progress lines move to stderr.
    let progress: Box<dyn Write> = match format {
        OutputFormat::Text => Box::new(std::io::stdout()),
        OutputFormat::Json => Box::new(std::io::stderr()),
    };
    let mut console = Console::new(progress);

    match cli.command.unwrap_or_default() {
        Commands::Up { probe, no_wait } => {
            let mut launcher = build(config, probe)?;
            if no_wait {
                launcher = launcher.without_warmup();
            }
            match launcher.up(&mut console).await {
                Ok(report) => finish(&launcher, &report, format, probe.strict, &mut console),
                Err(e @ LaunchError::PrerequisiteMissing { .. }) => {
                    Ok(ExitCode::from(e.exit_code()))
                }
                Err(e) => Err(e.into()),
            }
        }
        Commands::Check { probe } => {
            let launcher = build(config, probe)?;
            let report = launcher.check(&mut console).await?;
            finish(&launcher, &report, format, probe.strict, &mut console)
        }
        Commands::Down => {
            let launcher = build(config, ProbeArgs::default())?;
            match launcher.down(&mut console).await {
                Ok(()) => Ok(ExitCode::SUCCESS),
                Err(e @ LaunchError::PrerequisiteMissing { .. }) => {
                    Ok(ExitCode::from(e.exit_code()))
                }
                Err(e) => Err(e.into()),
            }
        }
        Commands::Doctor { fix } => {
            let launcher = build(config, ProbeArgs::default())?;
            let mut diagnosis = launcher.diagnose(&mut console).await?;
            if fix && !diagnosis.is_clean() {
                diagnosis = launcher.repair(&mut console).await?;
            }
            if format == OutputFormat::Json {
                write_json(std::io::stdout(), &diagnosis)?;
            } else if diagnosis.is_clean() {
                console.line("\n🎉 All checks passed! The stack looks healthy.")?;
            } else {
                console.line("\n🔧 Suggested fixes:")?;
                let file_flags = launcher.config().compose_flags();
                for line in suggested_fixes(&diagnosis.issues, &file_flags) {
                    console.line(&line)?;
                }
            }
            Ok(if diagnosis.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_DEGRADED)
            })
        }
        Commands::Config => {
            let view = ConfigView {
                services: config.services(),
                config: &config,
            };
            write_json(std::io::stdout(), &view)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build(config: LaunchConfig, probe: ProbeArgs) -> Result<SystemLauncher> {
    let prober = Prober::new(HttpProbe::new()?)
        .with_policy(probe.policy())
        .with_mode(probe.mode());
    Ok(Launcher::new(
        config,
        PathLocator::from_env(),
        SystemRunner,
        prober,
    ))
}

fn finish<W: Write>(
    launcher: &SystemLauncher,
    report: &ReadinessReport,
    format: OutputFormat,
    strict: bool,
    console: &mut Console<W>,
) -> Result<ExitCode> {
    present_report(console, std::io::stdout(), report, format, &launcher.logs_hint())?;
    Ok(ExitCode::from(readiness_exit_code(report, strict)))
}
