//! Tests for the launch procedure and diagnostics, with every external
//! collaborator (PATH lookup, child processes, HTTP) replaced by a fake.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use stack_launcher::cli::{EXIT_DEGRADED, EXIT_FAILURE, EXIT_SUCCESS, readiness_exit_code};
use stack_launcher::output::present_report;
use stack_launcher::{
    CommandOutput, CommandRunner, Console, Invocation, Issue, LaunchConfig, LaunchError, Launcher,
    OutputFormat, ToolLocator,
};
use stack_probe::{HealthCheck, ProbeError, ProbeResponse, Prober, ReadinessReport, ServiceCheck};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct FakeLocator {
    missing: Vec<&'static str>,
}

impl FakeLocator {
    fn all_present() -> Self {
        Self { missing: vec![] }
    }

    fn without(tool: &'static str) -> Self {
        Self {
            missing: vec![tool],
        }
    }
}

impl ToolLocator for FakeLocator {
    fn locate(&self, tool: &str) -> Option<PathBuf> {
        if self.missing.contains(&tool) {
            None
        } else {
            Some(PathBuf::from("/usr/bin").join(tool))
        }
    }
}

/// Records every invocation; subcommands listed in `failing` exit non-zero.
#[derive(Default)]
struct RecordingRunner {
    calls: Mutex<Vec<Invocation>>,
    failing: Vec<&'static str>,
    running: Vec<&'static str>,
}

impl RecordingRunner {
    fn failing(subcommand: &'static str) -> Self {
        Self {
            failing: vec![subcommand],
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Compose subcommands issued, without the `-f <file>` prefix.
    fn compose_subcommands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == "docker-compose")
            .map(|c| {
                let mut rest = c.args.as_slice();
                while rest.first().is_some_and(|a| a == "-f") {
                    rest = &rest[2..];
                }
                rest.join(" ")
            })
            .collect()
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, LaunchError> {
        self.calls.lock().unwrap().push(invocation.clone());
        let sub = invocation
            .args
            .iter()
            .find(|a| !a.starts_with('-') && !a.ends_with(".yml"))
            .cloned()
            .unwrap_or_default();
        if self.failing.contains(&sub.as_str()) {
            return Ok(CommandOutput {
                success: false,
                code: Some(1),
                stdout: String::new(),
                stderr: format!("{sub} exploded\n"),
            });
        }
        let stdout = if sub == "ps" {
            if invocation.args.iter().any(|a| a == "--filter") {
                self.running.join("\n")
            } else {
                "api\nprometheus\ngrafana\nmlflow\n".to_string()
            }
        } else {
            String::new()
        };
        Ok(CommandOutput {
            success: true,
            code: Some(0),
            stdout,
            stderr: String::new(),
        })
    }
}

/// Counts probes; services named in `down` fail to connect.
struct FakeProbe {
    calls: AtomicUsize,
    down: Vec<&'static str>,
}

impl FakeProbe {
    fn healthy() -> Self {
        Self::with_down(vec![])
    }

    fn with_down(down: Vec<&'static str>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            down,
        }
    }
}

impl HealthCheck for &FakeProbe {
    async fn probe(&self, service: &ServiceCheck) -> Result<ProbeResponse, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.contains(&service.name()) {
            Err(ProbeError::Timeout(service.timeout()))
        } else {
            Ok(ProbeResponse {
                status: 200,
                elapsed: Duration::from_millis(2),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config(root: &Path) -> LaunchConfig {
    let mut config = LaunchConfig::new(root);
    config.warmup = Duration::ZERO;
    config.probe_timeout = Duration::from_millis(200);
    config
}

fn launcher<'p>(
    root: &Path,
    locator: FakeLocator,
    runner: RecordingRunner,
    probe: &'p FakeProbe,
) -> Launcher<FakeLocator, RecordingRunner, &'p FakeProbe> {
    Launcher::new(config(root), locator, runner, Prober::new(probe))
}

fn text(console: Console<Vec<u8>>) -> String {
    String::from_utf8(console.into_inner()).unwrap()
}

fn failure_lines(output: &str) -> Vec<&str> {
    output.lines().filter(|l| l.starts_with("❌")).collect()
}

fn render(report: &ReadinessReport) -> String {
    let mut console = Console::new(Vec::new());
    console
        .report(report, "docker-compose -f docker-compose.yml logs")
        .unwrap();
    text(console)
}

// ---------------------------------------------------------------------------
// up
// ---------------------------------------------------------------------------

mod up {
    use super::*;

    #[tokio::test]
    async fn all_services_up_reports_healthy_with_access_urls() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::healthy();
        let launcher = launcher(
            root.path(),
            FakeLocator::all_present(),
            RecordingRunner::default(),
            &probe,
        );

        let mut console = Console::new(Vec::new());
        let report = launcher.up(&mut console).await.unwrap();

        assert!(report.all_healthy());
        assert_eq!(probe.calls.load(Ordering::SeqCst), 4);

        let output = render(&report);
        assert!(failure_lines(&output).is_empty());
        let last = output.lines().last().unwrap();
        assert_eq!(last, "   • MLflow: http://localhost:5000");
        for url in [
            "http://localhost:8000/docs",
            "http://localhost:9090/-/healthy",
            "http://localhost:3001/api/health",
        ] {
            assert!(output.contains(url), "missing {url} in:\n{output}");
        }
    }

    #[tokio::test]
    async fn prometheus_down_yields_single_failure_line() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::with_down(vec!["Prometheus"]);
        let launcher = launcher(
            root.path(),
            FakeLocator::all_present(),
            RecordingRunner::default(),
            &probe,
        );

        let report = launcher.up(&mut Console::new(Vec::new())).await.unwrap();

        assert!(!report.all_healthy());
        let verdicts: Vec<(&str, bool)> = report
            .checks()
            .iter()
            .map(|c| (c.service.name(), c.outcome.is_healthy()))
            .collect();
        assert_eq!(
            verdicts,
            [
                ("Housing API", true),
                ("Prometheus", false),
                ("Grafana", true),
                ("MLflow", true),
            ]
        );
        let output = render(&report);
        assert_eq!(failure_lines(&output), ["❌ Prometheus is not responding"]);
        assert!(output.contains("docker-compose -f docker-compose.yml logs"));
    }

    #[tokio::test]
    async fn missing_tool_aborts_before_any_side_effect() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::healthy();
        let launcher = launcher(
            root.path(),
            FakeLocator::without("docker-compose"),
            RecordingRunner::default(),
            &probe,
        );

        let mut console = Console::new(Vec::new());
        let err = launcher.up(&mut console).await.unwrap_err();

        assert!(
            matches!(&err, LaunchError::PrerequisiteMissing { tool } if tool == "docker-compose"),
            "got: {err}"
        );
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
        assert!(launcher.runner().calls().is_empty());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
        assert_eq!(
            failure_lines(&text(console)),
            ["❌ docker-compose is not installed or not in PATH"]
        );
    }

    #[tokio::test]
    async fn missing_docker_is_reported_first() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::healthy();
        let launcher = launcher(
            root.path(),
            FakeLocator::without("docker"),
            RecordingRunner::default(),
            &probe,
        );

        let err = launcher.up(&mut Console::new(Vec::new())).await.unwrap_err();
        assert!(matches!(&err, LaunchError::PrerequisiteMissing { tool } if tool == "docker"));
    }

    #[tokio::test]
    async fn creates_project_directories() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::healthy();
        let launcher = launcher(
            root.path(),
            FakeLocator::all_present(),
            RecordingRunner::default(),
            &probe,
        );

        launcher.up(&mut Console::new(Vec::new())).await.unwrap();

        for dir in ["models", "data", "housinglogs", "mlruns"] {
            assert!(root.path().join(dir).is_dir(), "missing {dir}");
        }
    }

    #[tokio::test]
    async fn compose_runs_pull_down_up_with_image_env() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::healthy();
        let mut config = config(root.path());
        config.docker_username = "alice".into();
        config.tag = "v2".into();
        let launcher = Launcher::new(
            config,
            FakeLocator::all_present(),
            RecordingRunner::default(),
            Prober::new(&probe),
        );

        launcher.up(&mut Console::new(Vec::new())).await.unwrap();

        let runner = launcher.runner();
        assert_eq!(runner.compose_subcommands(), ["pull", "down", "up -d"]);
        for call in runner.calls() {
            assert_eq!(call.args[0], "-f");
            assert_eq!(
                PathBuf::from(&call.args[1]),
                root.path().join("docker-compose.yml")
            );
            assert_eq!(call.cwd, root.path());
            assert!(call.env.contains(&("DOCKER_USERNAME".into(), "alice".into())));
            assert!(call.env.contains(&("TAG".into(), "v2".into())));
        }
    }

    #[tokio::test]
    async fn each_compose_file_gets_its_own_flag() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::healthy();
        let mut config = config(root.path());
        config.compose_files = vec![PathBuf::from("base.yml"), PathBuf::from("gpu.yml")];
        let launcher = Launcher::new(
            config,
            FakeLocator::all_present(),
            RecordingRunner::default(),
            Prober::new(&probe),
        );

        launcher.up(&mut Console::new(Vec::new())).await.unwrap();

        let base = root.path().join("base.yml").display().to_string();
        let gpu = root.path().join("gpu.yml").display().to_string();
        let runner = launcher.runner();
        assert_eq!(runner.compose_subcommands(), ["pull", "down", "up -d"]);
        for call in runner.calls() {
            assert_eq!(call.args[..4], ["-f", base.as_str(), "-f", gpu.as_str()]);
        }
        assert_eq!(
            launcher.logs_hint(),
            "docker-compose -f base.yml -f gpu.yml logs"
        );
    }

    #[tokio::test]
    async fn failed_pull_warns_and_continues() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::healthy();
        let launcher = launcher(
            root.path(),
            FakeLocator::all_present(),
            RecordingRunner::failing("pull"),
            &probe,
        );

        let mut console = Console::new(Vec::new());
        let report = launcher.up(&mut console).await.unwrap();

        assert!(report.all_healthy());
        assert_eq!(
            launcher.runner().compose_subcommands(),
            ["pull", "down", "up -d"]
        );
        let output = text(console);
        assert!(output.contains("⚠️  Failed to pull images: pull exploded"), "{output}");
    }

    #[tokio::test]
    async fn repeated_runs_give_identical_reports() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::with_down(vec!["Grafana", "MLflow"]);
        let launcher = launcher(
            root.path(),
            FakeLocator::all_present(),
            RecordingRunner::default(),
            &probe,
        );

        let first = launcher.up(&mut Console::new(Vec::new())).await.unwrap();
        let second = launcher.up(&mut Console::new(Vec::new())).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 8);
    }
}

// ---------------------------------------------------------------------------
// exit codes and report presentation
// ---------------------------------------------------------------------------

mod exit_codes {
    use super::*;

    #[tokio::test]
    async fn missing_tool_exits_with_failure() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::healthy();
        let launcher = launcher(
            root.path(),
            FakeLocator::without("docker"),
            RecordingRunner::default(),
            &probe,
        );

        let err = launcher.up(&mut Console::new(Vec::new())).await.unwrap_err();

        assert_eq!(err.exit_code(), EXIT_FAILURE);
        assert_eq!(EXIT_FAILURE, 1);
    }

    #[tokio::test]
    async fn unhealthy_stack_exits_zero_without_strict() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::with_down(vec!["Grafana"]);
        let launcher = launcher(
            root.path(),
            FakeLocator::all_present(),
            RecordingRunner::default(),
            &probe,
        );

        let report = launcher.up(&mut Console::new(Vec::new())).await.unwrap();

        assert!(!report.all_healthy());
        assert_eq!(readiness_exit_code(&report, false), EXIT_SUCCESS);
        assert_eq!(EXIT_SUCCESS, 0);
    }

    #[tokio::test]
    async fn unhealthy_stack_exits_degraded_with_strict() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::with_down(vec!["Grafana"]);
        let launcher = launcher(
            root.path(),
            FakeLocator::all_present(),
            RecordingRunner::default(),
            &probe,
        );

        let report = launcher.up(&mut Console::new(Vec::new())).await.unwrap();

        assert_eq!(readiness_exit_code(&report, true), EXIT_DEGRADED);
        assert_eq!(EXIT_DEGRADED, 2);
    }

    #[tokio::test]
    async fn healthy_stack_exits_zero_with_strict() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::healthy();
        let launcher = launcher(
            root.path(),
            FakeLocator::all_present(),
            RecordingRunner::default(),
            &probe,
        );

        let report = launcher.check(&mut Console::new(Vec::new())).await.unwrap();

        assert_eq!(readiness_exit_code(&report, true), EXIT_SUCCESS);
    }

    #[tokio::test]
    async fn json_run_prints_failure_lines_on_progress_stream() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::with_down(vec!["Housing API", "MLflow"]);
        let launcher = launcher(
            root.path(),
            FakeLocator::all_present(),
            RecordingRunner::default(),
            &probe,
        );

        let mut progress = Console::new(Vec::new());
        let mut stdout = Vec::new();
        let report = launcher.check(&mut progress).await.unwrap();
        present_report(
            &mut progress,
            &mut stdout,
            &report,
            OutputFormat::Json,
            &launcher.logs_hint(),
        )
        .unwrap();

        let progress = text(progress);
        assert_eq!(
            failure_lines(&progress),
            [
                "❌ Housing API is not responding",
                "❌ MLflow is not responding",
            ]
        );
        assert!(progress.contains("2/4 services are responding."));
        assert!(progress.contains("docker-compose -f docker-compose.yml logs"));

        let value: serde_json::Value = serde_json::from_slice(&stdout).unwrap();
        assert_eq!(value["all_healthy"], false);
        assert_eq!(value["checks"][3]["service"]["url"], "http://localhost:5000");
    }
}

// ---------------------------------------------------------------------------
// check / down
// ---------------------------------------------------------------------------

mod check_and_down {
    use super::*;

    #[tokio::test]
    async fn check_probes_without_running_commands() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::with_down(vec!["Housing API"]);
        let launcher = launcher(
            root.path(),
            FakeLocator::all_present(),
            RecordingRunner::default(),
            &probe,
        );

        let report = launcher.check(&mut Console::new(Vec::new())).await.unwrap();

        assert!(!report.all_healthy());
        assert!(launcher.runner().calls().is_empty());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn down_only_stops_the_stack() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::healthy();
        let launcher = launcher(
            root.path(),
            FakeLocator::all_present(),
            RecordingRunner::default(),
            &probe,
        );

        launcher.down(&mut Console::new(Vec::new())).await.unwrap();

        assert_eq!(launcher.runner().compose_subcommands(), ["down"]);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn down_requires_tools() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::healthy();
        let launcher = launcher(
            root.path(),
            FakeLocator::without("docker"),
            RecordingRunner::default(),
            &probe,
        );

        let err = launcher.down(&mut Console::new(Vec::new())).await.unwrap_err();
        assert!(matches!(err, LaunchError::PrerequisiteMissing { .. }));
        assert!(launcher.runner().calls().is_empty());
    }
}

// ---------------------------------------------------------------------------
// doctor
// ---------------------------------------------------------------------------

mod doctor {
    use super::*;

    fn non_network_issues(issues: &[Issue]) -> Vec<Issue> {
        issues
            .iter()
            .filter(|i| !matches!(i, Issue::PortClosed { .. } | Issue::Unhealthy { .. }))
            .cloned()
            .collect()
    }

    #[tokio::test]
    async fn missing_compose_file_is_reported() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::healthy();
        let runner = RecordingRunner {
            running: vec!["api", "prometheus", "grafana", "mlflow"],
            ..Default::default()
        };
        let launcher = launcher(root.path(), FakeLocator::all_present(), runner, &probe);

        let diagnosis = launcher.diagnose(&mut Console::new(Vec::new())).await.unwrap();

        assert_eq!(
            non_network_issues(&diagnosis.issues),
            [Issue::ComposeFileMissing]
        );
        assert!(diagnosis.report.all_healthy());
    }

    #[tokio::test]
    async fn stopped_containers_and_unhealthy_services_are_reported() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("docker-compose.yml"), "services: {}\n").unwrap();
        let probe = FakeProbe::with_down(vec!["Grafana"]);
        let runner = RecordingRunner {
            running: vec!["api", "prometheus", "mlflow"],
            ..Default::default()
        };
        let launcher = launcher(root.path(), FakeLocator::all_present(), runner, &probe);

        let diagnosis = launcher.diagnose(&mut Console::new(Vec::new())).await.unwrap();

        assert_eq!(
            non_network_issues(&diagnosis.issues),
            [Issue::ContainersStopped {
                services: vec!["grafana".into()]
            }]
        );
        assert!(diagnosis.issues.contains(&Issue::Unhealthy {
            service: "Grafana".into()
        }));
        assert!(!diagnosis.is_clean());
    }

    #[tokio::test]
    async fn docker_daemon_down_is_reported() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("docker-compose.yml"), "services: {}\n").unwrap();
        let probe = FakeProbe::healthy();
        let runner = RecordingRunner {
            failing: vec!["info"],
            running: vec!["api", "prometheus", "grafana", "mlflow"],
            ..Default::default()
        };
        let launcher = launcher(root.path(), FakeLocator::all_present(), runner, &probe);

        let diagnosis = launcher.diagnose(&mut Console::new(Vec::new())).await.unwrap();

        assert_eq!(
            non_network_issues(&diagnosis.issues),
            [Issue::DockerUnavailable]
        );
    }

    #[tokio::test]
    async fn invalid_compose_file_is_reported() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("docker-compose.yml"), "nope").unwrap();
        let probe = FakeProbe::healthy();
        let runner = RecordingRunner {
            failing: vec!["config"],
            running: vec!["api", "prometheus", "grafana", "mlflow"],
            ..Default::default()
        };
        let launcher = launcher(root.path(), FakeLocator::all_present(), runner, &probe);

        let diagnosis = launcher.diagnose(&mut Console::new(Vec::new())).await.unwrap();

        assert_eq!(
            non_network_issues(&diagnosis.issues),
            [Issue::ComposeFileInvalid]
        );
    }

    #[tokio::test]
    async fn repair_starts_stack_then_rediagnoses() {
        let root = tempfile::tempdir().unwrap();
        let probe = FakeProbe::healthy();
        let launcher = launcher(
            root.path(),
            FakeLocator::all_present(),
            RecordingRunner::default(),
            &probe,
        );

        launcher.repair(&mut Console::new(Vec::new())).await.unwrap();

        let subcommands = launcher.runner().compose_subcommands();
        assert_eq!(subcommands[0], "up -d");
        assert_eq!(probe.calls.load(Ordering::SeqCst), 4);
    }
}
