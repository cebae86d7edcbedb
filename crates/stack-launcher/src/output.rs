use std::io::Write;

use clap::ValueEnum;
use stack_probe::{Outcome, ReadinessReport};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Emoji-prefixed status lines for a human at a terminal.
pub struct Console<W> {
    out: W,
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn line(&mut self, text: &str) -> std::io::Result<()> {
        writeln!(self.out, "{text}")
    }

    pub fn step(&mut self, text: &str) -> std::io::Result<()> {
        writeln!(self.out, "🔄 {text}")
    }

    pub fn ok(&mut self, text: &str) -> std::io::Result<()> {
        writeln!(self.out, "✅ {text}")
    }

    pub fn warn(&mut self, text: &str) -> std::io::Result<()> {
        writeln!(self.out, "⚠️  {text}")
    }

    pub fn fail(&mut self, text: &str) -> std::io::Result<()> {
        writeln!(self.out, "❌ {text}")
    }

    /// One failure line per unhealthy service, then the success or failure
    /// summary.
    pub fn report(&mut self, report: &ReadinessReport, logs_hint: &str) -> std::io::Result<()> {
        for check in report.failures() {
            let detail = match &check.outcome {
                Outcome::Rejected { status, .. } => format!(" (HTTP {status})"),
                _ => String::new(),
            };
            self.fail(&format!("{} is not responding{detail}", check.service.name()))?;
        }

        writeln!(self.out)?;
        if report.all_healthy() {
            writeln!(self.out, "🎉 All services are up and running!")?;
            writeln!(self.out, "🌐 Access your services:")?;
            for check in report.checks() {
                writeln!(
                    self.out,
                    "   • {}: {}",
                    check.service.name(),
                    check.service.endpoint()
                )?;
            }
        } else {
            self.warn(&format!(
                "{}/{} services are responding.",
                report.healthy_count(),
                report.checks().len()
            ))?;
            writeln!(self.out, "📋 Check the logs with: {logs_hint}")?;
        }
        Ok(())
    }
}

/// Status lines and summary always go to the console. In JSON mode the
/// report itself is also written to `out`.
pub fn present_report<P: Write, O: Write>(
    console: &mut Console<P>,
    out: O,
    report: &ReadinessReport,
    format: OutputFormat,
    logs_hint: &str,
) -> std::io::Result<()> {
    console.report(report, logs_hint)?;
    if format == OutputFormat::Json {
        write_json(out, report)?;
    }
    Ok(())
}

/// Write the report as pretty JSON.
pub fn write_json<W: Write, T: serde::Serialize>(mut out: W, value: &T) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)
}
