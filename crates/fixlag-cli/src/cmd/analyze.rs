//! `fixlag analyze`: reconstruct issue lifecycles from a snapshot log.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use fixlag_core::config::ProjectConfig;
use fixlag_core::loader::{BadLine, read_snapshot_log};
use fixlag_core::report::tsv::escape;
use fixlag_core::{
    LoadError, LoadReport, ReconstructOptions, ReconstructionSummary, ReportError, ReportFormat,
    load_snapshots, reconstruct_loaded, write_report,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::output::{
    CliError, OutputMode, pretty_kv, pretty_section, render, render_error, render_stderr,
};

/// Arguments for `fixlag analyze`.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Snapshot log to read, or `-` for stdin.
    #[arg(value_name = "INPUT")]
    pub input: String,

    /// Report path (defaults to stdout).
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Report encoding: `tsv` or `jsonl` (defaults to `[report] format`).
    #[arg(long, value_name = "FORMAT")]
    pub report_format: Option<ReportFormat>,

    /// Write rejected log rows to this file.
    #[arg(long, value_name = "PATH")]
    pub bad_lines: Option<PathBuf>,

    /// Process samples concurrently.
    #[arg(long)]
    pub parallel: bool,
}

/// Summary payload for `fixlag analyze`.
#[derive(Debug, Serialize)]
pub struct AnalyzeSummary {
    pub input: String,
    pub report: Option<String>,
    pub report_format: ReportFormat,
    pub bad_lines_file: Option<String>,
    #[serde(flatten)]
    pub summary: ReconstructionSummary,
}

fn load_input(input: &str) -> Result<LoadReport, LoadError> {
    if input == "-" {
        let mut content = String::new();
        io::stdin().read_to_string(&mut content)?;
        load_snapshots(&content)
    } else {
        read_snapshot_log(Path::new(input))
    }
}

fn write_bad_lines(path: &Path, bad_lines: &[BadLine]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create bad-lines file {}", path.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "line_no\treason\tcontent")?;
    for bad in bad_lines {
        writeln!(
            out,
            "{}\t{}\t{}",
            bad.line_no,
            escape(&bad.reason),
            escape(&bad.content)
        )?;
    }
    out.flush()?;
    Ok(())
}

fn open_report(path: Option<&Path>) -> Result<Box<dyn Write>, ReportError> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(ReportError::Write)?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

/// Execute `fixlag analyze`.
pub fn run_analyze(
    args: &AnalyzeArgs,
    output: OutputMode,
    quiet: bool,
    project: &ProjectConfig,
) -> Result<()> {
    let load = match load_input(&args.input) {
        Ok(load) => load,
        Err(e) => {
            render_error(output, &CliError::from(&e))?;
            anyhow::bail!("cannot load {}: {e}", args.input);
        }
    };
    debug!(
        snapshots = load.snapshots.len(),
        bad_lines = load.bad_lines.len(),
        "snapshot log parsed"
    );

    if let Some(path) = &args.bad_lines {
        write_bad_lines(path, &load.bad_lines)?;
        info!(path = %path.display(), rows = load.bad_lines.len(), "bad lines written");
    }

    let options = ReconstructOptions {
        parallel: args.parallel || project.analysis.parallel,
    };
    let reconstruction = reconstruct_loaded(&load, &options);

    let format = args.report_format.unwrap_or(project.report.format);
    let written = open_report(args.output.as_deref())
        .and_then(|out| write_report(&reconstruction.records, format, out));
    if let Err(e) = written {
        render_error(output, &CliError::from(&e))?;
        anyhow::bail!("cannot write report: {e}");
    }

    if quiet {
        return Ok(());
    }

    let payload = AnalyzeSummary {
        input: args.input.clone(),
        report: args.output.as_ref().map(|p| p.display().to_string()),
        report_format: format,
        bad_lines_file: args.bad_lines.as_ref().map(|p| p.display().to_string()),
        summary: reconstruction.summary,
    };

    if args.output.is_some() {
        render(output, &payload, render_text, render_pretty)
    } else {
        render_stderr(output, &payload, render_text, render_pretty)
    }
}

fn fmt_days(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |days| format!("{days:.1}"))
}

fn render_text(payload: &AnalyzeSummary, w: &mut dyn Write) -> io::Result<()> {
    let s = &payload.summary;
    writeln!(
        w,
        "samples={} snapshots={} absent={} rejected={} records={}",
        s.samples, s.snapshots, s.absent_snapshots, s.rejected_rows, s.records
    )?;
    writeln!(
        w,
        "fixed={} next_commit={} open={} mean_days={} median_days={}",
        s.fixed,
        s.resolved_next_commit,
        s.still_open,
        fmt_days(s.mean_fix_duration),
        fmt_days(s.median_fix_duration)
    )?;
    let anomalies: Vec<String> = s
        .anomalies
        .iter()
        .map(|(kind, count)| format!("{kind}={count}"))
        .collect();
    writeln!(w, "anomalies {}", anomalies.join(" "))
}

fn render_pretty(payload: &AnalyzeSummary, w: &mut dyn Write) -> io::Result<()> {
    let s = &payload.summary;
    pretty_section(w, "Input")?;
    pretty_kv(w, "Snapshot log", &payload.input)?;
    pretty_kv(w, "Samples", s.samples.to_string())?;
    pretty_kv(w, "Snapshots", s.snapshots.to_string())?;
    pretty_kv(w, "Absent snapshots", s.absent_snapshots.to_string())?;
    pretty_kv(w, "Rejected rows", s.rejected_rows.to_string())?;
    if let Some(path) = &payload.bad_lines_file {
        pretty_kv(w, "Bad lines file", path)?;
    }
    writeln!(w)?;

    pretty_section(w, "Lifecycles")?;
    pretty_kv(w, "Records", s.records.to_string())?;
    pretty_kv(w, "Fixed", s.fixed.to_string())?;
    pretty_kv(w, "Resolved by next commit", s.resolved_next_commit.to_string())?;
    pretty_kv(w, "Still open", s.still_open.to_string())?;
    pretty_kv(w, "Mean fix days", fmt_days(s.mean_fix_duration))?;
    pretty_kv(w, "Median fix days", fmt_days(s.median_fix_duration))?;
    writeln!(w)?;

    pretty_section(w, "Anomalies")?;
    for (kind, count) in &s.anomalies {
        pretty_kv(w, kind.as_str(), count.to_string())?;
    }
    writeln!(w)?;

    let destination = payload.report.as_deref().unwrap_or("stdout");
    pretty_kv(w, "Report", format!("{destination} ({})", payload.report_format))
}
