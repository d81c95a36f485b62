//! `fixlag audit`: check a written report for keys shared across rows.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use fixlag_core::report::{AuditReport, audit, read_table_file};

use crate::output::{CliError, OutputMode, pretty_kv, pretty_section, render, render_error};

/// Arguments for `fixlag audit`.
#[derive(Args, Debug)]
pub struct AuditArgs {
    /// TSV report written by `fixlag analyze`.
    #[arg(value_name = "REPORT")]
    pub report: PathBuf,
}

/// Execute `fixlag audit`.
pub fn run_audit(args: &AuditArgs, output: OutputMode) -> Result<()> {
    let table = match read_table_file(&args.report) {
        Ok(table) => table,
        Err(e) => {
            render_error(output, &CliError::from(&e))?;
            anyhow::bail!("cannot audit {}: {e}", args.report.display());
        }
    };

    let report = audit(&table);
    render(output, &report, render_text, render_pretty)
}

fn render_text(report: &AuditReport, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "rows={} samples={} duplicate_keys={}",
        report.rows,
        report.samples.len(),
        report.duplicates.len()
    )?;
    for dup in &report.duplicates {
        let lines: Vec<String> = dup.lines.iter().map(ToString::to_string).collect();
        let columns: Vec<&str> = dup.differing.keys().map(String::as_str).collect();
        writeln!(
            w,
            "{}\tlines={}\tdiffering={}",
            dup.key,
            lines.join(","),
            columns.join(",")
        )?;
    }
    Ok(())
}

fn render_pretty(report: &AuditReport, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Report")?;
    pretty_kv(w, "Rows", report.rows.to_string())?;
    pretty_kv(w, "Distinct samples", report.samples.len().to_string())?;
    pretty_kv(w, "Samples", report.samples.join(", "))?;
    pretty_kv(w, "Shared keys", report.duplicates.len().to_string())?;

    for (i, dup) in report.duplicates.iter().enumerate() {
        writeln!(w)?;
        pretty_section(w, &format!("Duplicate {}: {}", i + 1, dup.key))?;
        pretty_kv(w, "Samples", dup.samples.join(", "))?;
        if dup.differing.is_empty() {
            pretty_kv(w, "Differing", "none")?;
        }
        for (column, values) in &dup.differing {
            pretty_kv(w, column, values.join(" | "))?;
        }
    }
    Ok(())
}
