#![forbid(unsafe_code)]

mod cmd;
mod output;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use fixlag_core::config;
use fixlag_core::error::ErrorCode;
use output::{CliError, OutputMode, render_error};
use std::env;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "fixlag: static-analysis issue lifecycles and fix latency",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format for summaries.
    #[arg(long, global = true, value_enum, value_name = "FORMAT")]
    format: Option<OutputMode>,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Output mode requested on the command line, if any.
    fn output_flag(&self) -> Option<&'static str> {
        self.format
            .map(OutputMode::as_str)
            .or_else(|| self.json.then_some("json"))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Reconstruct issue lifecycles from a snapshot log",
        long_about = "Fold a per-commit snapshot log into one lifecycle record per issue and \
                      sample, resolve fix windows, and write the report.",
        after_help = "EXAMPLES:\n    # Write a TSV report next to the log\n    fixlag analyze snapshots.log --output report.tsv\n\n    # Stream JSONL to another tool, keep rejected rows for review\n    fixlag analyze snapshots.log --report-format jsonl --bad-lines bad.tsv | jq .\n\n    # Read from stdin, fold samples in parallel\n    cat snapshots.log | fixlag analyze - --parallel -o report.tsv"
    )]
    Analyze(cmd::analyze::AnalyzeArgs),

    #[command(
        about = "Audit a report for keys shared across rows",
        long_about = "List issue keys that occur in more than one report row, with the columns \
                      whose values differ, plus the distinct samples.",
        after_help = "EXAMPLES:\n    # Audit a report\n    fixlag audit report.tsv\n\n    # Emit machine-readable output\n    fixlag audit report.tsv --json"
    )]
    Audit(cmd::audit::AuditArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("FIXLAG_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "fixlag=debug,fixlag_core=debug,info"
        } else {
            "fixlag=info,fixlag_core=info,warn"
        })
    });

    let format = env::var("FIXLAG_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    // stdout may carry the report.
    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let effective = match config::resolve_config(&project_root, cli.output_flag()) {
        Ok(effective) => effective,
        Err(e) => {
            let mode = cli
                .output_flag()
                .map_or(OutputMode::Text, OutputMode::from_resolved);
            render_error(
                mode,
                &CliError::from_code(format!("{e:#}"), ErrorCode::ConfigParseError),
            )?;
            return Err(e).context("failed to load configuration");
        }
    };
    let output = OutputMode::from_resolved(&effective.resolved_output);
    debug!(output = output.as_str(), "output mode resolved");

    match cli.command {
        Commands::Analyze(ref args) => {
            cmd::analyze::run_analyze(args, output, cli.quiet, &effective.project)
        }
        Commands::Audit(ref args) => cmd::audit::run_audit(args, output),
    }
}
