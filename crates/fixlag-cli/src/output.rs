//! Shared output layer for pretty/text/JSON parity across commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its result
//! accordingly: pretty output for humans, compact `key=value` text for
//! scripts, or stable JSON. Command output goes to stdout unless stdout is
//! already carrying a report, in which case it goes to stderr.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--format` / `--json` flag
//! 2. `FORMAT` env var: `pretty` | `text` | `json`
//! 3. `output` in the user config file
//! 4. Default: [`OutputMode::Pretty`] if stdout is a TTY, [`OutputMode::Text`] if piped.

use clap::ValueEnum;
use fixlag_core::LoadError;
use fixlag_core::error::ErrorCode;
use fixlag_core::report::ReportError;
use serde::Serialize;
use std::io::{self, Write};

/// Shared width for human pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 60;

/// Write a horizontal separator used by pretty human output.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Render a left-aligned key/value line in human output.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<24} {}", format!("{key}:"), value.as_ref())
}

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Human-optimized output (sections, aligned values).
    Pretty,
    /// Plain `key=value` lines for scripts and pipes.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    /// Name understood by the config layer.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Text => "text",
            Self::Json => "json",
        }
    }

    /// Parse a mode already normalized by the config layer.
    pub fn from_resolved(raw: &str) -> Self {
        match raw {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => Self::Text,
        }
    }
}

/// A structured error with optional suggestion and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Human-readable error message.
    pub message: String,
    /// Optional suggestion for how to fix the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable error code (`E####`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    /// Create an error carrying an [`ErrorCode`] and its hint.
    pub fn from_code(message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            message: message.into(),
            suggestion: code.hint().map(ToString::to_string),
            error_code: Some(code.code().to_string()),
        }
    }
}

impl From<&LoadError> for CliError {
    fn from(err: &LoadError) -> Self {
        Self::from_code(err.to_string(), err.code())
    }
}

impl From<&ReportError> for CliError {
    fn from(err: &ReportError) -> Self {
        Self::from_code(err.to_string(), err.code())
    }
}

/// Render a serializable value to `w` with distinct text and pretty renderers.
pub fn render_to<T: Serialize>(
    w: &mut dyn Write,
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *w, value)?;
            writeln!(w)?;
        }
        OutputMode::Text => text_fn(value, w)?,
        OutputMode::Pretty => pretty_fn(value, w)?,
    }
    Ok(())
}

/// Render a serializable value to stdout.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    render_to(&mut out, mode, value, text_fn, pretty_fn)
}

/// Render a serializable value to stderr.
pub fn render_stderr<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    render_to(&mut out, mode, value, text_fn, pretty_fn)
}

fn write_error(w: &mut dyn Write, mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "error": error,
            });
            serde_json::to_writer_pretty(&mut *w, &wrapper)?;
            writeln!(w)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            match &error.error_code {
                Some(code) => writeln!(w, "error[{code}]: {}", error.message)?,
                None => writeln!(w, "error: {}", error.message)?,
            }
            if let Some(ref suggestion) = error.suggestion {
                writeln!(w, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    write_error(&mut out, mode, error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        name: &'static str,
        count: usize,
    }

    fn render_string(mode: OutputMode) -> String {
        let mut buf = Vec::new();
        render_to(
            &mut buf,
            mode,
            &Sample { name: "alpha", count: 3 },
            |s, w| writeln!(w, "name={} count={}", s.name, s.count),
            |s, w| {
                pretty_section(w, "Sample")?;
                pretty_kv(w, "Name", s.name)?;
                pretty_kv(w, "Count", s.count.to_string())
            },
        )
        .expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn json_mode_serializes_value() {
        let text = render_string(OutputMode::Json);
        let value: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value["name"], "alpha");
        assert_eq!(value["count"], 3);
    }

    #[test]
    fn text_mode_uses_text_renderer() {
        assert_eq!(render_string(OutputMode::Text), "name=alpha count=3\n");
    }

    #[test]
    fn pretty_mode_uses_sections() {
        let text = render_string(OutputMode::Pretty);
        assert!(text.starts_with("Sample\n"));
        assert!(text.contains(&"-".repeat(PRETTY_RULE_WIDTH)));
        assert!(text.contains("Name:"));
    }

    #[test]
    fn resolved_names_map_to_modes() {
        for mode in [OutputMode::Pretty, OutputMode::Text, OutputMode::Json] {
            assert_eq!(OutputMode::from_resolved(mode.as_str()), mode);
        }
    }

    #[test]
    fn load_error_carries_code_and_hint() {
        let err = LoadError::VersionMismatch {
            line_no: 1,
            message: "version 9 is newer".into(),
        };
        let cli = CliError::from(&err);
        assert_eq!(
            cli.error_code.as_deref(),
            Some(ErrorCode::UnsupportedLogVersion.code())
        );
        assert!(cli.suggestion.is_some());
        assert!(cli.message.contains("version 9"));
    }

    #[test]
    fn error_json_wraps_in_error_key() {
        let mut buf = Vec::new();
        let err = CliError {
            message: "boom".into(),
            suggestion: None,
            error_code: None,
        };
        write_error(&mut buf, OutputMode::Json, &err).expect("render");
        let value: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(value["error"]["message"], "boom");
        assert!(value["error"].get("suggestion").is_none());
    }

    #[test]
    fn error_text_includes_code_and_suggestion() {
        let err = ReportError::HeaderMismatch {
            expected: 33,
            found: "a, b".into(),
        };
        let mut buf = Vec::new();
        write_error(&mut buf, OutputMode::Text, &CliError::from(&err)).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("error[E3002]:"));
        assert!(text.contains("suggestion:"));
    }
}
