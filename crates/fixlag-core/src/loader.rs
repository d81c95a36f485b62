//! Snapshot log loader.
//!
//! Parses the per-commit snapshot log (tab-separated fields with a JSON
//! issues payload) into [`Snapshot`]s, in log order.
//!
//! # Format (v1)
//!
//! ```text
//! # fixlag snapshot log v1
//! # fields: sample \t commit_hash \t commit_date [\t analyzed_at] \t issues
//! ```
//!
//! - Comment lines start with `#`; blank lines are skipped.
//! - 3 fields: the issues column is missing and the snapshot is absent.
//! - 4 fields: the last field is the issues payload.
//! - 5 fields: field 4 is the scanner's analysis timestamp, field 5 the payload.
//!
//! # Tolerance
//!
//! Only an unreadable log or a log written by a newer format version fails
//! the load. A payload that does not parse becomes [`Issues::Absent`] so the
//! commit keeps its position in the sample's timeline. A row with no usable
//! sample, hash or date cannot hold a position at all; it is returned as a
//! [`BadLine`] and skipped.
//!
//! # Python-literal payloads
//!
//! Older collection scripts wrote the payload with Python's `str()` of the
//! response dict (`{'total': 0, 'issues': [], 'flag': True, 'x': None}`).
//! When a payload is not valid JSON it is rewritten from that literal form
//! and parsed again. A `commits_report.csv` from those scripts loads once
//! its `Sample, Commit Hash, Date[, Analysis Date], Issues` columns are
//! re-joined with tabs.

use std::fmt::Write as _;
use std::iter::Peekable;
use std::path::Path;
use std::str::Chars;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::diagnostics::{Anomaly, AnomalyKind, Diagnostics};
use crate::error::ErrorCode;
use crate::model::{Finding, Issues, Snapshot};

// ---------------------------------------------------------------------------
// Log header constants
// ---------------------------------------------------------------------------

/// The header line written at the top of a snapshot log.
pub const LOG_HEADER: &str = "# fixlag snapshot log v1";

/// The field comment line that follows the header.
pub const FIELD_COMMENT: &str =
    "# fields: sample \\t commit_hash \\t commit_date [\\t analyzed_at] \\t issues";

/// The snapshot log format version understood by this build.
pub const CURRENT_VERSION: u32 = 1;

const HEADER_PREFIX: &str = "# fixlag snapshot log v";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Fatal load failures.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read snapshot log: {0}")]
    Io(#[from] std::io::Error),

    /// The log was written by a newer format version.
    #[error("line {line_no}: {message}")]
    VersionMismatch { line_no: usize, message: String },
}

impl LoadError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io(_) => ErrorCode::InputUnreadable,
            Self::VersionMismatch { .. } => ErrorCode::UnsupportedLogVersion,
        }
    }
}

/// Why a row could not become a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("expected 3 to 5 tab-separated fields, found {found}")]
    FieldCount { found: usize },

    #[error("sample field is empty")]
    EmptySample,

    #[error("sample '{0}' starts with '#' and would read back as a comment")]
    CommentSample(String),

    #[error("commit hash field is empty")]
    EmptyCommitHash,

    #[error("invalid commit date: '{0}'")]
    InvalidDate(String),
}

// ---------------------------------------------------------------------------
// Parsed output types
// ---------------------------------------------------------------------------

/// What happened to a row's issues payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Parsed into a finding list (possibly empty).
    Parsed,
    /// No payload for this commit (column missing, empty, `null` or `None`).
    Missing,
    /// A payload was present but failed structural validation.
    Malformed(String),
}

/// The result of parsing a single line of a snapshot log.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine<'a> {
    /// A comment line, `#` included.
    Comment(&'a str),
    /// A blank or whitespace-only line.
    Blank,
    /// A snapshot (boxed to reduce enum size), with the fate of its payload.
    Snapshot {
        snapshot: Box<Snapshot>,
        payload: Payload,
    },
}

/// A row that was skipped, kept for operator review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadLine {
    /// 1-indexed line number in the log.
    pub line_no: usize,
    pub reason: String,
    pub content: String,
}

/// Everything [`load_snapshots`] produced.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Snapshots in log order, absent ones included.
    pub snapshots: Vec<Snapshot>,
    pub bad_lines: Vec<BadLine>,
    pub diagnostics: Diagnostics,
}

impl LoadReport {
    #[must_use]
    pub fn absent_count(&self) -> usize {
        self.snapshots.iter().filter(|s| s.issues.is_absent()).count()
    }
}

// ---------------------------------------------------------------------------
// Version detection
// ---------------------------------------------------------------------------

/// Detect the snapshot log version from a header line.
///
/// # Errors
///
/// Returns an actionable message if the header is malformed or names a
/// version newer than [`CURRENT_VERSION`].
pub fn detect_version(first_line: &str) -> Result<u32, String> {
    let line = first_line.trim();
    let Some(version_str) = line.strip_prefix(HEADER_PREFIX) else {
        return Err(format!(
            "Invalid snapshot log header: expected '{HEADER_PREFIX}N', got '{line}'."
        ));
    };
    let version: u32 = version_str.parse().map_err(|_| {
        format!(
            "Invalid version number '{version_str}' in snapshot log header.\n\
             Expected a positive integer after '{HEADER_PREFIX}'."
        )
    })?;
    if version > CURRENT_VERSION {
        return Err(format!(
            "Snapshot log version {version} is newer than this version of fixlag \
             (supports up to v{CURRENT_VERSION}).\n\
             Please upgrade fixlag: cargo install fixlag-cli"
        ));
    }
    Ok(version)
}

// ---------------------------------------------------------------------------
// Field parsing
// ---------------------------------------------------------------------------

/// Parse the calendar date at the start of a commit date field.
///
/// Accepts `YYYY-MM-DD`, optionally followed by a time part separated by a
/// space or `T` (`git show --format=%ci`, RFC 3339).
#[must_use]
pub fn parse_commit_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.trim().split([' ', 'T']).next()?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// The scanner's issue-search response.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    issues: Option<Vec<Finding>>,
}

/// Parse an issues payload.
///
/// Returns `Ok(None)` when the payload is missing, `Ok(Some(findings))` when
/// it parsed, and `Err(detail)` when it is present but invalid.
///
/// # Errors
///
/// Returns a description of the first structural problem found.
pub fn parse_issues(raw: &str) -> Result<Option<Vec<Finding>>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "None" || trimmed == "null" {
        return Ok(None);
    }

    let value: serde_json::Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(e) => python_literal_to_json(trimmed)
            .and_then(|json| serde_json::from_str(&json).ok())
            .ok_or_else(|| format!("invalid issues JSON: {e}"))?,
    };

    match value {
        serde_json::Value::Array(_) => serde_json::from_value::<Vec<Finding>>(value)
            .map(Some)
            .map_err(|e| format!("invalid finding: {e}")),
        serde_json::Value::Object(_) => {
            let response: SearchResponse = serde_json::from_value(value)
                .map_err(|e| format!("invalid issues response: {e}"))?;
            match (response.total, response.issues) {
                (Some(0), _) => Ok(Some(Vec::new())),
                (_, Some(issues)) => Ok(Some(issues)),
                (_, None) => Err("issues response has no 'issues' list".to_string()),
            }
        }
        other => Err(format!(
            "expected an issues list or response object, found {}",
            json_kind(&other)
        )),
    }
}

/// Rewrite a Python literal (`repr` of dicts, lists, strings, numbers,
/// `True`/`False`/`None`) as JSON text.
///
/// Returns `None` for an unterminated string or a bad escape.
#[must_use]
pub fn python_literal_to_json(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => push_python_string(&mut out, c, &mut chars)?,
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if !(next.is_ascii_alphanumeric() || next == '_') {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                match word.as_str() {
                    "None" => out.push_str("null"),
                    "True" => out.push_str("true"),
                    "False" => out.push_str("false"),
                    _ => out.push_str(&word),
                }
            }
            other => out.push(other),
        }
    }
    Some(out)
}

fn push_json_char(out: &mut String, c: char) {
    match c {
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        c if u32::from(c) < 0x20 => {
            let _ = write!(out, "\\u{:04x}", u32::from(c));
        }
        c => out.push(c),
    }
}

fn push_python_string(
    out: &mut String,
    quote: char,
    chars: &mut Peekable<Chars<'_>>,
) -> Option<()> {
    out.push('"');
    loop {
        let c = chars.next()?;
        if c == quote {
            break;
        }
        if c != '\\' {
            push_json_char(out, c);
            continue;
        }
        match chars.next()? {
            'n' => out.push_str("\\n"),
            't' => out.push_str("\\t"),
            'r' => out.push_str("\\r"),
            'x' => push_json_char(out, hex_escape(chars, 2)?),
            'u' => push_json_char(out, hex_escape(chars, 4)?),
            'U' => push_json_char(out, hex_escape(chars, 8)?),
            escaped @ ('\\' | '\'' | '"') => push_json_char(out, escaped),
            other => {
                push_json_char(out, '\\');
                push_json_char(out, other);
            }
        }
    }
    out.push('"');
    Some(())
}

fn hex_escape(chars: &mut Peekable<Chars<'_>>, digits: usize) -> Option<char> {
    let hex: String = chars.by_ref().take(digits).collect();
    if hex.chars().count() != digits {
        return None;
    }
    u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
}

const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Line parsing
// ---------------------------------------------------------------------------

/// Parse one snapshot log line.
///
/// # Errors
///
/// Returns [`RowError`] when the row cannot take a timeline position. A bad
/// issues payload is *not* an error; see [`Payload::Malformed`].
pub fn parse_line(line: &str) -> Result<ParsedLine<'_>, RowError> {
    let trimmed = line.trim_end_matches('\n').trim_end_matches('\r');

    if trimmed.starts_with('#') {
        return Ok(ParsedLine::Comment(trimmed));
    }

    if trimmed.trim().is_empty() {
        return Ok(ParsedLine::Blank);
    }

    let fields: Vec<&str> = trimmed.split('\t').collect();
    let (analyzed_at, raw_issues) = match fields.len() {
        3 => (None, None),
        4 => (None, Some(fields[3])),
        5 => (Some(fields[3]), Some(fields[4])),
        found => return Err(RowError::FieldCount { found }),
    };

    let sample = fields[0].trim();
    if sample.is_empty() {
        return Err(RowError::EmptySample);
    }
    if sample.starts_with('#') {
        return Err(RowError::CommentSample(sample.to_string()));
    }

    let commit_hash = fields[1].trim();
    if commit_hash.is_empty() {
        return Err(RowError::EmptyCommitHash);
    }

    let commit_date =
        parse_commit_date(fields[2]).ok_or_else(|| RowError::InvalidDate(fields[2].to_string()))?;

    let (issues, payload) = match raw_issues.map(parse_issues) {
        None | Some(Ok(None)) => (Issues::Absent, Payload::Missing),
        Some(Ok(Some(findings))) => (Issues::Present(findings), Payload::Parsed),
        Some(Err(detail)) => (Issues::Absent, Payload::Malformed(detail)),
    };

    let mut snapshot = Snapshot::new(sample, commit_hash, commit_date, issues);
    snapshot.analyzed_at = analyzed_at
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);

    Ok(ParsedLine::Snapshot {
        snapshot: Box::new(snapshot),
        payload,
    })
}

/// Load every snapshot from a snapshot log, in order.
///
/// If a line looks like a log header (`# fixlag snapshot log v<N>`), its
/// version is checked via [`detect_version`].
///
/// # Errors
///
/// Returns [`LoadError::VersionMismatch`] for a log written by a newer
/// version. Every other problem is recovered and reported in the
/// [`LoadReport`].
pub fn load_snapshots(input: &str) -> Result<LoadReport, LoadError> {
    let mut report = LoadReport::default();
    let mut version_checked = false;

    for (i, line) in input.lines().enumerate() {
        let line_no = i + 1;

        if !version_checked && line.trim_start().starts_with(HEADER_PREFIX) {
            version_checked = true;
            detect_version(line).map_err(|message| LoadError::VersionMismatch { line_no, message })?;
            continue;
        }

        match parse_line(line) {
            Ok(ParsedLine::Comment(_) | ParsedLine::Blank) => {}
            Ok(ParsedLine::Snapshot { snapshot, payload }) => {
                match payload {
                    Payload::Parsed => {}
                    Payload::Missing => debug!(
                        line_no,
                        sample = %snapshot.sample,
                        commit = %snapshot.commit_hash,
                        "no issues payload; keeping snapshot as absent"
                    ),
                    Payload::Malformed(detail) => report.diagnostics.record(
                        Anomaly::new(
                            AnomalyKind::MalformedSnapshot,
                            snapshot.sample.clone(),
                            format!("line {line_no}: {detail}"),
                        )
                        .at_commit(snapshot.commit_hash.clone()),
                    ),
                }
                report.snapshots.push(*snapshot);
            }
            Err(err) => {
                warn!(line_no, error = %err, "skipping unusable snapshot row");
                report.bad_lines.push(BadLine {
                    line_no,
                    reason: err.to_string(),
                    content: line.to_string(),
                });
            }
        }
    }

    debug!(
        snapshots = report.snapshots.len(),
        bad_lines = report.bad_lines.len(),
        "snapshot log loaded"
    );
    Ok(report)
}

/// Read and load a snapshot log from disk.
///
/// # Errors
///
/// Returns [`LoadError::Io`] if the file cannot be read, otherwise as
/// [`load_snapshots`].
pub fn read_snapshot_log(path: &Path) -> Result<LoadReport, LoadError> {
    let content = std::fs::read_to_string(path)?;
    load_snapshots(&content)
}

/// Format a snapshot as a log line (no trailing newline).
///
/// Present issues are written as a JSON array; absent ones as `null`.
///
/// # Errors
///
/// Returns an error if a finding fails to serialize.
pub fn format_line(snapshot: &Snapshot) -> Result<String, serde_json::Error> {
    let payload = match &snapshot.issues {
        Issues::Present(findings) => serde_json::to_string(findings)?,
        Issues::Absent => "null".to_string(),
    };
    let date = snapshot.commit_date.format("%Y-%m-%d");
    Ok(match &snapshot.analyzed_at {
        Some(at) => format!(
            "{}\t{}\t{date}\t{at}\t{payload}",
            snapshot.sample, snapshot.commit_hash
        ),
        None => format!("{}\t{}\t{date}\t{payload}", snapshot.sample, snapshot.commit_hash),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
