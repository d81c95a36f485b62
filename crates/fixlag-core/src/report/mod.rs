//! Report emitter.
//!
//! One flat row per [`LifecycleRecord`], in a stable column order. Two
//! encodings are supported:
//!
//! - [`ReportFormat::Tsv`]: a header row, then tab-separated escaped fields.
//!   Missing values are empty strings. Readable back with [`read_report`].
//! - [`ReportFormat::Jsonl`]: one JSON object per record, missing values are
//!   `null`.
//!
//! The emitter carries no business logic: every value comes from the record,
//! except `resolution`, which is derived via [`LifecycleRecord::resolution`].

pub mod audit;
pub mod jsonl;
pub mod tsv;

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::model::LifecycleRecord;

pub use audit::{AuditReport, DuplicateKey, audit};
pub use tsv::{ReportTable, read_report, read_table, read_table_file};

/// Column names, in emitted order.
pub const COLUMNS: [&str; 33] = [
    "key",
    "sample",
    "resolution",
    "open_date",
    "open_hash",
    "closed_date",
    "closed_hash",
    "author_close",
    "latest_open_date",
    "latest_open_hash",
    "author_latest_open",
    "next_commit_date",
    "next_commit_hash",
    "author_next_commit",
    "fix_duration",
    "author",
    "severity",
    "rule",
    "type",
    "effort",
    "debt",
    "message",
    "tags",
    "component",
    "quick_fix_available",
    "clean_code_attribute",
    "clean_code_attribute_category",
    "text_range",
    "impacts",
    "flows",
    "transitions",
    "actions",
    "comments",
];

/// Report encodings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Tsv,
    Jsonl,
}

impl ReportFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tsv => "tsv",
            Self::Jsonl => "jsonl",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tsv" => Ok(Self::Tsv),
            "jsonl" | "ndjson" => Ok(Self::Jsonl),
            other => Err(format!("unknown report format '{other}' (expected tsv or jsonl)")),
        }
    }
}

/// Report read/write failures.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write report: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to read report: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    /// The header row is not the current column list.
    #[error("report header does not match: expected {expected} columns, found [{found}]")]
    HeaderMismatch { expected: usize, found: String },

    #[error("line {line_no}: {message}")]
    InvalidRow { line_no: usize, message: String },
}

impl ReportError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Write(_) | Self::Encode(_) => ErrorCode::ReportWriteFailed,
            Self::Read(_) => ErrorCode::InputUnreadable,
            Self::HeaderMismatch { .. } => ErrorCode::ReportHeaderMismatch,
            Self::InvalidRow { .. } => ErrorCode::ReportRowInvalid,
        }
    }
}

/// Write `records` in `format`, returning the number of rows written.
///
/// # Errors
///
/// Returns [`ReportError`] if writing or encoding fails.
pub fn write_report<W: Write>(
    records: &[LifecycleRecord],
    format: ReportFormat,
    out: W,
) -> Result<usize, ReportError> {
    match format {
        ReportFormat::Tsv => tsv::write_tsv(records, out),
        ReportFormat::Jsonl => jsonl::write_jsonl(records, out),
    }
}
