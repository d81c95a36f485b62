//! Tab-separated report encoding.
//!
//! Fields are escaped so each record stays on one line: `\` becomes `\\`,
//! and tab, newline and carriage return become `\t`, `\n` and `\r`.
//! Dates are `YYYY-MM-DD`; tags and opaque metadata are compact JSON.

use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;

use super::{COLUMNS, ReportError};
use crate::model::{LifecycleRecord, Resolution};

// ---------------------------------------------------------------------------
// Escaping
// ---------------------------------------------------------------------------

/// Escape a field value for a TSV cell.
#[must_use]
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// Reverse [`escape`]. Unknown escape sequences are kept verbatim.
#[must_use]
pub fn unescape(cell: &str) -> String {
    let mut out = String::with_capacity(cell.len());
    let mut chars = cell.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

fn opt_str(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn opt_date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

fn opt_json<T: Serialize>(value: Option<&T>) -> Result<String, ReportError> {
    match value {
        Some(v) => Ok(serde_json::to_string(v)?),
        None => Ok(String::new()),
    }
}

fn json_cell(value: &JsonValue) -> Result<String, ReportError> {
    if value.is_null() {
        Ok(String::new())
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

/// Render a record as unescaped cell values in [`COLUMNS`] order.
///
/// # Errors
///
/// Returns [`ReportError::Encode`] if a metadata value cannot be serialized.
pub fn record_fields(record: &LifecycleRecord) -> Result<Vec<String>, ReportError> {
    Ok(vec![
        record.key.clone(),
        record.sample.clone(),
        record.resolution().as_str().to_string(),
        opt_date(Some(record.open_date)),
        record.open_hash.clone(),
        opt_date(record.closed_date),
        opt_str(record.closed_hash.as_deref()),
        opt_str(record.author_close.as_deref()),
        opt_date(record.latest_open_date),
        opt_str(record.latest_open_hash.as_deref()),
        opt_str(record.author_latest_open.as_deref()),
        opt_date(record.next_commit_date),
        opt_str(record.next_commit_hash.as_deref()),
        opt_str(record.author_next_commit.as_deref()),
        record.fix_duration.map(|d| d.to_string()).unwrap_or_default(),
        opt_str(record.author.as_deref()),
        opt_str(record.severity.as_deref()),
        opt_str(record.rule.as_deref()),
        opt_str(record.issue_type.as_deref()),
        opt_str(record.effort.as_deref()),
        opt_str(record.debt.as_deref()),
        opt_str(record.message.as_deref()),
        serde_json::to_string(&record.tags)?,
        opt_str(record.component.as_deref()),
        record
            .quick_fix_available
            .map(|b| b.to_string())
            .unwrap_or_default(),
        opt_str(record.clean_code_attribute.as_deref()),
        opt_str(record.clean_code_attribute_category.as_deref()),
        opt_json(record.text_range.as_ref())?,
        json_cell(&record.impacts)?,
        json_cell(&record.flows)?,
        json_cell(&record.transitions)?,
        json_cell(&record.actions)?,
        json_cell(&record.comments)?,
    ])
}

/// Write a TSV report: header row, then one row per record.
///
/// # Errors
///
/// Returns [`ReportError`] if writing or encoding fails.
pub fn write_tsv<W: Write>(records: &[LifecycleRecord], out: W) -> Result<usize, ReportError> {
    let mut out = BufWriter::new(out);
    writeln!(out, "{}", COLUMNS.join("\t")).map_err(ReportError::Write)?;

    for record in records {
        let cells: Vec<String> = record_fields(record)?
            .iter()
            .map(|cell| escape(cell))
            .collect();
        writeln!(out, "{}", cells.join("\t")).map_err(ReportError::Write)?;
    }

    out.flush().map_err(ReportError::Write)?;
    debug!(rows = records.len(), "tsv report written");
    Ok(records.len())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// A TSV report as unescaped string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportTable {
    pub columns: Vec<String>,
    /// `(line_no, cells)`, 1-indexed line numbers.
    pub rows: Vec<(usize, Vec<String>)>,
}

impl ReportTable {
    /// Index of a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Split a TSV report into cells, checking the header and row widths.
///
/// # Errors
///
/// Returns [`ReportError::HeaderMismatch`] if the header is not exactly
/// [`COLUMNS`], or [`ReportError::InvalidRow`] for a row of the wrong width.
pub fn read_table(input: &str) -> Result<ReportTable, ReportError> {
    let mut lines = input.lines().enumerate();
    let header = lines.next().map(|(_, line)| line).unwrap_or_default();
    let columns: Vec<String> = header.split('\t').map(ToString::to_string).collect();
    if columns.iter().map(String::as_str).ne(COLUMNS.iter().copied()) {
        return Err(ReportError::HeaderMismatch {
            expected: COLUMNS.len(),
            found: columns.join(", "),
        });
    }

    let mut rows = Vec::new();
    for (i, line) in lines {
        let line_no = i + 1;
        if line.is_empty() {
            continue;
        }
        let cells: Vec<String> = line.split('\t').map(unescape).collect();
        if cells.len() != COLUMNS.len() {
            return Err(ReportError::InvalidRow {
                line_no,
                message: format!("expected {} fields, found {}", COLUMNS.len(), cells.len()),
            });
        }
        rows.push((line_no, cells));
    }

    Ok(ReportTable { columns, rows })
}

struct RowReader<'a> {
    line_no: usize,
    cells: &'a [String],
}

impl RowReader<'_> {
    fn invalid(&self, column: usize, detail: impl std::fmt::Display) -> ReportError {
        ReportError::InvalidRow {
            line_no: self.line_no,
            message: format!("column '{}': {detail}", COLUMNS[column]),
        }
    }

    fn text(&self, column: usize) -> String {
        self.cells[column].clone()
    }

    fn opt_text(&self, column: usize) -> Option<String> {
        Some(self.cells[column].clone()).filter(|s| !s.is_empty())
    }

    fn date(&self, column: usize) -> Result<NaiveDate, ReportError> {
        NaiveDate::parse_from_str(&self.cells[column], "%Y-%m-%d")
            .map_err(|e| self.invalid(column, e))
    }

    fn opt_date(&self, column: usize) -> Result<Option<NaiveDate>, ReportError> {
        if self.cells[column].is_empty() {
            Ok(None)
        } else {
            self.date(column).map(Some)
        }
    }

    fn opt_parse<T: std::str::FromStr>(&self, column: usize) -> Result<Option<T>, ReportError>
    where
        T::Err: std::fmt::Display,
    {
        if self.cells[column].is_empty() {
            return Ok(None);
        }
        self.cells[column]
            .parse()
            .map(Some)
            .map_err(|e| self.invalid(column, e))
    }

    fn opt_json<T: DeserializeOwned>(&self, column: usize) -> Result<Option<T>, ReportError> {
        if self.cells[column].is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&self.cells[column])
            .map(Some)
            .map_err(|e| self.invalid(column, e))
    }

    fn json(&self, column: usize) -> Result<JsonValue, ReportError> {
        Ok(self.opt_json(column)?.unwrap_or(JsonValue::Null))
    }
}

/// Rebuild a record from one row of cells in [`COLUMNS`] order.
///
/// # Errors
///
/// Returns [`ReportError::InvalidRow`] if a cell does not parse.
pub fn parse_row(line_no: usize, cells: &[String]) -> Result<LifecycleRecord, ReportError> {
    let row = RowReader { line_no, cells };
    if cells.len() != COLUMNS.len() {
        return Err(ReportError::InvalidRow {
            line_no,
            message: format!("expected {} fields, found {}", COLUMNS.len(), cells.len()),
        });
    }

    let resolution: Resolution = cells[2].parse().map_err(|e: String| row.invalid(2, e))?;

    let record = LifecycleRecord {
        key: row.text(0),
        sample: row.text(1),
        open_date: row.date(3)?,
        open_hash: row.text(4),
        closed_date: row.opt_date(5)?,
        closed_hash: row.opt_text(6),
        author_close: row.opt_text(7),
        latest_open_date: row.opt_date(8)?,
        latest_open_hash: row.opt_text(9),
        author_latest_open: row.opt_text(10),
        next_commit_date: row.opt_date(11)?,
        next_commit_hash: row.opt_text(12),
        author_next_commit: row.opt_text(13),
        fix_duration: row.opt_parse(14)?,
        author: row.opt_text(15),
        severity: row.opt_text(16),
        rule: row.opt_text(17),
        issue_type: row.opt_text(18),
        effort: row.opt_text(19),
        debt: row.opt_text(20),
        message: row.opt_text(21),
        tags: row.opt_json(22)?.unwrap_or_default(),
        component: row.opt_text(23),
        quick_fix_available: row.opt_parse(24)?,
        clean_code_attribute: row.opt_text(25),
        clean_code_attribute_category: row.opt_text(26),
        text_range: row.opt_json(27)?,
        impacts: row.json(28)?,
        flows: row.json(29)?,
        transitions: row.json(30)?,
        actions: row.json(31)?,
        comments: row.json(32)?,
    };

    if record.resolution() != resolution {
        return Err(row.invalid(
            2,
            format!("'{resolution}' contradicts the row's dates ({})", record.resolution()),
        ));
    }
    Ok(record)
}

/// Parse a TSV report back into records.
///
/// # Errors
///
/// Returns [`ReportError::HeaderMismatch`] for a foreign header and
/// [`ReportError::InvalidRow`] for the first row that does not parse.
pub fn read_report(input: &str) -> Result<Vec<LifecycleRecord>, ReportError> {
    let table = read_table(input)?;
    table
        .rows
        .iter()
        .map(|(line_no, cells)| parse_row(*line_no, cells))
        .collect()
}

/// Read a TSV report file into a [`ReportTable`].
///
/// # Errors
///
/// Returns [`ReportError::Read`] if the file cannot be read, otherwise as
/// [`read_table`].
pub fn read_table_file(path: &Path) -> Result<ReportTable, ReportError> {
    let content = std::fs::read_to_string(path).map_err(ReportError::Read)?;
    read_table(&content)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
