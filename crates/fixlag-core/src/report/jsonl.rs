//! JSON Lines report encoding: one object per record, `null` for missing
//! values.

use std::io::{BufWriter, Write};

use serde::Serialize;
use tracing::debug;

use super::ReportError;
use crate::model::{LifecycleRecord, Resolution};

#[derive(Debug, Serialize)]
struct JsonlRow<'a> {
    resolution: Resolution,
    #[serde(flatten)]
    record: &'a LifecycleRecord,
}

/// Write one JSON object per record.
///
/// # Errors
///
/// Returns [`ReportError`] if writing or encoding fails.
pub fn write_jsonl<W: Write>(records: &[LifecycleRecord], out: W) -> Result<usize, ReportError> {
    let mut out = BufWriter::new(out);
    for record in records {
        let row = JsonlRow {
            resolution: record.resolution(),
            record,
        };
        serde_json::to_writer(&mut out, &row)?;
        out.write_all(b"\n").map_err(ReportError::Write)?;
    }
    out.flush().map_err(ReportError::Write)?;
    debug!(rows = records.len(), "jsonl report written");
    Ok(records.len())
}
