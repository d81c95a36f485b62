//! Audit of a written report.
//!
//! A key shared by more than one row is expected when several samples report
//! the same rule on the same component, and suspicious otherwise. The audit
//! lists every such key with the columns whose values differ between its
//! rows (`sample` aside), plus the distinct samples in the report.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::tsv::ReportTable;

/// A key that appears in more than one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateKey {
    pub key: String,
    /// Line numbers of the rows sharing the key.
    pub lines: Vec<usize>,
    /// Samples of those rows, in row order, deduplicated.
    pub samples: Vec<String>,
    /// Column name to its distinct values, for columns that disagree.
    pub differing: BTreeMap<String, Vec<String>>,
}

/// Result of [`audit`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub rows: usize,
    pub duplicates: Vec<DuplicateKey>,
    /// Distinct samples, in order of first appearance.
    pub samples: Vec<String>,
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

/// Audit a report table.
#[must_use]
pub fn audit(table: &ReportTable) -> AuditReport {
    let key_col = table.column("key").unwrap_or(0);
    let sample_col = table.column("sample").unwrap_or(1);

    let mut samples = Vec::new();
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();

    for (row_idx, (_, cells)) in table.rows.iter().enumerate() {
        push_unique(&mut samples, &cells[sample_col]);
        let key = cells[key_col].as_str();
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push((key.to_string(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row_idx);
    }

    let duplicates = groups
        .into_iter()
        .filter(|(_, rows)| rows.len() > 1)
        .map(|(key, rows)| {
            let mut dup_samples = Vec::new();
            for &row in &rows {
                push_unique(&mut dup_samples, &table.rows[row].1[sample_col]);
            }

            let mut differing = BTreeMap::new();
            for (col, name) in table.columns.iter().enumerate() {
                if col == sample_col {
                    continue;
                }
                let mut values = Vec::new();
                for &row in &rows {
                    push_unique(&mut values, &table.rows[row].1[col]);
                }
                if values.len() > 1 {
                    differing.insert(name.clone(), values);
                }
            }

            DuplicateKey {
                key,
                lines: rows.iter().map(|&row| table.rows[row].0).collect(),
                samples: dup_samples,
                differing,
            }
        })
        .collect();

    AuditReport {
        rows: table.rows.len(),
        duplicates,
        samples,
    }
}
