//! Result shaping: raw rows to the caller's requested fetch mode.

use std::collections::BTreeMap;

use crate::types::{DbRow, ExecOutcome, FetchMode, SqlValue};

/// Shape a row-returning command's result per the fetch mode.
pub fn shape_rows(mode: FetchMode, rows: Vec<DbRow>) -> ExecOutcome {
    match mode {
        FetchMode::All => ExecOutcome::Rows(rows),
        FetchMode::Row => {
            ExecOutcome::Row(rows.into_iter().next().unwrap_or_else(DbRow::empty))
        }
        FetchMode::Column(index) => ExecOutcome::Column(
            rows.iter()
                .map(|row| row.get_by_index(index).cloned().unwrap_or(SqlValue::Null))
                .collect(),
        ),
        FetchMode::Pairs => {
            let mut pairs = BTreeMap::new();
            for row in &rows {
                let key = key_string(row.get_by_index(0).unwrap_or(&SqlValue::Null));
                let value = row.get_by_index(1).cloned().unwrap_or(SqlValue::Null);
                pairs.insert(key, value);
            }
            ExecOutcome::Pairs(pairs)
        }
        FetchMode::Keyed(index) => {
            let mut keyed = BTreeMap::new();
            for row in rows {
                let key = key_string(row.get_by_index(index).unwrap_or(&SqlValue::Null));
                keyed.insert(key, row);
            }
            ExecOutcome::Keyed(keyed)
        }
    }
}

/// Shape a row-affecting command's result.
pub fn shape_affected(count: u64) -> ExecOutcome {
    ExecOutcome::Affected(count)
}

/// Render a value as a map key.
///
/// Map keys must be ordered and hashable, which rules out using the value
/// union directly (it holds floats), so key columns are rendered to strings.
pub fn key_string(value: &SqlValue) -> String {
    match value {
        SqlValue::Text(s) => s.clone(),
        SqlValue::Int(i) => i.to_string(),
        SqlValue::Float(f) => f.to_string(),
        SqlValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        SqlValue::Timestamp(dt) => dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        SqlValue::Null => String::new(),
        SqlValue::JSON(j) => j.to_string(),
        SqlValue::Blob(b) => String::from_utf8_lossy(b).into_owned(),
    }
}
