use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::binding::BindingType;

/// Values that can be bound to a statement or read back from a row.
///
/// This enum is the single value representation used on both sides of the
/// driver boundary, so the binder, the shaper, and backends all speak the
/// same type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_int(&self) -> Option<&i64> {
        if let SqlValue::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        if let SqlValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(value) => Some(*value),
            SqlValue::Int(0) => Some(false),
            SqlValue::Int(1) => Some(true),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        if let SqlValue::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        if let SqlValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            SqlValue::Timestamp(value) => Some(*value),
            SqlValue::Text(s) => {
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                    return Some(dt);
                }
                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok()
            }
            _ => None,
        }
    }
}

/// One named parameter: a value plus an optional coercion tag.
///
/// A binding without a tag is passed to the driver with its native type.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub value: SqlValue,
    pub tag: Option<BindingType>,
}

/// Mapping from placeholder name to [`Binding`], immutable per call.
///
/// Backed by a `BTreeMap` so bind order (and debug dumps) are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    entries: BTreeMap<String, Binding>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bare value; the driver infers its type.
    pub fn insert(&mut self, name: impl Into<String>, value: SqlValue) -> &mut Self {
        self.entries.insert(name.into(), Binding { value, tag: None });
        self
    }

    /// Add a value with an explicit coercion tag.
    pub fn insert_tagged(
        &mut self,
        name: impl Into<String>,
        value: SqlValue,
        tag: BindingType,
    ) -> &mut Self {
        self.entries.insert(
            name.into(),
            Binding {
                value,
                tag: Some(tag),
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge with a per-statement override set; override values win on
    /// key collision.
    pub fn merged_with(&self, overrides: &Bindings) -> Bindings {
        let mut merged = self.clone();
        for (name, binding) in &overrides.entries {
            merged.entries.insert(name.clone(), binding.clone());
        }
        merged
    }
}

/// A statement and its optional per-statement bindings, identified inside a
/// batch by its position.
#[derive(Debug, Clone)]
pub struct BatchItem {
    /// The SQL statement text
    pub query: String,
    /// Per-statement bindings, merged over the batch-wide set
    pub bindings: Option<Bindings>,
}

impl BatchItem {
    pub fn new(query: impl Into<String>, bindings: Bindings) -> Self {
        Self {
            query: query.into(),
            bindings: Some(bindings),
        }
    }

    pub fn new_without_bindings(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            bindings: None,
        }
    }
}

/// A row from a query result.
///
/// Column names are shared across all rows of one result set.
#[derive(Debug, Clone, PartialEq)]
pub struct DbRow {
    columns: Arc<Vec<String>>,
    values: Vec<SqlValue>,
}

impl DbRow {
    pub fn new(columns: Arc<Vec<String>>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// The "no row" row: no columns, no values.
    pub fn empty() -> Self {
        Self {
            columns: Arc::new(Vec::new()),
            values: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Get a value by column name.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value by column index.
    pub fn get_by_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The caller's requested shape for a row-returning result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Every row, in result order
    #[default]
    All,
    /// First row only (empty row when the result is empty)
    Row,
    /// One column, projected by index, across all rows
    Column(usize),
    /// Column 0 as key, column 1 as value
    Pairs,
    /// Rows keyed by the value of the given column; later rows overwrite
    /// earlier ones on key collision
    Keyed(usize),
}

/// Exactly one outcome per top-level call: either a row shape or an
/// affected-row count, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    Rows(Vec<DbRow>),
    Row(DbRow),
    Column(Vec<SqlValue>),
    Pairs(BTreeMap<String, SqlValue>),
    Keyed(BTreeMap<String, DbRow>),
    Affected(u64),
}
