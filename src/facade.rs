//! Semantic convenience operations over the engine.
//!
//! Each validates the statement's leading keyword before any driver
//! interaction and returns an empty container (never an error) when the
//! shaped result is absent.

use std::collections::BTreeMap;

use crate::classifier;
use crate::connection::DatabaseConnection;
use crate::engine::SqlExecutor;
use crate::error::SqlExecutorError;
use crate::types::{Bindings, DbRow, ExecOutcome, FetchMode, SqlValue};

impl<C: DatabaseConnection> SqlExecutor<C> {
    /// All rows of a SELECT.
    pub async fn select_all(
        &mut self,
        query: &str,
        bindings: &Bindings,
    ) -> Result<Vec<DbRow>, SqlExecutorError> {
        ensure_select(query)?;
        match self.execute(query, bindings, FetchMode::All).await? {
            ExecOutcome::Rows(rows) => Ok(rows),
            _ => Ok(Vec::new()),
        }
    }

    /// First row of a SELECT; an empty row when it matches nothing.
    pub async fn select_row(
        &mut self,
        query: &str,
        bindings: &Bindings,
    ) -> Result<DbRow, SqlExecutorError> {
        ensure_select(query)?;
        match self.execute(query, bindings, FetchMode::Row).await? {
            ExecOutcome::Row(row) => Ok(row),
            _ => Ok(DbRow::empty()),
        }
    }

    /// One column of a SELECT, projected by index, across all rows.
    pub async fn select_column(
        &mut self,
        query: &str,
        bindings: &Bindings,
        column: usize,
    ) -> Result<Vec<SqlValue>, SqlExecutorError> {
        ensure_select(query)?;
        match self.execute(query, bindings, FetchMode::Column(column)).await? {
            ExecOutcome::Column(values) => Ok(values),
            _ => Ok(Vec::new()),
        }
    }

    /// First column as key, second as value, across all rows of a SELECT.
    pub async fn select_pair(
        &mut self,
        query: &str,
        bindings: &Bindings,
    ) -> Result<BTreeMap<String, SqlValue>, SqlExecutorError> {
        ensure_select(query)?;
        match self.execute(query, bindings, FetchMode::Pairs).await? {
            ExecOutcome::Pairs(pairs) => Ok(pairs),
            _ => Ok(BTreeMap::new()),
        }
    }

    /// Rows of a SELECT keyed by the unique values of one column.
    pub async fn select_unique(
        &mut self,
        query: &str,
        bindings: &Bindings,
        column: usize,
    ) -> Result<BTreeMap<String, DbRow>, SqlExecutorError> {
        ensure_select(query)?;
        match self.execute(query, bindings, FetchMode::Keyed(column)).await? {
            ExecOutcome::Keyed(keyed) => Ok(keyed),
            _ => Ok(BTreeMap::new()),
        }
    }

    /// Scalar result of a SELECT COUNT; 0 when absent.
    pub async fn count(
        &mut self,
        query: &str,
        bindings: &Bindings,
    ) -> Result<i64, SqlExecutorError> {
        if !classifier::is_select_count(query) {
            return Err(SqlExecutorError::Usage(
                "query is not a SELECT COUNT".to_string(),
            ));
        }
        match self.execute(query, bindings, FetchMode::Column(0)).await? {
            ExecOutcome::Column(values) => Ok(values.first().map_or(0, scalar_count)),
            _ => Ok(0),
        }
    }

    /// Presence test: true iff the SELECT returned at least one row.
    pub async fn check(
        &mut self,
        query: &str,
        bindings: &Bindings,
    ) -> Result<bool, SqlExecutorError> {
        ensure_select(query)?;
        match self.execute(query, bindings, FetchMode::All).await? {
            ExecOutcome::Rows(rows) => Ok(!rows.is_empty()),
            _ => Ok(false),
        }
    }
}

fn ensure_select(query: &str) -> Result<(), SqlExecutorError> {
    if classifier::is_select(query) {
        Ok(())
    } else {
        Err(SqlExecutorError::Usage("query is not a SELECT".to_string()))
    }
}

fn scalar_count(value: &SqlValue) -> i64 {
    match value {
        SqlValue::Int(i) => *i,
        SqlValue::Text(s) => s.trim().parse().unwrap_or(0),
        SqlValue::Float(f) => *f as i64,
        _ => 0,
    }
}
