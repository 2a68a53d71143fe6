//! SQLite connection provider and driver implementation over deadpool.

use std::sync::Arc;

use async_trait::async_trait;
use deadpool_sqlite::{
    Config as DeadpoolSqliteConfig, Object as SqliteObject, Pool as SqlitePool, Runtime, rusqlite,
};

use crate::connection::DatabaseConnection;
use crate::error::SqlExecutorError;
use crate::types::{DbRow, SqlValue};

/// Connection provider backed by a deadpool-sqlite pool.
///
/// Hands out one live [`SqliteConnection`] per engine; the pooling strategy
/// itself is not part of the execution core.
#[derive(Clone)]
pub struct SqliteConnectionProvider {
    pool: SqlitePool,
}

impl SqliteConnectionProvider {
    /// Open (or create) the database at `db_path` and build the pool.
    pub async fn new(db_path: impl Into<String>) -> Result<Self, SqlExecutorError> {
        let cfg = DeadpoolSqliteConfig::new(db_path.into());
        let pool = cfg.create_pool(Runtime::Tokio1).map_err(|e| {
            SqlExecutorError::ConnectionError(format!("failed to create SQLite pool: {e}"))
        })?;

        {
            let conn = pool
                .get()
                .await
                .map_err(SqlExecutorError::PoolErrorSqlite)?;
            conn.interact(|conn| {
                conn.execute_batch("PRAGMA journal_mode = WAL;")
                    .map_err(SqlExecutorError::SqliteError)
            })
            .await??;
        }

        Ok(Self { pool })
    }

    /// A live, ready-to-use connection.
    pub async fn connection(&self) -> Result<SqliteConnection, SqlExecutorError> {
        let obj = self
            .pool
            .get()
            .await
            .map_err(SqlExecutorError::PoolErrorSqlite)?;
        Ok(SqliteConnection { obj })
    }
}

/// One pooled SQLite connection implementing the driver seam.
pub struct SqliteConnection {
    obj: SqliteObject,
}

#[async_trait]
impl DatabaseConnection for SqliteConnection {
    async fn query(
        &mut self,
        sql: &str,
        params: &[(String, SqlValue)],
    ) -> Result<Vec<DbRow>, SqlExecutorError> {
        let sql = sql.to_owned();
        let params = params.to_vec();
        self.obj
            .interact(move |conn| -> Result<Vec<DbRow>, SqlExecutorError> {
                let mut stmt = conn.prepare(&sql)?;
                bind_named(&mut stmt, &params)?;
                collect_rows(&mut stmt)
            })
            .await?
    }

    async fn execute(
        &mut self,
        sql: &str,
        params: &[(String, SqlValue)],
    ) -> Result<u64, SqlExecutorError> {
        let sql = sql.to_owned();
        let params = params.to_vec();
        self.obj
            .interact(move |conn| -> Result<u64, SqlExecutorError> {
                let mut stmt = conn.prepare(&sql)?;
                bind_named(&mut stmt, &params)?;
                if stmt.column_count() > 0 {
                    // rusqlite refuses execute() on row-returning statements;
                    // step such a statement to completion without surfacing
                    // rows (the batch misuse case).
                    let mut rows = stmt.raw_query();
                    while rows.next()?.is_some() {}
                    Ok(0)
                } else {
                    Ok(stmt.raw_execute()? as u64)
                }
            })
            .await?
    }

    async fn begin(&mut self) -> Result<(), SqlExecutorError> {
        self.run_batch_sql("BEGIN DEFERRED;").await
    }

    async fn commit(&mut self) -> Result<(), SqlExecutorError> {
        self.run_batch_sql("COMMIT;").await
    }

    async fn rollback(&mut self) -> Result<(), SqlExecutorError> {
        self.run_batch_sql("ROLLBACK;").await
    }
}

impl SqliteConnection {
    /// Transaction control runs as plain SQL so one transaction spans
    /// multiple interact closures on the same pooled connection.
    async fn run_batch_sql(&self, sql: &'static str) -> Result<(), SqlExecutorError> {
        self.obj
            .interact(move |conn| {
                conn.execute_batch(sql)
                    .map_err(SqlExecutorError::SqliteError)
            })
            .await?
    }
}

/// Bind named parameters through the raw statement API.
///
/// Names are normalized to the `:` prefix unless the caller already used a
/// driver prefix. Names with no matching placeholder in this statement are
/// skipped, so a shared batch binding set can carry names only some items
/// use.
fn bind_named(
    stmt: &mut rusqlite::Statement<'_>,
    params: &[(String, SqlValue)],
) -> Result<(), SqlExecutorError> {
    for (name, value) in params {
        let key = if name.starts_with(':') || name.starts_with('@') || name.starts_with('$') {
            name.clone()
        } else {
            format!(":{name}")
        };
        if let Some(index) = stmt.parameter_index(&key)? {
            stmt.raw_bind_parameter(index, to_sqlite_value(value))?;
        }
    }
    Ok(())
}

/// Map the middleware value union to SQLite storage classes.
fn to_sqlite_value(value: &SqlValue) -> rusqlite::types::Value {
    match value {
        SqlValue::Int(i) => rusqlite::types::Value::Integer(*i),
        SqlValue::Float(f) => rusqlite::types::Value::Real(*f),
        SqlValue::Text(s) => rusqlite::types::Value::Text(s.clone()),
        SqlValue::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
        SqlValue::Timestamp(dt) => {
            rusqlite::types::Value::Text(dt.format("%F %T%.f").to_string())
        }
        SqlValue::Null => rusqlite::types::Value::Null,
        SqlValue::JSON(j) => rusqlite::types::Value::Text(j.to_string()),
        SqlValue::Blob(bytes) => rusqlite::types::Value::Blob(bytes.clone()),
    }
}

fn extract_value(row: &rusqlite::Row, idx: usize) -> Result<SqlValue, SqlExecutorError> {
    match row.get_ref(idx) {
        Err(e) => Err(SqlExecutorError::SqliteError(e)),
        Ok(rusqlite::types::ValueRef::Null) => Ok(SqlValue::Null),
        Ok(rusqlite::types::ValueRef::Integer(i)) => Ok(SqlValue::Int(i)),
        Ok(rusqlite::types::ValueRef::Real(f)) => Ok(SqlValue::Float(f)),
        Ok(rusqlite::types::ValueRef::Text(bytes)) => {
            Ok(SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()))
        }
        Ok(rusqlite::types::ValueRef::Blob(b)) => Ok(SqlValue::Blob(b.to_vec())),
    }
}

fn collect_rows(stmt: &mut rusqlite::Statement<'_>) -> Result<Vec<DbRow>, SqlExecutorError> {
    let columns: Arc<Vec<String>> =
        Arc::new(stmt.column_names().iter().map(|s| s.to_string()).collect());
    let column_count = columns.len();

    let mut rows_iter = stmt.raw_query();
    let mut rows = Vec::new();
    while let Some(row) = rows_iter.next()? {
        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            values.push(extract_value(row, idx)?);
        }
        rows.push(DbRow::new(columns.clone(), values));
    }
    Ok(rows)
}
