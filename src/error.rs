use deadpool_sqlite::rusqlite;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlExecutorError {
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error(transparent)]
    PoolErrorSqlite(#[from] deadpool::managed::PoolError<rusqlite::Error>),

    /// Transient serialization conflict reported by the driver; the only
    /// error kind the engine retries.
    #[error("Deadlock detected: {0}")]
    Deadlock(String),

    /// Every retry attempt hit a deadlock.
    #[error("Deadlock encountered for set maximum of {attempts} tries")]
    DeadlockExhausted { attempts: u32 },

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),
}

impl SqlExecutorError {
    /// Whether this error feeds the retry edge of the engine.
    ///
    /// SQLite reports lock conflicts as BUSY/LOCKED result codes, its
    /// analogue of SQLSTATE 40001. Backends without a native code can raise
    /// [`SqlExecutorError::Deadlock`] directly.
    pub fn is_deadlock(&self) -> bool {
        match self {
            SqlExecutorError::Deadlock(_) => true,
            SqlExecutorError::SqliteError(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

impl From<deadpool_sqlite::InteractError> for SqlExecutorError {
    fn from(err: deadpool_sqlite::InteractError) -> Self {
        SqlExecutorError::ConnectionError(format!("SQLite interact error: {err}"))
    }
}
