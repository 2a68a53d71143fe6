//! The execution engine: dispatch, deadlock retry, batch transactions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::binding::resolve_bindings;
use crate::classifier;
use crate::connection::DatabaseConnection;
use crate::error::SqlExecutorError;
use crate::shaper;
use crate::types::{BatchItem, Bindings, DbRow, ExecOutcome, FetchMode, SqlValue};

/// Every statement successfully executed in this process, across all engine
/// instances. Statements executed during an attempt that is later rolled
/// back and retried still count; the counter never rolls back.
static STATEMENTS_EXECUTED: AtomicU64 = AtomicU64::new(0);

/// Process-wide count of successfully executed statements.
pub fn total_statements_executed() -> u64 {
    STATEMENTS_EXECUTED.load(Ordering::Relaxed)
}

const DEFAULT_MAX_RUNTIME_SECS: u64 = 3600;
const DEFAULT_MAX_RETRIES: u32 = 5;
const DEFAULT_RETRY_SLEEP_SECS: u64 = 5;

/// Executes single statements and batches over one live connection,
/// retrying deadlocks and normalizing result shapes.
///
/// One logical caller per instance; the engine does no internal locking.
pub struct SqlExecutor<C: DatabaseConnection> {
    conn: C,
    max_runtime: Duration,
    max_retries: u32,
    retry_sleep: Duration,
    debug: bool,
}

/// One top-level unit of work: a single statement or an ordered batch.
#[derive(Clone, Copy)]
enum Payload<'a> {
    Single {
        query: &'a str,
        bindings: &'a Bindings,
    },
    Batch {
        items: &'a [BatchItem],
        shared: &'a Bindings,
    },
}

impl<C: DatabaseConnection> SqlExecutor<C> {
    /// Wrap a live connection handed out by a connection provider.
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            max_runtime: Duration::from_secs(DEFAULT_MAX_RUNTIME_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_sleep: Duration::from_secs(DEFAULT_RETRY_SLEEP_SECS),
            debug: false,
        }
    }

    /// Per-attempt wall-clock budget, in seconds.
    pub fn max_runtime(&self) -> u64 {
        self.max_runtime.as_secs()
    }

    pub fn set_max_runtime(&mut self, seconds: u64) -> &mut Self {
        self.max_runtime = Duration::from_secs(seconds);
        self
    }

    pub fn retries(&self) -> u32 {
        self.max_retries
    }

    /// Maximum deadlock retries; signed input is normalized by absolute
    /// value.
    pub fn set_retries(&mut self, tries: i32) -> &mut Self {
        self.max_retries = tries.unsigned_abs();
        self
    }

    pub fn retry_sleep(&self) -> u64 {
        self.retry_sleep.as_secs()
    }

    /// Inter-retry sleep in seconds; signed input is normalized by absolute
    /// value.
    pub fn set_retry_sleep(&mut self, seconds: i64) -> &mut Self {
        self.retry_sleep = Duration::from_secs(seconds.unsigned_abs());
        self
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// When set, statement text and the bound-parameter dump are echoed to
    /// the tracing sink around each execution.
    pub fn set_debug(&mut self, debug: bool) -> &mut Self {
        self.debug = debug;
        self
    }

    /// Process-wide executed-statement count; convenience over
    /// [`total_statements_executed`].
    pub fn statements_executed(&self) -> u64 {
        total_statements_executed()
    }

    /// Execute one parameterized statement and shape its result.
    ///
    /// Row-returning statements are shaped per `fetch`; everything else
    /// produces [`ExecOutcome::Affected`]. Deadlocks are retried up to the
    /// configured bound; all other errors propagate immediately.
    pub async fn execute(
        &mut self,
        query: &str,
        bindings: &Bindings,
        fetch: FetchMode,
    ) -> Result<ExecOutcome, SqlExecutorError> {
        self.run_with_retries(Payload::Single { query, bindings }, fetch)
            .await
    }

    /// Execute an ordered batch inside one transaction.
    ///
    /// `shared` bindings apply to every item, with per-item bindings winning
    /// on key collision. All-or-nothing: any failure rolls the whole batch
    /// back. The outcome is the total affected-row count.
    pub async fn execute_batch(
        &mut self,
        items: &[BatchItem],
        shared: &Bindings,
    ) -> Result<ExecOutcome, SqlExecutorError> {
        self.run_with_retries(Payload::Batch { items, shared }, FetchMode::All)
            .await
    }

    /// The retry state machine. Only deadlocks feed the retry edge; with
    /// `max_retries = n` a persistent deadlock sleeps exactly `n` times
    /// before failing with the dedicated exhaustion error.
    async fn run_with_retries(
        &mut self,
        payload: Payload<'_>,
        fetch: FetchMode,
    ) -> Result<ExecOutcome, SqlExecutorError> {
        let mut retries = 0u32;
        loop {
            let attempt = match payload {
                Payload::Single { query, bindings } => {
                    self.run_single(query, bindings, fetch).await
                }
                Payload::Batch { items, shared } => self.run_batch(items, shared).await,
            };
            match attempt {
                Ok(outcome) => return Ok(outcome),
                Err(err) if err.is_deadlock() => {
                    if retries >= self.max_retries {
                        return Err(SqlExecutorError::DeadlockExhausted {
                            attempts: self.max_retries,
                        });
                    }
                    retries += 1;
                    warn!(
                        attempt = retries,
                        max_retries = self.max_retries,
                        error = %err,
                        "deadlock detected, sleeping before retry"
                    );
                    sleep(self.retry_sleep).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn run_single(
        &mut self,
        query: &str,
        bindings: &Bindings,
        fetch: FetchMode,
    ) -> Result<ExecOutcome, SqlExecutorError> {
        let params = resolve_bindings(bindings);
        if self.debug {
            debug!(query, "executing statement");
        }
        let result = if classifier::returns_rows(query) {
            self.guarded_query(query, &params).await.map(|rows| {
                STATEMENTS_EXECUTED.fetch_add(1, Ordering::Relaxed);
                shaper::shape_rows(fetch, rows)
            })
        } else {
            self.guarded_execute(query, &params).await.map(|affected| {
                STATEMENTS_EXECUTED.fetch_add(1, Ordering::Relaxed);
                shaper::shape_affected(affected)
            })
        };
        // Dump on the failure path too, so diagnostics are flushed before
        // the error propagates.
        if self.debug {
            debug!(params = ?params, "bound parameters");
        }
        result
    }

    /// One batch attempt. The transaction is committed or rolled back before
    /// this returns, never left open.
    async fn run_batch(
        &mut self,
        items: &[BatchItem],
        shared: &Bindings,
    ) -> Result<ExecOutcome, SqlExecutorError> {
        self.conn.begin().await?;
        let attempt = match self.run_batch_items(items, shared).await {
            Ok(outcome) => self.conn.commit().await.map(|()| outcome),
            Err(err) => Err(err),
        };
        match attempt {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                // A failed commit leaves the transaction open just like a
                // failed item; roll back before the error (deadlock or not)
                // reaches the retry edge.
                if let Err(rollback_err) = self.conn.rollback().await {
                    warn!(error = %rollback_err, "rollback failed after batch error");
                }
                Err(err)
            }
        }
    }

    async fn run_batch_items(
        &mut self,
        items: &[BatchItem],
        shared: &Bindings,
    ) -> Result<ExecOutcome, SqlExecutorError> {
        let mut affected = 0u64;
        for (sequence, item) in items.iter().enumerate() {
            if classifier::returns_rows(&item.query) {
                warn!(
                    sequence,
                    "row-returning command inside a batch; its output is not fetched \
                     and may corrupt subsequent statement results"
                );
            }
            let merged = match &item.bindings {
                Some(own) => shared.merged_with(own),
                None => shared.clone(),
            };
            let params = resolve_bindings(&merged);
            if self.debug {
                debug!(sequence, query = %item.query, "executing batch statement");
            }
            let exec_result = self.guarded_execute(&item.query, &params).await;
            if self.debug {
                debug!(sequence, params = ?params, "bound parameters");
            }
            let count = exec_result
                .inspect_err(|err| warn!(sequence, error = %err, "batch statement failed"))?;
            STATEMENTS_EXECUTED.fetch_add(1, Ordering::Relaxed);
            affected += count;
        }
        Ok(ExecOutcome::Affected(affected))
    }

    /// Driver round-trip under the per-attempt runtime budget.
    async fn guarded_query(
        &mut self,
        query: &str,
        params: &[(String, SqlValue)],
    ) -> Result<Vec<DbRow>, SqlExecutorError> {
        match timeout(self.max_runtime, self.conn.query(query, params)).await {
            Ok(result) => result,
            Err(_) => Err(self.runtime_exceeded()),
        }
    }

    async fn guarded_execute(
        &mut self,
        query: &str,
        params: &[(String, SqlValue)],
    ) -> Result<u64, SqlExecutorError> {
        match timeout(self.max_runtime, self.conn.execute(query, params)).await {
            Ok(result) => result,
            Err(_) => Err(self.runtime_exceeded()),
        }
    }

    fn runtime_exceeded(&self) -> SqlExecutorError {
        SqlExecutorError::ExecutionError(format!(
            "statement exceeded max runtime of {}s",
            self.max_runtime.as_secs()
        ))
    }
}
