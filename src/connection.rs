//! The driver seam: one live connection behind an async trait.

use async_trait::async_trait;

use crate::error::SqlExecutorError;
use crate::types::{DbRow, SqlValue};

/// A live, ready-to-use database handle.
///
/// The engine owns one for the lifetime of a call and drives it statement by
/// statement. Backends implement the five operations; transaction state is
/// the engine's responsibility (a batch is always committed or rolled back
/// before control returns).
#[async_trait]
pub trait DatabaseConnection: Send {
    /// Run a row-returning command with named parameters.
    async fn query(
        &mut self,
        sql: &str,
        params: &[(String, SqlValue)],
    ) -> Result<Vec<DbRow>, SqlExecutorError>;

    /// Run a row-affecting command with named parameters, returning the
    /// affected-row count.
    async fn execute(
        &mut self,
        sql: &str,
        params: &[(String, SqlValue)],
    ) -> Result<u64, SqlExecutorError>;

    /// Open a transaction.
    async fn begin(&mut self) -> Result<(), SqlExecutorError>;

    /// Commit the open transaction.
    async fn commit(&mut self) -> Result<(), SqlExecutorError>;

    /// Roll back the open transaction.
    async fn rollback(&mut self) -> Result<(), SqlExecutorError>;
}
