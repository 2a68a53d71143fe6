//! Query-execution layer between application code and a SQL driver:
//! typed named-parameter binding, transparent deadlock retry, all-or-nothing
//! batch transactions, and result shaping per a requested fetch mode.

pub mod binding;
pub mod classifier;
pub mod connection;
pub mod engine;
pub mod error;
mod facade;
pub mod shaper;
pub mod sqlite;
pub mod types;

pub use binding::BindingType;
pub use connection::DatabaseConnection;
pub use engine::{SqlExecutor, total_statements_executed};
pub use error::SqlExecutorError;
pub use sqlite::{SqliteConnection, SqliteConnectionProvider};
pub use types::{BatchItem, Binding, Bindings, DbRow, ExecOutcome, FetchMode, SqlValue};
