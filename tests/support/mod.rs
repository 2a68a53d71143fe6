use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sql_executor::{DatabaseConnection, DbRow, SqlExecutorError, SqlValue};

/// Observable state of a scripted connection.
#[derive(Default)]
pub struct ScriptState {
    pub responses: VecDeque<Result<u64, SqlExecutorError>>,
    pub commit_responses: VecDeque<Result<(), SqlExecutorError>>,
    pub executed: Vec<String>,
    pub begins: usize,
    pub commits: usize,
    pub rollbacks: usize,
}

/// Connection double driven by a prepared response script.
///
/// Each query/execute call pops the next response (default `Ok(0)` when the
/// script is exhausted); transaction calls are counted. State is shared so
/// tests keep a handle after the engine takes ownership.
#[derive(Clone, Default)]
pub struct ScriptedConn {
    pub state: Arc<Mutex<ScriptState>>,
}

impl ScriptedConn {
    pub fn new(responses: Vec<Result<u64, SqlExecutorError>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                responses: responses.into(),
                ..ScriptState::default()
            })),
        }
    }

    /// Script the outcome of upcoming commit calls (default `Ok`).
    #[allow(dead_code)]
    pub fn script_commits(&self, responses: Vec<Result<(), SqlExecutorError>>) {
        self.state.lock().unwrap().commit_responses = responses.into();
    }

    fn next_response(&self, sql: &str) -> Result<u64, SqlExecutorError> {
        let mut state = self.state.lock().unwrap();
        state.executed.push(sql.to_string());
        state.responses.pop_front().unwrap_or(Ok(0))
    }
}

#[async_trait]
impl DatabaseConnection for ScriptedConn {
    async fn query(
        &mut self,
        sql: &str,
        _params: &[(String, SqlValue)],
    ) -> Result<Vec<DbRow>, SqlExecutorError> {
        self.next_response(sql).map(|_| Vec::new())
    }

    async fn execute(
        &mut self,
        sql: &str,
        _params: &[(String, SqlValue)],
    ) -> Result<u64, SqlExecutorError> {
        self.next_response(sql)
    }

    async fn begin(&mut self) -> Result<(), SqlExecutorError> {
        self.state.lock().unwrap().begins += 1;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SqlExecutorError> {
        let mut state = self.state.lock().unwrap();
        state.commits += 1;
        state.commit_responses.pop_front().unwrap_or(Ok(()))
    }

    async fn rollback(&mut self) -> Result<(), SqlExecutorError> {
        self.state.lock().unwrap().rollbacks += 1;
        Ok(())
    }
}
