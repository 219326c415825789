//! In-memory connector for exercising the provisioners without a server.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{DbError, DbResult};
use crate::session::{ConnectParams, Connector, Session, Statement};

#[derive(Default)]
struct State {
    role_count: i64,
    tables: Vec<String>,
    connect_failure: Option<String>,
    statement_failure: Option<(String, String)>,
    close_fails: bool,
    connections: Vec<ConnectParams>,
    statements: Vec<Statement>,
    closed: usize,
}

/// Scripted connector. Every session it opens shares one recorded history.
#[derive(Clone, Default)]
pub struct FakeConnector {
    state: Arc<Mutex<State>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value returned by any count query.
    pub fn with_role_count(self, count: i64) -> Self {
        self.state.lock().unwrap().role_count = count;
        self
    }

    /// Rows returned by any column query.
    pub fn with_tables<I, S>(self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.lock().unwrap().tables = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn failing_connect(self, message: impl Into<String>) -> Self {
        self.state.lock().unwrap().connect_failure = Some(message.into());
        self
    }

    /// Fail every statement whose SQL starts with `prefix`.
    pub fn failing_statement(self, prefix: impl Into<String>, message: impl Into<String>) -> Self {
        self.state.lock().unwrap().statement_failure = Some((prefix.into(), message.into()));
        self
    }

    pub fn failing_close(self) -> Self {
        self.state.lock().unwrap().close_fails = true;
        self
    }

    pub fn connections(&self) -> Vec<ConnectParams> {
        self.state.lock().unwrap().connections.clone()
    }

    /// SQL text of every statement issued, across all sessions, in order.
    pub fn statements(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .statements
            .iter()
            .map(|s| s.sql.clone())
            .collect()
    }

    pub fn opened(&self) -> usize {
        self.state.lock().unwrap().connections.len()
    }

    pub fn closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, params: &ConnectParams) -> DbResult<Box<dyn Session>> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = &state.connect_failure {
            return Err(DbError::Backend(message.clone()));
        }
        state.connections.push(params.clone());
        Ok(Box::new(FakeSession {
            state: self.state.clone(),
        }))
    }
}

struct FakeSession {
    state: Arc<Mutex<State>>,
}

impl FakeSession {
    fn record(&self, statement: &Statement) -> DbResult<()> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(statement.clone());
        match &state.statement_failure {
            Some((prefix, message)) if statement.sql.starts_with(prefix.as_str()) => {
                Err(DbError::Backend(message.clone()))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn execute(&mut self, statement: &Statement) -> DbResult<()> {
        self.record(statement)
    }

    async fn fetch_count(&mut self, statement: &Statement) -> DbResult<i64> {
        self.record(statement)?;
        Ok(self.state.lock().unwrap().role_count)
    }

    async fn fetch_column(&mut self, statement: &Statement) -> DbResult<Vec<String>> {
        self.record(statement)?;
        Ok(self.state.lock().unwrap().tables.clone())
    }

    async fn close(self: Box<Self>) -> DbResult<()> {
        let mut state = self.state.lock().unwrap();
        state.closed += 1;
        if state.close_fails {
            return Err(DbError::Backend("connection reset during close".to_string()));
        }
        Ok(())
    }
}
