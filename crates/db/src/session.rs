//! Connection seam between the provisioners and a database server.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use pgboot_kernel::settings::SslMode;

use crate::error::DbResult;

/// SQL text plus positional text binds (`$1`, `$2`, ...).
///
/// Statements without binds are sent as-is and may hold several commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub binds: Vec<String>,
}

impl Statement {
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binds: Vec::new(),
        }
    }

    pub fn bind(mut self, value: impl Into<String>) -> Self {
        self.binds.push(value.into());
        self
    }
}

/// Everything needed to open one connection.
#[derive(Clone)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub ssl_mode: SslMode,
    pub connect_timeout: Option<Duration>,
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &"<redacted>")
            .field("password", &"<redacted>")
            .field("ssl_mode", &self.ssl_mode)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Host-level connection options shared by both provisioners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    pub ssl_mode: SslMode,
    pub connect_timeout: Option<Duration>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            ssl_mode: SslMode::Require,
            connect_timeout: None,
        }
    }
}

/// Opens sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, params: &ConnectParams) -> DbResult<Box<dyn Session>>;
}

/// One open, autocommitting connection.
///
/// Every statement commits on its own; there is no transaction spanning
/// calls.
#[async_trait]
pub trait Session: Send {
    async fn execute(&mut self, statement: &Statement) -> DbResult<()>;

    /// Run a query whose first row's first column is a count.
    async fn fetch_count(&mut self, statement: &Statement) -> DbResult<i64>;

    /// Run a query and return the first column of every row as text.
    async fn fetch_column(&mut self, statement: &Statement) -> DbResult<Vec<String>>;

    async fn close(self: Box<Self>) -> DbResult<()>;
}

/// Close a session, logging rather than propagating a failure to close.
pub(crate) async fn release(session: Box<dyn Session>, phase: &'static str) {
    if let Err(err) = session.close().await {
        tracing::warn!(phase, error = %err, "failed to close database connection");
    }
}
