//! PostgreSQL implementation of the connection seam.

use async_trait::async_trait;
use pgboot_kernel::settings::SslMode;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::{Connection, Executor};

use crate::error::{DbError, DbResult};
use crate::session::{ConnectParams, Connector, Session, Statement};

/// Opens one dedicated connection per call. No pooling; a bootstrap phase
/// uses exactly one connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

impl PgConnector {
    fn options(params: &ConnectParams) -> PgConnectOptions {
        let ssl_mode = match params.ssl_mode {
            SslMode::Disable => PgSslMode::Disable,
            SslMode::Prefer => PgSslMode::Prefer,
            SslMode::Require => PgSslMode::Require,
        };

        PgConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .database(&params.database)
            .username(&params.username)
            .password(&params.password)
            .ssl_mode(ssl_mode)
    }
}

#[async_trait]
impl Connector for PgConnector {
    async fn connect(&self, params: &ConnectParams) -> DbResult<Box<dyn Session>> {
        // Credentials stay out of the log; the admin username is a secret.
        tracing::info!(
            host = %params.host,
            port = params.port,
            database = %params.database,
            ssl_mode = ?params.ssl_mode,
            "connecting to PostgreSQL"
        );

        let opts = Self::options(params);
        let connecting = PgConnection::connect_with(&opts);

        let conn = match params.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, connecting)
                .await
                .map_err(|_| DbError::ConnectTimeout {
                    host: params.host.clone(),
                    port: params.port,
                    database: params.database.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                })?,
            None => connecting.await,
        }
        .map_err(DbError::Connect)?;

        Ok(Box::new(PgSession { conn }))
    }
}

/// An autocommitting Postgres connection.
pub struct PgSession {
    conn: PgConnection,
}

#[async_trait]
impl Session for PgSession {
    async fn execute(&mut self, statement: &Statement) -> DbResult<()> {
        if statement.binds.is_empty() {
            // Simple protocol so multi-command scripts run as sent.
            (&mut self.conn)
                .execute(sqlx::raw_sql(&statement.sql))
                .await
                .map_err(DbError::Statement)?;
            return Ok(());
        }

        let mut query = sqlx::query(&statement.sql);
        for value in &statement.binds {
            query = query.bind(value.as_str());
        }
        query
            .execute(&mut self.conn)
            .await
            .map_err(DbError::Statement)?;
        Ok(())
    }

    async fn fetch_count(&mut self, statement: &Statement) -> DbResult<i64> {
        let mut query = sqlx::query_scalar::<_, i64>(&statement.sql);
        for value in &statement.binds {
            query = query.bind(value.as_str());
        }
        query
            .fetch_optional(&mut self.conn)
            .await
            .map_err(DbError::Statement)?
            .ok_or(DbError::NoRows)
    }

    async fn fetch_column(&mut self, statement: &Statement) -> DbResult<Vec<String>> {
        let mut query = sqlx::query_scalar::<_, String>(&statement.sql);
        for value in &statement.binds {
            query = query.bind(value.as_str());
        }
        query
            .fetch_all(&mut self.conn)
            .await
            .map_err(DbError::Statement)
    }

    async fn close(self: Box<Self>) -> DbResult<()> {
        self.conn.close().await.map_err(DbError::Close)
    }
}
