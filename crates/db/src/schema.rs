//! Schema provisioning, run as the application role.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use pgboot_kernel::{BootstrapRequest, Phase, PhaseOutcome};

use crate::error::{DbResult, ProvisionError};
use crate::session::{self, ConnectParams, Connector, ServerOptions, Session, Statement};
use crate::sql;

const PHASE: &str = "create_schema";

/// The schema-definition script and the seed script applied after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaScript {
    pub definition: Cow<'static, str>,
    pub seed: Cow<'static, str>,
}

impl SchemaScript {
    pub const fn from_static(definition: &'static str, seed: &'static str) -> Self {
        Self {
            definition: Cow::Borrowed(definition),
            seed: Cow::Borrowed(seed),
        }
    }

    pub fn new(definition: impl Into<String>, seed: impl Into<String>) -> Self {
        Self {
            definition: Cow::Owned(definition.into()),
            seed: Cow::Owned(seed.into()),
        }
    }
}

/// Applies the schema and seed data to an empty database.
///
/// Any user table counts as "schema present"; existing tables are not
/// compared against the script.
pub struct SchemaProvisioner {
    connector: Arc<dyn Connector>,
    script: SchemaScript,
    server: ServerOptions,
}

impl SchemaProvisioner {
    pub fn new(connector: Arc<dyn Connector>, script: SchemaScript) -> Self {
        Self {
            connector,
            script,
            server: ServerOptions::default(),
        }
    }

    pub fn with_server_options(mut self, server: ServerOptions) -> Self {
        self.server = server;
        self
    }

    pub fn script(&self) -> &SchemaScript {
        &self.script
    }

    /// Never fails: every error is logged once and reported as
    /// [`PhaseOutcome::Error`].
    pub async fn ensure_schema(&self, request: &BootstrapRequest) -> PhaseOutcome {
        match self.try_ensure(request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(phase = PHASE, kind = err.kind(), "{err}");
                PhaseOutcome::Error
            }
        }
    }

    async fn try_ensure(&self, request: &BootstrapRequest) -> Result<PhaseOutcome, ProvisionError> {
        let params = ConnectParams {
            host: request.host.clone(),
            port: request.port,
            database: request.database_name.to_string(),
            username: request.role_name.to_string(),
            password: request.role_password.clone(),
            ssl_mode: self.server.ssl_mode,
            connect_timeout: self.server.connect_timeout,
        };

        let mut conn = self.connector.connect(&params).await?;
        let outcome = apply(conn.as_mut(), &self.script).await;
        session::release(conn, PHASE).await;

        Ok(outcome?)
    }
}

async fn apply(conn: &mut dyn Session, script: &SchemaScript) -> DbResult<PhaseOutcome> {
    let tables = conn.fetch_column(&sql::user_tables()).await?;
    if !tables.is_empty() {
        tracing::info!(tables = tables.len(), "tables already exist, skipping schema creation");
        return Ok(PhaseOutcome::AlreadyExists);
    }

    // Each script commits on its own; a failing seed leaves the tables behind.
    tracing::info!("creating tables");
    conn.execute(&Statement::raw(script.definition.as_ref())).await?;
    tracing::info!("inserting seed values");
    conn.execute(&Statement::raw(script.seed.as_ref())).await?;

    Ok(PhaseOutcome::Created)
}

#[async_trait]
impl Phase for SchemaProvisioner {
    fn name(&self) -> &'static str {
        PHASE
    }

    async fn run(&self, request: &BootstrapRequest) -> anyhow::Result<PhaseOutcome> {
        Ok(self.ensure_schema(request).await)
    }
}
