//! Role and database provisioning, run with administrative credentials.

use std::sync::Arc;

use async_trait::async_trait;
use pgboot_kernel::{BootstrapRequest, Phase, PhaseOutcome, SqlIdent};
use pgboot_secrets::{AdminCredential, AdminSecretIds, SecretStore};

use crate::error::{DbResult, ProvisionError};
use crate::session::{self, ConnectParams, Connector, ServerOptions, Session};
use crate::sql;

const PHASE: &str = "create_db";
const DEFAULT_MAINTENANCE_DATABASE: &str = "postgres";

/// Creates the application role and its database if the role is absent.
///
/// Role existence is the only check: a role without its database is
/// reported as `AlreadyExists` and left alone.
pub struct RoleDatabaseProvisioner {
    secrets: Arc<dyn SecretStore>,
    connector: Arc<dyn Connector>,
    secret_ids: AdminSecretIds,
    maintenance_database: String,
    server: ServerOptions,
}

impl RoleDatabaseProvisioner {
    pub fn new(secrets: Arc<dyn SecretStore>, connector: Arc<dyn Connector>) -> Self {
        Self {
            secrets,
            connector,
            secret_ids: AdminSecretIds::default(),
            maintenance_database: DEFAULT_MAINTENANCE_DATABASE.to_string(),
            server: ServerOptions::default(),
        }
    }

    pub fn with_secret_ids(mut self, ids: AdminSecretIds) -> Self {
        self.secret_ids = ids;
        self
    }

    pub fn with_maintenance_database(mut self, database: impl Into<String>) -> Self {
        self.maintenance_database = database.into();
        self
    }

    pub fn with_server_options(mut self, server: ServerOptions) -> Self {
        self.server = server;
        self
    }

    /// Never fails: every error is logged once and reported as
    /// [`PhaseOutcome::Error`].
    pub async fn ensure_role_and_database(&self, request: &BootstrapRequest) -> PhaseOutcome {
        match self.try_ensure(request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(phase = PHASE, kind = err.kind(), "{err}");
                PhaseOutcome::Error
            }
        }
    }

    async fn try_ensure(&self, request: &BootstrapRequest) -> Result<PhaseOutcome, ProvisionError> {
        let admin = AdminCredential::fetch(self.secrets.as_ref(), &self.secret_ids).await?;
        let admin_role =
            SqlIdent::parse(admin.username.clone()).map_err(|_| ProvisionError::AdminIdentifier)?;

        let params = ConnectParams {
            host: request.host.clone(),
            port: request.port,
            database: self.maintenance_database.clone(),
            username: admin.username,
            password: admin.password,
            ssl_mode: self.server.ssl_mode,
            connect_timeout: self.server.connect_timeout,
        };

        let mut conn = self.connector.connect(&params).await?;
        let outcome = provision(conn.as_mut(), request, &admin_role).await;
        session::release(conn, PHASE).await;

        Ok(outcome?)
    }
}

async fn provision(
    conn: &mut dyn Session,
    request: &BootstrapRequest,
    admin_role: &SqlIdent,
) -> DbResult<PhaseOutcome> {
    let role = &request.role_name;
    let database = &request.database_name;

    let existing = conn.fetch_count(&sql::role_exists(role)).await?;
    if existing != 0 {
        tracing::info!(role = %role, "role already exists, skipping role and database creation");
        return Ok(PhaseOutcome::AlreadyExists);
    }

    tracing::info!(role = %role, database = %database, "creating role and database");
    conn.execute(&sql::create_user(role, &request.role_password)).await?;
    // The admin must be a member of the new role to hand it database ownership.
    conn.execute(&sql::grant_role(role, admin_role)).await?;
    conn.execute(&sql::create_database(database, role)).await?;
    tracing::info!(role = %role, database = %database, "role and database created");

    Ok(PhaseOutcome::Created)
}

#[async_trait]
impl Phase for RoleDatabaseProvisioner {
    fn name(&self) -> &'static str {
        PHASE
    }

    async fn run(&self, request: &BootstrapRequest) -> anyhow::Result<PhaseOutcome> {
        Ok(self.ensure_role_and_database(request).await)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pgboot_kernel::settings::SslMode;
    use pgboot_secrets::MemorySecretStore;
    use pgboot_telemetry::capture::LogCapture;
    use tracing::Level;

    use super::*;
    use crate::testing::FakeConnector;

    fn request() -> BootstrapRequest {
        let env: HashMap<String, String> = [
            ("DB_USER", "user123"),
            ("DB_PASS", "pass123"),
            ("DB_NAME", "name123"),
            ("DB_HOST", "host"),
            ("DB_PORT", "5432"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        BootstrapRequest::resolve(&env).unwrap()
    }

    fn admin_secrets() -> Arc<MemorySecretStore> {
        Arc::new(
            MemorySecretStore::new()
                .with_secret("oltp_admin_user", "oltp_admin_user")
                .with_secret("oltp_admin_pass", "oltp_admin_pass"),
        )
    }

    #[tokio::test]
    async fn connects_to_maintenance_database_with_admin_credentials() {
        let connector = Arc::new(FakeConnector::new());
        let provisioner = RoleDatabaseProvisioner::new(admin_secrets(), connector.clone())
            .with_maintenance_database("name");

        provisioner.ensure_role_and_database(&request()).await;

        let connections = connector.connections();
        assert_eq!(connections.len(), 1);
        let params = &connections[0];
        assert_eq!(params.username, "oltp_admin_user");
        assert_eq!(params.password, "oltp_admin_pass");
        assert_eq!(params.host, "host");
        assert_eq!(params.database, "name");
        assert_eq!(params.port, 5432);
        assert_eq!(params.ssl_mode, SslMode::Require);
    }

    #[tokio::test]
    async fn creates_role_grant_and_database_when_role_is_absent() {
        let connector = Arc::new(FakeConnector::new().with_role_count(0));
        let provisioner = RoleDatabaseProvisioner::new(admin_secrets(), connector.clone());

        let outcome = provisioner.ensure_role_and_database(&request()).await;

        assert_eq!(outcome, PhaseOutcome::Created);
        assert_eq!(
            connector.statements(),
            vec![
                "SELECT count(*) FROM pg_user WHERE usename = $1",
                "CREATE USER user123 WITH PASSWORD 'pass123'",
                "GRANT user123 TO oltp_admin_user",
                "CREATE DATABASE name123 OWNER = user123",
            ]
        );
        assert_eq!(connector.closed(), 1);
    }

    #[tokio::test]
    async fn existing_role_issues_only_the_lookup() {
        let connector = Arc::new(FakeConnector::new().with_role_count(1));
        let provisioner = RoleDatabaseProvisioner::new(admin_secrets(), connector.clone());

        let outcome = provisioner.ensure_role_and_database(&request()).await;

        assert_eq!(outcome, PhaseOutcome::AlreadyExists);
        assert_eq!(
            connector.statements(),
            vec!["SELECT count(*) FROM pg_user WHERE usename = $1"]
        );
        assert_eq!(connector.closed(), 1);
    }

    #[tokio::test]
    async fn secret_failure_logs_one_error_and_never_connects() {
        let capture = LogCapture::new();
        let _guard = capture.set_default();
        let connector = Arc::new(FakeConnector::new());
        let secrets = Arc::new(MemorySecretStore::failing("An error"));
        let provisioner = RoleDatabaseProvisioner::new(secrets, connector.clone());

        let outcome = provisioner.ensure_role_and_database(&request()).await;

        assert_eq!(outcome, PhaseOutcome::Error);
        assert_eq!(capture.messages_at(Level::ERROR), vec!["An error"]);
        assert_eq!(connector.opened(), 0);
        assert_eq!(connector.closed(), 0);
    }

    #[tokio::test]
    async fn connection_failure_is_a_phase_error() {
        let capture = LogCapture::new();
        let _guard = capture.set_default();
        let connector = Arc::new(FakeConnector::new().failing_connect("connection refused"));
        let provisioner = RoleDatabaseProvisioner::new(admin_secrets(), connector.clone());

        let outcome = provisioner.ensure_role_and_database(&request()).await;

        assert_eq!(outcome, PhaseOutcome::Error);
        assert_eq!(capture.messages_at(Level::ERROR), vec!["connection refused"]);
        assert_eq!(connector.closed(), 0);
    }

    #[tokio::test]
    async fn statement_failure_still_closes_the_connection() {
        let capture = LogCapture::new();
        let _guard = capture.set_default();
        let connector = Arc::new(
            FakeConnector::new().failing_statement("CREATE DATABASE", "permission denied"),
        );
        let provisioner = RoleDatabaseProvisioner::new(admin_secrets(), connector.clone());

        let outcome = provisioner.ensure_role_and_database(&request()).await;

        assert_eq!(outcome, PhaseOutcome::Error);
        assert_eq!(capture.messages_at(Level::ERROR), vec!["permission denied"]);
        assert_eq!(connector.statements().len(), 4);
        assert_eq!(connector.closed(), 1);
    }

    #[tokio::test]
    async fn close_failure_does_not_change_the_outcome() {
        let capture = LogCapture::new();
        let _guard = capture.set_default();
        let connector = Arc::new(FakeConnector::new().with_role_count(1).failing_close());
        let provisioner = RoleDatabaseProvisioner::new(admin_secrets(), connector.clone());

        let outcome = provisioner.ensure_role_and_database(&request()).await;

        assert_eq!(outcome, PhaseOutcome::AlreadyExists);
        assert!(capture.messages_at(Level::ERROR).is_empty());
        assert_eq!(capture.messages_at(Level::WARN).len(), 1);
    }

    #[tokio::test]
    async fn unsafe_admin_username_is_rejected_without_logging_it() {
        let capture = LogCapture::new();
        let _guard = capture.set_default();
        let connector = Arc::new(FakeConnector::new());
        let secrets = Arc::new(
            MemorySecretStore::new()
                .with_secret("oltp_admin_user", "RdsAdmin")
                .with_secret("oltp_admin_pass", "pw"),
        );
        let provisioner = RoleDatabaseProvisioner::new(secrets, connector.clone());

        let outcome = provisioner.ensure_role_and_database(&request()).await;

        assert_eq!(outcome, PhaseOutcome::Error);
        assert_eq!(
            capture.messages_at(Level::ERROR),
            vec!["admin username from secret store is not a safe SQL identifier"]
        );
        assert!(!capture.mentions("RdsAdmin"));
        assert_eq!(connector.opened(), 0);
    }

    #[tokio::test]
    async fn successful_run_never_logs_admin_credentials() {
        let capture = LogCapture::new();
        let _guard = capture.set_default();
        let connector = Arc::new(FakeConnector::new().with_role_count(0));
        let secrets = Arc::new(
            MemorySecretStore::new()
                .with_secret("oltp_admin_user", "rds_master_7f3a")
                .with_secret("oltp_admin_pass", "hunter2"),
        );
        let provisioner = RoleDatabaseProvisioner::new(secrets, connector);

        let outcome = provisioner.ensure_role_and_database(&request()).await;

        assert_eq!(outcome, PhaseOutcome::Created);
        assert!(!capture.events().is_empty());
        assert!(!capture.mentions("rds_master_7f3a"));
        assert!(!capture.mentions("hunter2"));
    }

    #[tokio::test]
    async fn secrets_are_fetched_on_every_run() {
        let secrets = admin_secrets();
        let connector = Arc::new(FakeConnector::new().with_role_count(1));
        let provisioner = RoleDatabaseProvisioner::new(secrets.clone(), connector);

        provisioner.ensure_role_and_database(&request()).await;
        provisioner.ensure_role_and_database(&request()).await;

        assert_eq!(secrets.lookups().len(), 4);
    }
}
