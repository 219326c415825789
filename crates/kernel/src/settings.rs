use std::path::PathBuf;

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "PGBOOT_ENV";
const CONFIG_DIR_ENV: &str = "PGBOOT_CONFIG_DIR";
const ENV_PREFIX: &str = "PGBOOT";

/// Deployment environment the bootstrap is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

/// Operational settings loaded from layered sources.
///
/// The five required bootstrap variables (`DB_USER` and friends) are not part
/// of this structure; they are resolved separately by [`crate::env`] so that
/// every missing one can be reported at once.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub secrets: SecretSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, and environment overlay.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .with_context(|| "unable to resolve current directory")?
                .join("config"),
        };

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let cfg = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = parse_environment(&environment)?;

        Ok(settings)
    }
}

fn parse_environment(raw: &str) -> anyhow::Result<Environment> {
    match raw {
        "local" => Ok(Environment::Local),
        "staging" => Ok(Environment::Staging),
        "production" => Ok(Environment::Production),
        other => Err(anyhow!(
            "unsupported environment '{}'; expected local/staging/production",
            other
        )),
    }
}

/// TLS requirement for database connections.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    Disable,
    Prefer,
    #[default]
    Require,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Existing database the administrative connection lands in.
    #[serde(default = "DatabaseSettings::default_maintenance_database")]
    pub maintenance_database: String,
    #[serde(default)]
    pub ssl_mode: SslMode,
    #[serde(default = "DatabaseSettings::default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl DatabaseSettings {
    fn default_maintenance_database() -> String {
        "postgres".to_string()
    }

    fn default_connect_timeout_ms() -> u64 {
        10_000
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            maintenance_database: Self::default_maintenance_database(),
            ssl_mode: SslMode::default(),
            connect_timeout_ms: Self::default_connect_timeout_ms(),
        }
    }
}

/// Where administrative credentials come from.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SecretBackend {
    #[default]
    Aws,
    Env,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecretSettings {
    #[serde(default)]
    pub backend: SecretBackend,
    #[serde(default = "SecretSettings::default_admin_user_id")]
    pub admin_user_id: String,
    #[serde(default = "SecretSettings::default_admin_password_id")]
    pub admin_password_id: String,
    #[serde(default)]
    pub region: Option<String>,
}

impl SecretSettings {
    fn default_admin_user_id() -> String {
        "oltp_admin_user".to_string()
    }

    fn default_admin_password_id() -> String {
        "oltp_admin_pass".to_string()
    }
}

impl Default for SecretSettings {
    fn default() -> Self {
        Self {
            backend: SecretBackend::default(),
            admin_user_id: Self::default_admin_user_id(),
            admin_password_id: Self::default_admin_password_id(),
            region: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "TelemetrySettings::default_log_level")]
    pub log_level: String,
}

impl TelemetrySettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            log_level: Self::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
