//! Resolution of the required bootstrap variables.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::ident::{IdentError, SqlIdent};

pub const DB_USER: &str = "DB_USER";
pub const DB_PASS: &str = "DB_PASS";
pub const DB_NAME: &str = "DB_NAME";
pub const DB_HOST: &str = "DB_HOST";
pub const DB_PORT: &str = "DB_PORT";

/// Required variables in the order they are reported.
pub const REQUIRED_VARS: [&str; 5] = [DB_USER, DB_PASS, DB_NAME, DB_HOST, DB_PORT];

/// Read-only view over a set of named variables.
pub trait EnvSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Required environment variables missing: {}", PyList(.0))]
    Missing(Vec<&'static str>),

    #[error("{var} is not a valid port: '{value}'")]
    InvalidPort { var: &'static str, value: String },

    #[error("{var} is not a safe SQL identifier: {source}")]
    InvalidIdentifier {
        var: &'static str,
        #[source]
        source: IdentError,
    },
}

/// Python-style list rendering: `['A', 'B']`.
struct PyList<'a>(&'a [&'static str]);

impl fmt::Display for PyList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, name) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{}'", name)?;
        }
        f.write_str("]")
    }
}

/// Names of required variables that are absent or empty, in declared order.
pub fn missing_variables(env: &dyn EnvSource) -> Vec<&'static str> {
    REQUIRED_VARS
        .iter()
        .copied()
        .filter(|name| env.var(name).map_or(true, |value| value.is_empty()))
        .collect()
}

/// Everything both provisioners need, resolved once per invocation.
#[derive(Clone)]
pub struct BootstrapRequest {
    pub role_name: SqlIdent,
    pub role_password: String,
    pub database_name: SqlIdent,
    pub host: String,
    pub port: u16,
}

impl BootstrapRequest {
    /// Resolve and validate the request. Presence is checked for every
    /// variable before any value is parsed.
    pub fn resolve(env: &dyn EnvSource) -> Result<Self, ConfigError> {
        let missing = missing_variables(env);
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let get = |name: &'static str| env.var(name).unwrap_or_default();

        let role_name = SqlIdent::parse(get(DB_USER))
            .map_err(|source| ConfigError::InvalidIdentifier { var: DB_USER, source })?;
        let database_name = SqlIdent::parse(get(DB_NAME))
            .map_err(|source| ConfigError::InvalidIdentifier { var: DB_NAME, source })?;

        let raw_port = get(DB_PORT);
        let port = match raw_port.trim().parse::<u16>() {
            Ok(port) if port != 0 => port,
            _ => {
                return Err(ConfigError::InvalidPort {
                    var: DB_PORT,
                    value: raw_port,
                })
            }
        };

        Ok(Self {
            role_name,
            role_password: get(DB_PASS),
            database_name,
            host: get(DB_HOST),
            port,
        })
    }
}

impl fmt::Debug for BootstrapRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapRequest")
            .field("role_name", &self.role_name)
            .field("role_password", &"<redacted>")
            .field("database_name", &self.database_name)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_env() -> HashMap<String, String> {
        [
            (DB_USER, "usr"),
            (DB_PASS, "pass"),
            (DB_NAME, "name"),
            (DB_HOST, "host"),
            (DB_PORT, "5432"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn every_missing_subset_is_reported_in_declared_order() {
        for mask in 0u8..32 {
            let mut env = full_env();
            let mut expected = Vec::new();
            for (bit, name) in REQUIRED_VARS.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    env.remove(*name);
                    expected.push(*name);
                }
            }
            assert_eq!(missing_variables(&env), expected, "mask {mask:05b}");
        }
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut env = full_env();
        env.insert(DB_HOST.to_string(), String::new());
        assert_eq!(missing_variables(&env), vec![DB_HOST]);
    }

    #[test]
    fn missing_message_lists_names_like_a_python_list() {
        let err = BootstrapRequest::resolve(&HashMap::<String, String>::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Required environment variables missing: \
             ['DB_USER', 'DB_PASS', 'DB_NAME', 'DB_HOST', 'DB_PORT']"
        );

        let mut env = full_env();
        env.remove(DB_PORT);
        let err = BootstrapRequest::resolve(&env).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Required environment variables missing: ['DB_PORT']"
        );
    }

    #[test]
    fn resolves_complete_environment() {
        let request = BootstrapRequest::resolve(&full_env()).unwrap();
        assert_eq!(request.role_name.as_str(), "usr");
        assert_eq!(request.role_password, "pass");
        assert_eq!(request.database_name.as_str(), "name");
        assert_eq!(request.host, "host");
        assert_eq!(request.port, 5432);
    }

    #[test]
    fn rejects_unparseable_port() {
        let mut env = full_env();
        env.insert(DB_PORT.to_string(), "fifty".to_string());
        assert_eq!(
            BootstrapRequest::resolve(&env).unwrap_err(),
            ConfigError::InvalidPort {
                var: DB_PORT,
                value: "fifty".to_string()
            }
        );
    }

    #[test]
    fn rejects_unsafe_role_name() {
        let mut env = full_env();
        env.insert(DB_USER.to_string(), "usr; DROP ROLE admin".to_string());
        assert!(matches!(
            BootstrapRequest::resolve(&env),
            Err(ConfigError::InvalidIdentifier { var: DB_USER, .. })
        ));
    }

    #[test]
    fn debug_output_hides_password() {
        let request = BootstrapRequest::resolve(&full_env()).unwrap();
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("pass\""));
        assert!(rendered.contains("<redacted>"));
    }
}
