//! Database access for the bootstrap: a connection seam with a Postgres
//! implementation, and the two provisioning phases built on it.

pub mod error;
pub mod postgres;
pub mod role;
pub mod schema;
pub mod session;
pub mod sql;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{DbError, DbResult, ProvisionError};
pub use postgres::PgConnector;
pub use role::RoleDatabaseProvisioner;
pub use schema::{SchemaProvisioner, SchemaScript};
pub use session::{ConnectParams, Connector, ServerOptions, Session, Statement};
