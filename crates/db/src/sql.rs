//! Statement builders for the bootstrap.
//!
//! Identifiers arrive as [`SqlIdent`] and are spliced unquoted. Values go
//! through binds where the protocol allows them; DDL cannot take binds, so
//! passwords are embedded as escaped string literals.

use pgboot_kernel::SqlIdent;

use crate::session::Statement;

/// Case-sensitive role lookup. Yields a single count.
pub fn role_exists(role: &SqlIdent) -> Statement {
    Statement::raw("SELECT count(*) FROM pg_user WHERE usename = $1").bind(role.as_str())
}

pub fn create_user(role: &SqlIdent, password: &str) -> Statement {
    Statement::raw(format!(
        "CREATE USER {} WITH PASSWORD {}",
        role,
        quote_literal(password)
    ))
}

/// Makes `grantee` a member of `role`.
pub fn grant_role(role: &SqlIdent, grantee: &SqlIdent) -> Statement {
    Statement::raw(format!("GRANT {} TO {}", role, grantee))
}

pub fn create_database(database: &SqlIdent, owner: &SqlIdent) -> Statement {
    Statement::raw(format!("CREATE DATABASE {} OWNER = {}", database, owner))
}

/// Every table outside the system schemas, as `schema.table`.
pub fn user_tables() -> Statement {
    Statement::raw(
        "SELECT schemaname || '.' || tablename FROM pg_catalog.pg_tables \
         WHERE schemaname NOT IN ('pg_catalog', 'information_schema')",
    )
}

/// Standard-conforming string literal: wrap in quotes, double embedded quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
