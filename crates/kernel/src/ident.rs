//! Validation for SQL identifiers that are spliced into statement text.

use std::fmt;

use thiserror::Error;

/// Postgres truncates identifiers beyond `NAMEDATALEN - 1` bytes.
const MAX_IDENT_LEN: usize = 63;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentError {
    #[error("identifier is empty")]
    Empty,

    #[error("identifier '{0}' exceeds {MAX_IDENT_LEN} bytes")]
    TooLong(String),

    #[error("identifier '{value}' contains disallowed character {ch:?}")]
    InvalidChar { value: String, ch: char },
}

/// A role or database name that is safe to interpolate unquoted.
///
/// Only lowercase ASCII letters, digits, `_` and `$` are accepted, and the
/// first character must be a letter or `_`. Unquoted identifiers are folded
/// to lowercase by Postgres, so rejecting uppercase keeps the catalog lookup
/// (`usename = ...`) in agreement with the name that `CREATE USER` stores.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SqlIdent(String);

impl SqlIdent {
    pub fn parse(raw: impl Into<String>) -> Result<Self, IdentError> {
        let raw = raw.into();
        let mut chars = raw.chars();

        let first = chars.next().ok_or(IdentError::Empty)?;
        if !(first.is_ascii_lowercase() || first == '_') {
            return Err(IdentError::InvalidChar {
                value: raw.clone(),
                ch: first,
            });
        }

        if let Some(ch) =
            chars.find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '$'))
        {
            return Err(IdentError::InvalidChar { value: raw, ch });
        }

        if raw.len() > MAX_IDENT_LEN {
            return Err(IdentError::TooLong(raw));
        }

        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SqlIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SqlIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SqlIdent({})", self.0)
    }
}

impl AsRef<str> for SqlIdent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
