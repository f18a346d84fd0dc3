//! SQL schema for the identity table.
//!
//! A single table keyed by card UID. The DDL is issued after every
//! successful connect and is idempotent thanks to `CREATE TABLE IF NOT
//! EXISTS`. Column types are spelled so the same text works on SQLite and on
//! MySQL-family servers.

use std::fmt;

use serde::Deserialize;

use crate::{Error, Result};

pub const UID_COLUMN: &str = "UID";
pub const NAME_COLUMN: &str = "Name";
pub const STAFF_COLUMN: &str = "Staff";

pub const DEFAULT_TABLE: &str = "Users";

/// A validated SQL identifier naming the identity table.
///
/// Identifiers cannot be bound as parameters, so the name is restricted to
/// `[A-Za-z_][A-Za-z0-9_]*` before it is ever placed in SQL text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct TableName(String);

impl TableName {
  pub fn new(name: impl Into<String>) -> Result<Self> {
    let name = name.into();
    let mut chars = name.chars();
    let valid = chars
      .next()
      .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
      && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
      return Err(Error::InvalidTableName(name));
    }
    Ok(Self(name))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl Default for TableName {
  fn default() -> Self { Self(DEFAULT_TABLE.to_owned()) }
}

impl TryFrom<String> for TableName {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::new(value) }
}

impl fmt::Display for TableName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Column definitions shared by the live schema and exported scripts.
pub fn column_definitions() -> String {
  format!(
    "{UID_COLUMN} varchar(18) NOT NULL, {NAME_COLUMN} varchar(255), \
     {STAFF_COLUMN} tinyint(1), PRIMARY KEY ({UID_COLUMN})"
  )
}

/// Idempotent DDL for `table`.
pub fn create_table_if_missing(table: &TableName) -> String {
  format!("CREATE TABLE IF NOT EXISTS {table} ({})", column_definitions())
}
