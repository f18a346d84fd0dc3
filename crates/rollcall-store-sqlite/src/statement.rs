//! Parameterised statements and the rows they return.
//!
//! Caller-supplied values always travel as bound parameters (`?`) and are
//! never spliced into SQL text.

use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};

/// A single bound parameter or result cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Null,
  Integer(i64),
  Real(f64),
  Text(String),
  Blob(Vec<u8>),
}

impl Value {
  pub fn as_text(&self) -> Option<&str> {
    match self {
      Value::Text(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_integer(&self) -> Option<i64> {
    match self {
      Value::Integer(i) => Some(*i),
      Value::Text(s) => s.trim().parse().ok(),
      _ => None,
    }
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self { Value::Text(s.to_owned()) }
}

impl From<String> for Value {
  fn from(s: String) -> Self { Value::Text(s) }
}

impl From<i64> for Value {
  fn from(i: i64) -> Self { Value::Integer(i) }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self { Value::Integer(i64::from(b)) }
}

impl From<ValueRef<'_>> for Value {
  fn from(v: ValueRef<'_>) -> Self {
    match v {
      ValueRef::Null => Value::Null,
      ValueRef::Integer(i) => Value::Integer(i),
      ValueRef::Real(f) => Value::Real(f),
      ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
      ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
  }
}

impl ToSql for Value {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
    Ok(match self {
      Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
      Value::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
      Value::Real(f) => ToSqlOutput::Borrowed(ValueRef::Real(*f)),
      Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
      Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
    })
  }
}

// ─── Statement ───────────────────────────────────────────────────────────────

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
  sql:    String,
  params: Vec<Value>,
}

impl Statement {
  pub fn new(sql: impl Into<String>) -> Self {
    Self { sql: sql.into(), params: Vec::new() }
  }

  /// Bind the next `?` placeholder.
  pub fn bind(mut self, value: impl Into<Value>) -> Self {
    self.params.push(value.into());
    self
  }

  pub fn sql(&self) -> &str { &self.sql }

  pub fn params(&self) -> &[Value] { &self.params }
}

// ─── Row ─────────────────────────────────────────────────────────────────────

/// One result row, cells addressable by column name (case-insensitive).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
  cells: Vec<(String, Value)>,
}

impl Row {
  pub fn new(cells: Vec<(String, Value)>) -> Self { Self { cells } }

  pub fn get(&self, column: &str) -> Option<&Value> {
    self
      .cells
      .iter()
      .find(|(name, _)| name.eq_ignore_ascii_case(column))
      .map(|(_, value)| value)
  }

  pub fn len(&self) -> usize { self.cells.len() }

  pub fn is_empty(&self) -> bool { self.cells.is_empty() }
}
