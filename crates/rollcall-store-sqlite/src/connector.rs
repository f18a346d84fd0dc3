//! The connection seam and its SQLite implementation.
//!
//! [`Gateway`](crate::Gateway) talks to the store only through [`Connector`]
//! and [`Connection`], so the reconnect policy is independent of the driver.

use std::{fmt, path::PathBuf, time::Duration};

use serde::Deserialize;

use crate::{
  Error, Result,
  statement::{Row, Statement, Value},
};

// ─── Parameters ──────────────────────────────────────────────────────────────

/// Where and as whom to connect. Reused verbatim by every reconnect.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectParams {
  #[serde(default)]
  pub host:     String,
  #[serde(default)]
  pub port:     u16,
  pub database: String,
  #[serde(default)]
  pub user:     String,
  #[serde(default)]
  pub password: String,
}

impl fmt::Debug for ConnectParams {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ConnectParams")
      .field("host", &self.host)
      .field("port", &self.port)
      .field("database", &self.database)
      .field("user", &self.user)
      .field("password", &"<redacted>")
      .finish()
  }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// A live link to the store.
pub trait Connection: Send {
  fn query(&mut self, statement: &Statement) -> Result<Vec<Row>>;

  /// Returns the number of affected rows.
  fn execute(&mut self, statement: &Statement) -> Result<usize>;
}

/// Opens [`Connection`]s.
pub trait Connector: Send + Sync {
  type Connection: Connection;

  fn connect(&self, params: &ConnectParams) -> Result<Self::Connection>;
}

// ─── SQLite ──────────────────────────────────────────────────────────────────

/// Connects to a SQLite database file.
///
/// `database` names the file; a non-empty `host` other than `localhost` is
/// taken as the directory holding it. `:memory:` opens a private in-memory
/// database, which does not survive a reconnect. Port and credentials are
/// not used by SQLite.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
  busy_timeout: Duration,
}

impl Default for SqliteConnector {
  fn default() -> Self { Self { busy_timeout: Duration::from_secs(5) } }
}

impl SqliteConnector {
  pub fn new(busy_timeout: Duration) -> Self { Self { busy_timeout } }

  pub fn database_path(params: &ConnectParams) -> PathBuf {
    match params.host.as_str() {
      "" | "localhost" => PathBuf::from(&params.database),
      dir => PathBuf::from(dir).join(&params.database),
    }
  }
}

impl Connector for SqliteConnector {
  type Connection = SqliteConnection;

  fn connect(&self, params: &ConnectParams) -> Result<SqliteConnection> {
    let conn = if params.database == ":memory:" {
      rusqlite::Connection::open_in_memory()
    } else {
      rusqlite::Connection::open(Self::database_path(params))
    };
    let conn = conn
      .and_then(|conn| {
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
      })
      .map_err(|e| Error::Connect {
        target: Self::database_path(params).display().to_string(),
        reason: e.to_string(),
      })?;
    Ok(SqliteConnection { conn })
  }
}

pub struct SqliteConnection {
  conn: rusqlite::Connection,
}

impl Connection for SqliteConnection {
  fn query(&mut self, statement: &Statement) -> Result<Vec<Row>> {
    let mut prepared = self.conn.prepare(statement.sql())?;
    let columns: Vec<String> = prepared
      .column_names()
      .into_iter()
      .map(str::to_owned)
      .collect();

    let mut rows = prepared.query(rusqlite::params_from_iter(statement.params()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
      let mut cells = Vec::with_capacity(columns.len());
      for (i, name) in columns.iter().enumerate() {
        cells.push((name.clone(), Value::from(row.get_ref(i)?)));
      }
      out.push(Row::new(cells));
    }
    Ok(out)
  }

  fn execute(&mut self, statement: &Statement) -> Result<usize> {
    Ok(
      self
        .conn
        .execute(statement.sql(), rusqlite::params_from_iter(statement.params()))?,
    )
  }
}
