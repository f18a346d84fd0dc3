//! Error type for `rollcall-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] rollcall_core::Error),

  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),

  #[error("cannot connect to {target}: {reason}")]
  Connect { target: String, reason: String },

  /// The link to the store dropped mid-statement.
  #[error("connection lost: {0}")]
  ConnectionLost(String),

  #[error("invalid table name: {0:?}")]
  InvalidTableName(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl Error {
  /// Whether a reconnect could plausibly make the same statement succeed.
  ///
  /// Malformed statements and constraint violations are not transient.
  pub fn is_transient(&self) -> bool {
    match self {
      Error::ConnectionLost(_) => true,
      Error::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
        e.code,
        ErrorCode::CannotOpen
          | ErrorCode::SystemIoFailure
          | ErrorCode::DatabaseBusy
          | ErrorCode::DatabaseLocked
      ),
      _ => false,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
