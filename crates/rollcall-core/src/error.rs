//! Error types for `rollcall-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A window string that does not match `HHhMM-HHhMM`.
  #[error("invalid time window {0:?}: expected HHhMM-HHhMM")]
  InvalidWindow(String),

  #[error("invalid card uid {0:?}")]
  InvalidUid(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
