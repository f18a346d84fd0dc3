//! Badge reader service for rollcall.
//!
//! Wires configuration, the SQLite identity store and the attendance
//! coordinator together for the `rollcall` binary.

pub mod config;
pub mod event;
pub mod sweep;

pub use config::ReaderConfig;

use std::sync::Arc;

use rollcall_core::attendance::Attendance;
use rollcall_store_sqlite::{SqliteConnector, SqliteGateway};

/// The coordinator as the binary runs it.
pub type Reader = Attendance<Arc<SqliteGateway>>;

/// Connect to the configured store. Never fails; an unreachable store leaves
/// the gateway disconnected.
pub fn open_gateway(cfg: &ReaderConfig) -> SqliteGateway {
  SqliteGateway::connect(
    SqliteConnector::default(),
    cfg.store.connect_params(),
    cfg.store.table.clone(),
  )
}
