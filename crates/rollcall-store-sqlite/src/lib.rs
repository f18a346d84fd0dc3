//! Persistence gateway for the rollcall identity table.
//!
//! [`Gateway`] owns one connection, serialises statements, and recovers from a
//! dropped connection by reconnecting and retrying once. The shipped
//! [`SqliteConnector`] backs it with a SQLite file via [`rusqlite`].

pub mod connector;
mod encode;
pub mod gateway;
pub mod schema;
pub mod script;
pub mod statement;

pub mod error;

pub use connector::{ConnectParams, Connection, Connector, SqliteConnector};
pub use error::{Error, Result};
pub use gateway::Gateway;
pub use schema::TableName;
pub use statement::{Row, Statement, Value};

/// A gateway over a SQLite file.
pub type SqliteGateway = Gateway<SqliteConnector>;

#[cfg(test)]
mod tests;
