//! [`Gateway`]: the single-connection persistence boundary.
//!
//! Every statement runs under one mutex, so at most one is in flight. When a
//! statement fails with a transient error the gateway reconnects with the
//! last parameters and retries that statement exactly once. Nothing is
//! propagated to callers: failures surface as empty or zero results and a log
//! event.

use std::sync::{Mutex, MutexGuard, PoisonError};

use rollcall_core::{
  directory::StudentDirectory,
  student::{Student, Uid},
};

use crate::{
  Result,
  connector::{ConnectParams, Connection, Connector},
  encode::{decode_student, encode_staff},
  schema::{NAME_COLUMN, STAFF_COLUMN, TableName, UID_COLUMN, create_table_if_missing},
  statement::{Row, Statement},
};

struct State<K> {
  params: ConnectParams,
  conn:   Option<K>,
}

pub struct Gateway<C: Connector> {
  connector: C,
  table:     TableName,
  state:     Mutex<State<C::Connection>>,
}

impl<C: Connector> Gateway<C> {
  /// Connect and ensure the schema exists.
  ///
  /// A failed connect is logged and leaves the gateway disconnected; every
  /// statement then returns an empty result until [`Self::reconnect`]
  /// succeeds.
  pub fn connect(connector: C, params: ConnectParams, table: TableName) -> Self {
    let gateway = Self {
      connector,
      table,
      state: Mutex::new(State { params, conn: None }),
    };
    {
      let mut state = gateway.lock();
      gateway.open(&mut state);
    }
    gateway
  }

  pub fn table(&self) -> &TableName { &self.table }

  pub fn is_connected(&self) -> bool { self.lock().conn.is_some() }

  /// Drop the current connection, adopt `params` and connect again.
  pub fn reconnect(&self, params: ConnectParams) -> bool {
    let mut state = self.lock();
    state.conn = None;
    state.params = params;
    self.open(&mut state)
  }

  /// Run the idempotent DDL through the normal statement path.
  pub fn ensure_schema(&self) -> usize {
    self.update(&Statement::new(create_table_if_missing(&self.table)))
  }

  fn lock(&self) -> MutexGuard<'_, State<C::Connection>> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn open(&self, state: &mut State<C::Connection>) -> bool {
    tracing::info!(params = ?state.params, "connecting to database");
    let mut conn = match self.connector.connect(&state.params) {
      Ok(conn) => conn,
      Err(e) => {
        tracing::warn!(error = %e, "error connecting to database");
        state.conn = None;
        return false;
      }
    };
    let ddl = Statement::new(create_table_if_missing(&self.table));
    if let Err(e) = conn.execute(&ddl) {
      tracing::warn!(table = %self.table, error = %e, "could not ensure schema");
    }
    state.conn = Some(conn);
    true
  }

  /// Run `op` once, and once more after a reconnect if it failed
  /// transiently.
  fn run<T>(
    &self,
    statement: &Statement,
    op: impl Fn(&mut C::Connection, &Statement) -> Result<T>,
  ) -> Option<T> {
    let mut state = self.lock();
    let Some(conn) = state.conn.as_mut() else {
      tracing::debug!(sql = statement.sql(), "not connected, statement skipped");
      return None;
    };

    tracing::debug!(sql = statement.sql(), "sending statement");
    match op(conn, statement) {
      Ok(value) => Some(value),
      Err(e) if e.is_transient() => {
        tracing::warn!(error = %e, "connection lost, reconnecting once");
        state.conn = None;
        if !self.open(&mut state) {
          return None;
        }
        let conn = state.conn.as_mut()?;
        match op(conn, statement) {
          Ok(value) => Some(value),
          Err(e) => {
            tracing::warn!(sql = statement.sql(), error = %e, "statement failed after reconnect");
            if e.is_transient() {
              state.conn = None;
            }
            None
          }
        }
      }
      Err(e) => {
        tracing::warn!(sql = statement.sql(), error = %e, "statement failed");
        None
      }
    }
  }

  /// Execute a read statement. Empty on any unrecoverable failure.
  pub fn query(&self, statement: &Statement) -> Vec<Row> {
    self
      .run(statement, |conn, stmt| conn.query(stmt))
      .unwrap_or_default()
  }

  /// Execute a write statement. Zero on any unrecoverable failure.
  pub fn update(&self, statement: &Statement) -> usize {
    self
      .run(statement, |conn, stmt| conn.execute(stmt))
      .unwrap_or_default()
  }

  fn select_students(&self) -> String {
    format!(
      "SELECT {UID_COLUMN}, {NAME_COLUMN}, {STAFF_COLUMN} FROM {}",
      self.table
    )
  }

  pub fn find_by_uid(&self, uid: &Uid) -> Option<Student> {
    let stmt = Statement::new(format!("{} WHERE {UID_COLUMN} = ?", self.select_students()))
      .bind(uid.as_str());
    self.query(&stmt).first().and_then(decode_student)
  }

  /// Case-insensitive (ASCII) match on the stored name.
  pub fn find_by_name(&self, name: &str) -> Option<Student> {
    let stmt = Statement::new(format!(
      "{} WHERE {NAME_COLUMN} = ? COLLATE NOCASE",
      self.select_students()
    ))
    .bind(name);
    self.query(&stmt).first().and_then(decode_student)
  }

  /// Every stored record; empty when disconnected.
  pub fn all_students(&self) -> Vec<Student> {
    self
      .query(&Statement::new(self.select_students()))
      .iter()
      .filter_map(decode_student)
      .collect()
  }

  /// Insert `student`. A duplicate UID fails on the primary key and is
  /// swallowed like any other failed update.
  pub fn insert(&self, student: &Student) {
    let stmt = Statement::new(format!(
      "INSERT INTO {} ({UID_COLUMN}, {NAME_COLUMN}, {STAFF_COLUMN}) VALUES (?, ?, ?)",
      self.table
    ))
    .bind(student.uid.as_str())
    .bind(student.name.as_str())
    .bind(encode_staff(student.staff));
    self.update(&stmt);
  }
}

impl<C: Connector> StudentDirectory for Gateway<C> {
  fn find_by_uid(&self, uid: &Uid) -> Option<Student> { Gateway::find_by_uid(self, uid) }

  fn find_by_name(&self, name: &str) -> Option<Student> { Gateway::find_by_name(self, name) }

  fn all_students(&self) -> Vec<Student> { Gateway::all_students(self) }

  fn insert(&self, student: &Student) { Gateway::insert(self, student) }
}
