//! Gateway tests: the reconnect policy against a scripted connector, and the
//! identity table against real SQLite files.

use std::{
  collections::HashSet,
  fs,
  sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  },
  thread,
  time::Duration,
};

use rollcall_core::{
  attendance::Attendance,
  journal::Journal,
  student::{Student, Uid},
};
use tempfile::TempDir;

use crate::{
  ConnectParams, Connection, Connector, Error, Gateway, Result, Row, SqliteConnector,
  SqliteGateway, Statement, TableName, Value, script,
};

// ─── Scripted connector ──────────────────────────────────────────────────────

/// Shared knobs and counters for the fake connection.
#[derive(Default)]
struct Script {
  connects:            AtomicUsize,
  refuse_connects:     AtomicUsize,
  transient_failures:  AtomicUsize,
  persistent_failures: AtomicUsize,
  in_flight:           AtomicUsize,
  max_in_flight:       AtomicUsize,
  executed:            Mutex<Vec<String>>,
  databases:           Mutex<Vec<String>>,
}

/// Consume one unit of `counter` if any is left.
fn take(counter: &AtomicUsize) -> bool {
  counter
    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
    .is_ok()
}

struct FakeConnector(Arc<Script>);

struct FakeConnection(Arc<Script>);

impl FakeConnection {
  fn step(&self, stmt: &Statement) -> Result<()> {
    let now = self.0.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    self.0.max_in_flight.fetch_max(now, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(1));
    self.0.in_flight.fetch_sub(1, Ordering::SeqCst);

    self.0.executed.lock().unwrap().push(stmt.sql().to_owned());
    // Schema DDL never fails so failure budgets only hit caller statements.
    if stmt.sql().starts_with("CREATE TABLE") {
      return Ok(());
    }
    if take(&self.0.transient_failures) {
      return Err(Error::ConnectionLost("socket closed".into()));
    }
    if take(&self.0.persistent_failures) {
      return Err(Error::Database(rusqlite::Error::InvalidQuery));
    }
    Ok(())
  }
}

impl Connection for FakeConnection {
  fn query(&mut self, stmt: &Statement) -> Result<Vec<Row>> {
    self.step(stmt)?;
    Ok(vec![Row::new(vec![("n".into(), Value::Integer(1))])])
  }

  fn execute(&mut self, stmt: &Statement) -> Result<usize> {
    self.step(stmt)?;
    Ok(1)
  }
}

impl Connector for FakeConnector {
  type Connection = FakeConnection;

  fn connect(&self, params: &ConnectParams) -> Result<FakeConnection> {
    self.0.connects.fetch_add(1, Ordering::SeqCst);
    self.0.databases.lock().unwrap().push(params.database.clone());
    if take(&self.0.refuse_connects) {
      return Err(Error::Connect {
        target: params.host.clone(),
        reason: "connection refused".into(),
      });
    }
    Ok(FakeConnection(Arc::clone(&self.0)))
  }
}

fn params(database: &str) -> ConnectParams {
  ConnectParams {
    host:     "db.example".into(),
    port:     3306,
    database: database.into(),
    user:     "reader".into(),
    password: "secret".into(),
  }
}

fn fake(script: &Arc<Script>) -> Gateway<FakeConnector> {
  Gateway::connect(FakeConnector(Arc::clone(script)), params("attendance"), TableName::default())
}

fn select() -> Statement { Statement::new("SELECT n") }

fn insert() -> Statement { Statement::new("INSERT INTO t VALUES (?)").bind(1_i64) }

// ─── Retry policy ────────────────────────────────────────────────────────────

#[test]
fn connect_runs_schema_once() {
  let script = Arc::new(Script::default());
  let gw = fake(&script);

  assert!(gw.is_connected());
  assert_eq!(script.connects.load(Ordering::SeqCst), 1);
  let executed = script.executed.lock().unwrap().clone();
  assert_eq!(executed.len(), 1);
  assert!(executed[0].starts_with("CREATE TABLE IF NOT EXISTS Users"));
}

#[test]
fn query_recovers_after_one_transient_failure() {
  let script = Arc::new(Script::default());
  let gw = fake(&script);
  script.transient_failures.store(1, Ordering::SeqCst);

  assert_eq!(gw.query(&select()).len(), 1);
  assert_eq!(script.connects.load(Ordering::SeqCst), 2);
  assert!(gw.is_connected());
}

#[test]
fn update_recovers_after_one_transient_failure() {
  let script = Arc::new(Script::default());
  let gw = fake(&script);
  script.transient_failures.store(1, Ordering::SeqCst);

  assert_eq!(gw.update(&insert()), 1);
  assert_eq!(script.connects.load(Ordering::SeqCst), 2);
}

#[test]
fn second_transient_failure_gives_up_after_one_reconnect() {
  let script = Arc::new(Script::default());
  let gw = fake(&script);
  script.transient_failures.store(2, Ordering::SeqCst);

  assert!(gw.query(&select()).is_empty());
  assert_eq!(script.connects.load(Ordering::SeqCst), 2);
  assert!(!gw.is_connected());

  // Disconnected: no further attempts until an explicit reconnect.
  assert_eq!(gw.update(&insert()), 0);
  assert_eq!(script.connects.load(Ordering::SeqCst), 2);
}

#[test]
fn update_returns_zero_when_retry_fails() {
  let script = Arc::new(Script::default());
  let gw = fake(&script);
  script.transient_failures.store(2, Ordering::SeqCst);

  assert_eq!(gw.update(&insert()), 0);
  assert_eq!(script.connects.load(Ordering::SeqCst), 2);
}

#[test]
fn persistent_failure_is_not_retried() {
  let script = Arc::new(Script::default());
  let gw = fake(&script);
  script.persistent_failures.store(1, Ordering::SeqCst);

  assert_eq!(gw.update(&insert()), 0);
  assert_eq!(script.connects.load(Ordering::SeqCst), 1);
  assert!(gw.is_connected());
  assert_eq!(gw.update(&insert()), 1);
}

#[test]
fn refused_reconnect_leaves_gateway_disconnected() {
  let script = Arc::new(Script::default());
  let gw = fake(&script);
  script.transient_failures.store(1, Ordering::SeqCst);
  script.refuse_connects.store(1, Ordering::SeqCst);

  assert!(gw.query(&select()).is_empty());
  assert_eq!(script.connects.load(Ordering::SeqCst), 2);
  assert!(!gw.is_connected());
}

#[test]
fn refused_initial_connect_makes_statements_no_ops() {
  let script = Arc::new(Script { refuse_connects: AtomicUsize::new(1), ..Script::default() });
  let gw = fake(&script);

  assert!(!gw.is_connected());
  assert!(gw.query(&select()).is_empty());
  assert_eq!(gw.update(&insert()), 0);
  assert!(gw.find_by_uid(&Uid::parse("01").unwrap()).is_none());
  assert_eq!(script.connects.load(Ordering::SeqCst), 1);
  assert!(script.executed.lock().unwrap().is_empty());

  assert!(gw.reconnect(params("attendance")));
  assert_eq!(gw.update(&insert()), 1);
}

#[test]
fn reconnect_adopts_new_parameters() {
  let script = Arc::new(Script::default());
  let gw = fake(&script);
  script.transient_failures.store(1, Ordering::SeqCst);

  assert!(gw.reconnect(params("other")));
  gw.query(&select());

  // The transient retry reuses the most recent parameters.
  assert_eq!(*script.databases.lock().unwrap(), vec!["attendance", "other", "other"]);
}

#[test]
fn statements_never_overlap() {
  let script = Arc::new(Script::default());
  let gw = Arc::new(fake(&script));

  let handles: Vec<_> = (0..8)
    .map(|_| {
      let gw = Arc::clone(&gw);
      thread::spawn(move || {
        for _ in 0..10 {
          assert_eq!(gw.update(&insert()), 1);
        }
      })
    })
    .collect();
  for h in handles {
    h.join().unwrap();
  }

  assert_eq!(script.max_in_flight.load(Ordering::SeqCst), 1);
  assert_eq!(script.executed.lock().unwrap().len(), 81);
}

#[test]
fn error_classification() {
  use rusqlite::ffi;

  let busy = Error::Database(rusqlite::Error::SqliteFailure(ffi::Error::new(ffi::SQLITE_BUSY), None));
  let constraint = Error::Database(rusqlite::Error::SqliteFailure(
    ffi::Error::new(ffi::SQLITE_CONSTRAINT),
    None,
  ));
  assert!(busy.is_transient());
  assert!(Error::ConnectionLost("eof".into()).is_transient());
  assert!(!constraint.is_transient());
  assert!(!Error::InvalidTableName("x y".into()).is_transient());
}

// ─── SQLite ──────────────────────────────────────────────────────────────────

fn sqlite_params(dir: &TempDir, database: &str) -> ConnectParams {
  ConnectParams {
    host:     dir.path().display().to_string(),
    port:     0,
    database: database.into(),
    user:     String::new(),
    password: String::new(),
  }
}

fn sqlite(dir: &TempDir) -> SqliteGateway {
  Gateway::connect(SqliteConnector::default(), sqlite_params(dir, "rollcall.db"), TableName::default())
}

fn student(uid: &str, name: &str, staff: bool) -> Student {
  Student::new(Uid::parse(uid).unwrap(), name, staff)
}

#[test]
fn schema_survives_reconnects() {
  let dir = TempDir::new().unwrap();
  let ada = student("0A1B", "Ada Lovelace", true);
  {
    let gw = sqlite(&dir);
    assert!(gw.is_connected());
    gw.insert(&ada);
  }
  let gw = sqlite(&dir);
  gw.ensure_schema();

  let found = gw.find_by_uid(&ada.uid).unwrap();
  assert_eq!(found, ada);
  assert_eq!(found.name, "Ada Lovelace");
  assert!(found.staff);
}

#[test]
fn lookups_by_name_ignore_case() {
  let dir = TempDir::new().unwrap();
  let gw = sqlite(&dir);
  gw.insert(&student("01", "Grace Hopper", false));

  assert_eq!(gw.find_by_name("grace hopper").map(|s| s.name), Some("Grace Hopper".into()));
  assert!(gw.find_by_name("Alan Turing").is_none());
  assert!(gw.find_by_uid(&Uid::parse("02").unwrap()).is_none());
}

#[test]
fn duplicate_insert_is_swallowed() {
  let dir = TempDir::new().unwrap();
  let gw = sqlite(&dir);
  gw.insert(&student("01", "First", false));
  gw.insert(&student("01", "Second", false));

  let all = gw.all_students();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].name, "First");
  assert!(gw.is_connected());
}

#[test]
fn hostile_names_are_stored_verbatim() {
  let dir = TempDir::new().unwrap();
  let gw = sqlite(&dir);
  let name = "Robert\"); DROP TABLE Users; -- '";
  gw.insert(&student("01", name, false));

  assert_eq!(gw.find_by_name(name).map(|s| s.name), Some(name.to_owned()));
  assert_eq!(gw.all_students().len(), 1);
}

#[test]
fn unreachable_database_degrades_to_empty_results() {
  let dir = TempDir::new().unwrap();
  let blocker = dir.path().join("not-a-dir");
  fs::write(&blocker, b"").unwrap();
  let params = ConnectParams {
    host: blocker.display().to_string(),
    ..sqlite_params(&dir, "rollcall.db")
  };
  let gw = Gateway::connect(SqliteConnector::default(), params, TableName::default());

  assert!(!gw.is_connected());
  assert!(gw.all_students().is_empty());
  assert!(gw.find_by_uid(&Uid::parse("01").unwrap()).is_none());

  assert!(gw.reconnect(sqlite_params(&dir, "rollcall.db")));
  gw.insert(&student("01", "Back Online", false));
  assert_eq!(gw.all_students().len(), 1);
}

#[test]
fn custom_table_name() {
  let dir = TempDir::new().unwrap();
  let table = TableName::new("Badges").unwrap();
  let gw = Gateway::connect(SqliteConnector::default(), sqlite_params(&dir, "rollcall.db"), table);
  gw.insert(&student("01", "Ada", false));

  let rows = gw.query(&Statement::new("SELECT COUNT(*) AS n FROM Badges"));
  assert_eq!(rows[0].get("n"), Some(&Value::Integer(1)));
}

#[test]
fn export_then_import_reproduces_the_roster() {
  let dir = TempDir::new().unwrap();
  let source = sqlite(&dir);
  let roster = vec![
    student("01", "Ada Lovelace", false),
    student("02", "Miles O'Brien", true),
    student("03", "Grace Hopper", false),
  ];
  for s in &roster {
    source.insert(s);
  }

  let path = dir.path().join("export").join("SQLExport.sql");
  script::write_export(&path, source.table(), &source.all_students()).unwrap();

  let target = Gateway::connect(
    SqliteConnector::default(),
    sqlite_params(&dir, "imported.db"),
    TableName::default(),
  );
  target.insert(&student("99", "Stale Entry", false));
  let affected = script::import_file(&target, &path).unwrap();
  assert!(affected >= roster.len());

  let imported: HashSet<(String, String, bool)> = target
    .all_students()
    .into_iter()
    .map(|s| (s.uid.to_string(), s.name, s.staff))
    .collect();
  let expected: HashSet<(String, String, bool)> = roster
    .into_iter()
    .map(|s| (s.uid.to_string(), s.name, s.staff))
    .collect();
  assert_eq!(imported, expected);
}

#[test]
fn gateway_backs_attendance_lookups() {
  let dir = TempDir::new().unwrap();
  let gw = Arc::new(sqlite(&dir));
  let ada = student("0A", "Ada", false);
  let bob = student("0B", "Bob", false);
  gw.insert(&bob);

  let attendance = Attendance::new(
    vec![ada.clone()],
    vec![],
    Journal::new(dir.path().join("journal"), false),
    Arc::clone(&gw),
  );

  assert_eq!(attendance.resolve_uid("0b", true), Some(bob.clone()));
  assert_eq!(attendance.resolve_uid("0b", false), None);
  assert_eq!(attendance.refreshed_roster(), vec![ada, bob]);
}
