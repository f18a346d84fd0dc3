//! Append-only CSV audit trails.
//!
//! Two trees live under the journal root:
//!
//! - `Log/checked_<year>.csv`: one line per accepted check-in,
//!   `[tz] dd/MM/yyyy HH:mm:ss;name;uid`.
//! - `Absents/absent_<name>_<year>_<month>.csv`: one line per missed window,
//!   `dd/MM/yyyy;window;name`.
//!
//! Files and parent directories are created on first write and never
//! truncated. Writers to the same file are serialised by a per-path lock.
//! Every write reports a [`LogOutcome`] which is also counted by the
//! journal's [`AuditMetrics`].

use std::{
  collections::HashMap,
  fmt::Display,
  fs::{self, OpenOptions},
  path::{Path, PathBuf},
  sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
  },
};

use chrono::{DateTime, Datelike, NaiveDate, TimeZone};

use crate::{Result, student::Student, window::TimeWindow};

// ─── Outcome & metrics ───────────────────────────────────────────────────────

/// What happened to a single audit write.
#[derive(Debug)]
pub enum LogOutcome {
  Written,
  /// Check-in logging is switched off in configuration.
  Disabled,
  Failed(crate::Error),
}

impl LogOutcome {
  pub fn is_written(&self) -> bool { matches!(self, Self::Written) }
}

/// Counters fed by every audit write.
#[derive(Debug, Default)]
pub struct AuditMetrics {
  written:  AtomicU64,
  disabled: AtomicU64,
  failed:   AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditSnapshot {
  pub written:  u64,
  pub disabled: u64,
  pub failed:   u64,
}

impl AuditMetrics {
  pub fn observe(&self, outcome: &LogOutcome) {
    let counter = match outcome {
      LogOutcome::Written => &self.written,
      LogOutcome::Disabled => &self.disabled,
      LogOutcome::Failed(_) => &self.failed,
    };
    counter.fetch_add(1, Ordering::Relaxed);
  }

  pub fn snapshot(&self) -> AuditSnapshot {
    AuditSnapshot {
      written:  self.written.load(Ordering::Relaxed),
      disabled: self.disabled.load(Ordering::Relaxed),
      failed:   self.failed.load(Ordering::Relaxed),
    }
  }
}

// ─── Journal ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Journal {
  root:       PathBuf,
  log_checks: bool,
  locks:      Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
  metrics:    AuditMetrics,
}

impl Journal {
  pub fn new(root: impl Into<PathBuf>, log_checks: bool) -> Self {
    Self {
      root: root.into(),
      log_checks,
      locks: Mutex::new(HashMap::new()),
      metrics: AuditMetrics::default(),
    }
  }

  pub fn root(&self) -> &Path { &self.root }

  pub fn metrics(&self) -> &AuditMetrics { &self.metrics }

  pub fn check_log_path(&self, year: i32) -> PathBuf {
    self.root.join("Log").join(format!("checked_{year}.csv"))
  }

  pub fn absence_log_path(&self, student: &Student, year: i32, month: u32) -> PathBuf {
    self.root.join("Absents").join(format!(
      "absent_{}_{year}_{month}.csv",
      file_safe(&student.name)
    ))
  }

  /// Append a check-in line to this year's log, if check logging is on.
  pub fn record_check<Tz>(&self, student: &Student, at: &DateTime<Tz>) -> LogOutcome
  where
    Tz: TimeZone,
    Tz::Offset: Display,
  {
    if !self.log_checks {
      return self.finish(LogOutcome::Disabled);
    }
    let path = self.check_log_path(at.year());
    let stamp = at.format("[%Z] %d/%m/%Y %H:%M:%S").to_string();
    let outcome = self.append(&path, &[&stamp, &student.name, student.uid.as_str()]);
    self.finish(outcome)
  }

  /// Append an absence line to the student's log for the month of `date`.
  pub fn record_absence(
    &self,
    student: &Student,
    window: &TimeWindow,
    date: NaiveDate,
  ) -> LogOutcome {
    let path = self.absence_log_path(student, date.year(), date.month());
    let day = date.format("%d/%m/%Y").to_string();
    let outcome = self.append(&path, &[&day, &window.display_string(), &student.name]);
    self.finish(outcome)
  }

  fn append(&self, path: &Path, record: &[&str]) -> LogOutcome {
    let lock = self.path_lock(path);
    let outcome = {
      let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
      match write_line(path, record) {
        Ok(()) => LogOutcome::Written,
        Err(e) => {
          tracing::error!(path = %path.display(), error = %e, "cannot write audit log");
          LogOutcome::Failed(e)
        }
      }
    };
    self.release(path, lock);
    outcome
  }

  fn path_lock(&self, path: &Path) -> Arc<Mutex<()>> {
    let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
    locks.entry(path.to_path_buf()).or_default().clone()
  }

  /// Drop the entry for `path` once no other writer holds or awaits it.
  fn release(&self, path: &Path, lock: Arc<Mutex<()>>) {
    let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
    // One reference in the map plus ours.
    if Arc::strong_count(&lock) == 2 {
      locks.remove(path);
    }
  }

  fn finish(&self, outcome: LogOutcome) -> LogOutcome {
    self.metrics.observe(&outcome);
    outcome
  }
}

fn write_line(path: &Path, record: &[&str]) -> Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }
  let file = OpenOptions::new().create(true).append(true).open(path)?;
  let mut writer = csv::WriterBuilder::new()
    .delimiter(b';')
    .has_headers(false)
    .from_writer(file);
  writer.write_record(record)?;
  writer.flush()?;
  Ok(())
}

/// Replace characters that cannot appear in a file name.
fn file_safe(name: &str) -> String {
  name
    .chars()
    .map(|c| {
      if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '\'') {
        c
      } else {
        '_'
      }
    })
    .collect()
}
