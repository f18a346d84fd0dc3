//! Attendance coordination: resolving badges to students, checking them in
//! across groups, and sweeping absentees once a window has closed.
//!
//! [`Attendance`] is the context object built once at startup. It owns the
//! in-memory roster, the groups, the audit journal and a handle to the
//! student directory, and is shared by reference between the badge consumer
//! and the sweep.

use std::{
  collections::HashSet,
  fmt::Display,
  hash::Hash,
  sync::{PoisonError, RwLock},
};

use chrono::{DateTime, NaiveDate, TimeZone};

use crate::{
  directory::StudentDirectory,
  group::Group,
  journal::{Journal, LogOutcome},
  student::{Student, Uid},
  window::TimeWindow,
};

/// Result of an absentee sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
  pub absentees: Vec<Student>,
  /// Absence lines that could not be written.
  pub failed:    usize,
}

pub struct Attendance<D> {
  roster:    RwLock<Vec<Student>>,
  groups:    Vec<Group>,
  journal:   Journal,
  directory: D,
}

impl<D: StudentDirectory> Attendance<D> {
  pub fn new(roster: Vec<Student>, groups: Vec<Group>, journal: Journal, directory: D) -> Self {
    Self {
      roster: RwLock::new(deduplicate(roster)),
      groups,
      journal,
      directory,
    }
  }

  pub fn groups(&self) -> &[Group] { &self.groups }

  pub fn journal(&self) -> &Journal { &self.journal }

  pub fn directory(&self) -> &D { &self.directory }

  pub fn roster(&self) -> Vec<Student> {
    self.roster.read().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Add `student` to the in-memory roster unless already known.
  pub fn remember(&self, student: Student) {
    let mut roster = self.roster.write().unwrap_or_else(PoisonError::into_inner);
    if !roster.contains(&student) {
      roster.push(student);
    }
  }

  // ── Resolution ────────────────────────────────────────────────────────────

  /// Look a card up in the roster, then optionally in the directory.
  ///
  /// `raw` may contain hyphens and any letter case. A malformed UID resolves
  /// to `None`.
  pub fn resolve_uid(&self, raw: &str, allow_store_fallback: bool) -> Option<Student> {
    let uid = match Uid::parse(raw) {
      Ok(uid) => uid,
      Err(e) => {
        tracing::debug!(raw, error = %e, "unresolvable uid");
        return None;
      }
    };
    let known = self
      .roster
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .iter()
      .find(|s| s.uid == uid)
      .cloned();

    known.or_else(|| {
      allow_store_fallback
        .then(|| self.directory.find_by_uid(&uid))
        .flatten()
    })
  }

  /// Look a name up (case-insensitively) in the roster, then optionally in
  /// the directory.
  pub fn resolve_name(&self, name: &str, allow_store_fallback: bool) -> Option<Student> {
    let known = self
      .roster
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .iter()
      .find(|s| s.is(name))
      .cloned();

    known.or_else(|| {
      allow_store_fallback
        .then(|| self.directory.find_by_name(name.trim()))
        .flatten()
    })
  }

  // ── Check state ───────────────────────────────────────────────────────────

  /// Mark `student` checked in every group that accepts it at `at`.
  ///
  /// Returns `true` if at least one group accepted the mark. An accepted
  /// check-in is appended to the audit journal; a failed audit write never
  /// changes the returned decision.
  pub fn check_student<Tz>(&self, student: &Student, at: &DateTime<Tz>) -> bool
  where
    Tz: TimeZone,
    Tz::Offset: Display,
  {
    let mut accepted = false;
    for group in &self.groups {
      accepted |= group.check(student, at);
    }
    if accepted
      && let LogOutcome::Failed(e) = self.journal.record_check(student, at)
    {
      tracing::warn!(uid = %student.uid, error = %e, "check-in accepted but not journaled");
    }
    accepted
  }

  pub fn uncheck_student(&self, student: &Student) {
    for group in &self.groups {
      group.uncheck(student);
    }
  }

  pub fn has_checked(&self, student: &Student) -> bool {
    self.groups.iter().any(|g| g.has_checked(student))
  }

  // ── Absentees ─────────────────────────────────────────────────────────────

  /// Journal one absence line for every student in `all` not in `checked`.
  ///
  /// Not transactional: a crash part-way leaves the lines already written.
  pub fn compute_absentees(
    &self,
    window: &TimeWindow,
    all: &[Student],
    checked: &[Student],
    date: NaiveDate,
  ) -> SweepReport {
    let checked: HashSet<&Student> = checked.iter().collect();
    let mut report = SweepReport::default();

    for student in all.iter().filter(|s| !checked.contains(s)) {
      tracing::info!(uid = %student.uid, name = %student.name, window = %window, "student is missing");
      if !self.journal.record_absence(student, window, date).is_written() {
        report.failed += 1;
      }
      report.absentees.push(student.clone());
    }
    report
  }

  /// Sweep one group for `window`, then clear its check state.
  pub fn sweep_group(&self, group: &Group, window: &TimeWindow, date: NaiveDate) -> SweepReport {
    let (all, checked) = group.snapshot();
    let report = self.compute_absentees(window, &all, &checked, date);
    group.reset();
    report
  }

  /// Sweep every group that uses `window`.
  pub fn sweep_window(&self, window: &TimeWindow, date: NaiveDate) -> SweepReport {
    let mut total = SweepReport::default();
    for group in self.groups.iter().filter(|g| g.windows().contains(window)) {
      let report = self.sweep_group(group, window, date);
      tracing::info!(
        group = group.name(),
        window = %window,
        absentees = report.absentees.len(),
        "absentee sweep done"
      );
      total.absentees.extend(report.absentees);
      total.failed += report.failed;
    }
    total
  }

  // ── Roster reconciliation ─────────────────────────────────────────────────

  /// The in-memory roster followed by the directory's snapshot, without
  /// duplicates.
  pub fn refreshed_roster(&self) -> Vec<Student> {
    let mut merged = self.roster();
    merged.extend(self.directory.all_students());
    deduplicate(merged)
  }

  /// Replace the in-memory roster with [`Self::refreshed_roster`].
  pub fn refresh(&self) -> usize {
    let merged = self.refreshed_roster();
    let len = merged.len();
    *self.roster.write().unwrap_or_else(PoisonError::into_inner) = merged;
    len
  }
}

// ─── List helpers ────────────────────────────────────────────────────────────

/// Drop repeated elements, keeping the first occurrence of each.
pub fn deduplicate<T: Eq + Hash + Clone>(list: Vec<T>) -> Vec<T> {
  let mut seen = HashSet::with_capacity(list.len());
  list.into_iter().filter(|item| seen.insert(item.clone())).collect()
}

/// Remove every element equal to one in `to_remove`, preserving order.
pub fn remove_students(mut list: Vec<Student>, to_remove: &[Student]) -> Vec<Student> {
  list.retain(|s| !to_remove.contains(s));
  list
}
