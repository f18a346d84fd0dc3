//! Groups of students and their per-session check state.
//!
//! A group owns the checked/unchecked flag of each member. The flags sit
//! behind a per-group mutex so badge events and absentee sweeps running on
//! different threads see a consistent view.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Timelike;

use crate::{student::Student, window::TimeWindow};

#[derive(Debug, Clone)]
struct Member {
  student: Student,
  checked: bool,
}

/// A named set of students, optionally restricted to some windows.
#[derive(Debug)]
pub struct Group {
  name:    String,
  windows: Vec<TimeWindow>,
  members: Mutex<Vec<Member>>,
}

impl Group {
  /// A group with no members. An empty `windows` list accepts check-ins at
  /// any time.
  pub fn new(name: impl Into<String>, windows: Vec<TimeWindow>) -> Self {
    Self {
      name: name.into(),
      windows,
      members: Mutex::new(Vec::new()),
    }
  }

  pub fn with_members(mut self, students: impl IntoIterator<Item = Student>) -> Self {
    let members = self
      .members
      .get_mut()
      .unwrap_or_else(PoisonError::into_inner);
    for student in students {
      if !members.iter().any(|m| m.student == student) {
        members.push(Member { student, checked: false });
      }
    }
    self
  }

  pub fn name(&self) -> &str { &self.name }

  pub fn windows(&self) -> &[TimeWindow] { &self.windows }

  fn lock(&self) -> MutexGuard<'_, Vec<Member>> {
    self.members.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Add `student` unchecked. Returns `false` if already a member.
  pub fn add_member(&self, student: Student) -> bool {
    let mut members = self.lock();
    if members.iter().any(|m| m.student == student) {
      return false;
    }
    members.push(Member { student, checked: false });
    true
  }

  pub fn remove_member(&self, student: &Student) -> bool {
    let mut members = self.lock();
    let before = members.len();
    members.retain(|m| &m.student != student);
    members.len() != before
  }

  pub fn is_member(&self, student: &Student) -> bool {
    self.lock().iter().any(|m| &m.student == student)
  }

  /// Whether this group takes check-ins at `at`.
  pub fn accepts_at<T: Timelike>(&self, at: &T) -> bool {
    self.windows.is_empty() || self.windows.iter().any(|w| w.contains(at))
  }

  /// Mark `student` as checked. Returns `true` if the mark was accepted,
  /// i.e. the student is a member and the group is open at `at`.
  pub fn check<T: Timelike>(&self, student: &Student, at: &T) -> bool {
    if !self.accepts_at(at) {
      return false;
    }
    match self.lock().iter_mut().find(|m| &m.student == student) {
      Some(member) => {
        member.checked = true;
        true
      }
      None => false,
    }
  }

  pub fn uncheck(&self, student: &Student) {
    if let Some(member) = self.lock().iter_mut().find(|m| &m.student == student) {
      member.checked = false;
    }
  }

  pub fn has_checked(&self, student: &Student) -> bool {
    self
      .lock()
      .iter()
      .any(|m| &m.student == student && m.checked)
  }

  pub fn members(&self) -> Vec<Student> {
    self.lock().iter().map(|m| m.student.clone()).collect()
  }

  pub fn checked_students(&self) -> Vec<Student> {
    self
      .lock()
      .iter()
      .filter(|m| m.checked)
      .map(|m| m.student.clone())
      .collect()
  }

  /// Members and the checked subset, read under a single lock.
  pub fn snapshot(&self) -> (Vec<Student>, Vec<Student>) {
    let members = self.lock();
    let all = members.iter().map(|m| m.student.clone()).collect();
    let checked = members
      .iter()
      .filter(|m| m.checked)
      .map(|m| m.student.clone())
      .collect();
    (all, checked)
  }

  /// Clear every checked flag.
  pub fn reset(&self) {
    for member in self.lock().iter_mut() {
      member.checked = false;
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveTime;

  use super::*;
  use crate::student::Uid;

  fn student(uid: &str, name: &str) -> Student {
    Student::new(Uid::parse(uid).unwrap(), name, false)
  }

  fn at(h: u32, m: u32) -> NaiveTime { NaiveTime::from_hms_opt(h, m, 0).unwrap() }

  #[test]
  fn check_requires_membership() {
    let alice = student("01", "Alice");
    let bob = student("02", "Bob");
    let group = Group::new("G1", vec![]).with_members([alice.clone()]);

    assert!(group.check(&alice, &at(9, 0)));
    assert!(!group.check(&bob, &at(9, 0)));
    assert!(group.has_checked(&alice));
    assert!(!group.has_checked(&bob));
  }

  #[test]
  fn check_respects_windows() {
    let alice = student("01", "Alice");
    let group = Group::new("G1", vec![TimeWindow::parse("9h00-10h00").unwrap()])
      .with_members([alice.clone()]);

    assert!(!group.check(&alice, &at(10, 30)));
    assert!(!group.has_checked(&alice));
    assert!(group.check(&alice, &at(9, 30)));
  }

  #[test]
  fn uncheck_and_reset() {
    let alice = student("01", "Alice");
    let bob = student("02", "Bob");
    let group = Group::new("G1", vec![]).with_members([alice.clone(), bob.clone()]);

    group.check(&alice, &at(9, 0));
    group.check(&bob, &at(9, 0));
    group.uncheck(&alice);
    assert_eq!(group.checked_students(), vec![bob.clone()]);

    group.reset();
    assert!(group.checked_students().is_empty());
    assert_eq!(group.members().len(), 2);
  }

  #[test]
  fn membership_is_unique() {
    let alice = student("01", "Alice");
    let group = Group::new("G1", vec![]).with_members([alice.clone(), alice.clone()]);
    assert_eq!(group.members().len(), 1);
    assert!(!group.add_member(alice.clone()));
    assert!(group.remove_member(&alice));
    assert!(!group.is_member(&alice));
  }

  #[test]
  fn snapshot_pairs_members_with_checked() {
    let alice = student("01", "Alice");
    let bob = student("02", "Bob");
    let group = Group::new("G1", vec![]).with_members([alice.clone(), bob]);
    group.check(&alice, &at(9, 0));

    let (all, checked) = group.snapshot();
    assert_eq!(all.len(), 2);
    assert_eq!(checked, vec![alice]);
  }
}
