//! The `StudentDirectory` trait.
//!
//! The trait is implemented by persistence backends (e.g.
//! `rollcall-store-sqlite`). The attendance coordinator depends on this
//! abstraction, not on any concrete backend.

use std::sync::Arc;

use crate::student::{Student, Uid};

/// Lookup and registration of identity records in durable storage.
///
/// Failures are absorbed by the implementation: a lookup that errors is
/// indistinguishable from a lookup that finds nothing, and an insert that
/// fails is logged by the backend and otherwise ignored.
pub trait StudentDirectory: Send + Sync {
  /// The record stored for `uid`, if any.
  fn find_by_uid(&self, uid: &Uid) -> Option<Student>;

  /// The first record whose name matches `name`, if any.
  fn find_by_name(&self, name: &str) -> Option<Student>;

  /// Every stored record. Empty when the store is unreachable.
  fn all_students(&self) -> Vec<Student>;

  /// Persist `student`. Duplicate UIDs are rejected by the store silently.
  fn insert(&self, student: &Student);
}

impl<D: StudentDirectory + ?Sized> StudentDirectory for Arc<D> {
  fn find_by_uid(&self, uid: &Uid) -> Option<Student> { (**self).find_by_uid(uid) }

  fn find_by_name(&self, name: &str) -> Option<Student> { (**self).find_by_name(name) }

  fn all_students(&self) -> Vec<Student> { (**self).all_students() }

  fn insert(&self, student: &Student) { (**self).insert(student) }
}

/// A directory with nothing in it, for deployments without a store.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDirectory;

impl StudentDirectory for NoDirectory {
  fn find_by_uid(&self, _: &Uid) -> Option<Student> { None }

  fn find_by_name(&self, _: &str) -> Option<Student> { None }

  fn all_students(&self) -> Vec<Student> { Vec::new() }

  fn insert(&self, _: &Student) {}
}
