//! Identity records: card UIDs and the people they belong to.

use std::{
  fmt,
  hash::{Hash, Hasher},
  str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Longest UID the persistence schema can hold.
pub const MAX_UID_LEN: usize = 18;

// ─── Uid ─────────────────────────────────────────────────────────────────────

/// A normalised card identifier: hexadecimal, upper-case, hyphens removed.
///
/// `04-a2-3f-9b` and `04A23F9B` are the same UID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uid(String);

impl Uid {
  pub fn parse(raw: &str) -> Result<Self> {
    let normalised: String = raw
      .trim()
      .chars()
      .filter(|c| *c != '-')
      .map(|c| c.to_ascii_uppercase())
      .collect();

    if normalised.is_empty()
      || normalised.len() > MAX_UID_LEN
      || !normalised.chars().all(|c| c.is_ascii_hexdigit())
    {
      return Err(Error::InvalidUid(raw.to_owned()));
    }
    Ok(Self(normalised))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Uid {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl FromStr for Uid {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

impl TryFrom<String> for Uid {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::parse(&value) }
}

impl From<Uid> for String {
  fn from(uid: Uid) -> Self { uid.0 }
}

// ─── Student ─────────────────────────────────────────────────────────────────

/// A person known to the reader, student or staff.
///
/// Equality and hashing use the UID only, so two records for the same card
/// are the same person even if their names differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
  pub uid:   Uid,
  pub name:  String,
  #[serde(default)]
  pub staff: bool,
}

impl Student {
  pub fn new(uid: Uid, name: impl Into<String>, staff: bool) -> Self {
    Self { uid, name: name.into().trim().to_owned(), staff }
  }

  /// Case-insensitive match against the full name.
  pub fn is(&self, name: &str) -> bool {
    self.name.to_lowercase() == name.trim().to_lowercase()
  }

  /// Everything before the last word of the name.
  pub fn first_name(&self) -> &str {
    match self.name.rsplit_once(char::is_whitespace) {
      Some((first, _)) => first.trim_end(),
      None => "",
    }
  }

  /// The last word of the name.
  pub fn last_name(&self) -> &str {
    match self.name.rsplit_once(char::is_whitespace) {
      Some((_, last)) => last,
      None => &self.name,
    }
  }
}

impl PartialEq for Student {
  fn eq(&self, other: &Self) -> bool { self.uid == other.uid }
}

impl Eq for Student {}

impl Hash for Student {
  fn hash<H: Hasher>(&self, state: &mut H) { self.uid.hash(state); }
}

impl fmt::Display for Student {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.name, self.uid)
  }
}

/// Whether `student` appears in `students`.
pub fn contains_student(students: &[Student], student: &Student) -> bool {
  students.iter().any(|s| s == student)
}
