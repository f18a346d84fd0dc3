//! Badge events read from the reader's line stream.
//!
//! One event per line: `<uid>` or `<uid> <rfc3339 timestamp>`. Blank lines
//! and lines starting with `#` carry no event.

use chrono::{DateTime, FixedOffset};
use rollcall_core::{attendance::Attendance, directory::StudentDirectory, student::Student};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeEvent {
  /// The card UID as read, not yet normalised.
  pub uid: String,
  /// When the card was presented; `None` means "now".
  pub at:  Option<DateTime<FixedOffset>>,
}

pub fn parse_line(line: &str) -> Result<Option<BadgeEvent>, chrono::ParseError> {
  let line = line.trim();
  if line.is_empty() || line.starts_with('#') {
    return Ok(None);
  }
  let (uid, rest) = match line.split_once(char::is_whitespace) {
    Some((uid, rest)) => (uid, rest.trim()),
    None => (line, ""),
  };
  let at = match rest {
    "" => None,
    ts => Some(DateTime::parse_from_rfc3339(ts)?),
  };
  Ok(Some(BadgeEvent { uid: uid.to_string(), at }))
}

/// What became of one badge event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  Checked(Student),
  /// Known card, but no group accepts it at this time.
  Rejected(Student),
  Unknown(String),
}

/// Resolve `event` (falling back to the store) and check the student in.
///
/// A card found only in the store is added to the in-memory roster.
pub fn apply<D: StudentDirectory>(
  attendance: &Attendance<D>,
  event: &BadgeEvent,
  now: DateTime<FixedOffset>,
) -> Outcome {
  let Some(student) = attendance.resolve_uid(&event.uid, true) else {
    return Outcome::Unknown(event.uid.clone());
  };
  attendance.remember(student.clone());
  if attendance.check_student(&student, &event.at.unwrap_or(now)) {
    Outcome::Checked(student)
  } else {
    Outcome::Rejected(student)
  }
}
