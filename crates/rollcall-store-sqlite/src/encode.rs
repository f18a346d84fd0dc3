//! Conversions between identity rows and [`Student`] records.
//!
//! The staff flag is stored as `0`/`1`. Rows whose UID is not a valid card
//! identifier are skipped with a warning rather than failing the whole read.

use rollcall_core::student::{Student, Uid};

use crate::{
  schema::{NAME_COLUMN, STAFF_COLUMN, UID_COLUMN},
  statement::Row,
};

pub fn encode_staff(staff: bool) -> i64 { i64::from(staff) }

pub fn decode_staff(row: &Row) -> bool {
  row
    .get(STAFF_COLUMN)
    .and_then(|v| v.as_integer())
    .is_some_and(|i| i == 1)
}

pub fn decode_student(row: &Row) -> Option<Student> {
  let raw_uid = row.get(UID_COLUMN)?.as_text()?;
  let uid = match Uid::parse(raw_uid) {
    Ok(uid) => uid,
    Err(e) => {
      tracing::warn!(uid = raw_uid, error = %e, "skipping stored row with bad uid");
      return None;
    }
  };
  let name = row
    .get(NAME_COLUMN)
    .and_then(|v| v.as_text())
    .unwrap_or_default();
  Some(Student::new(uid, name, decode_staff(row)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::statement::Value;

  fn row(uid: Value, name: Value, staff: Value) -> Row {
    Row::new(vec![
      ("UID".into(), uid),
      ("Name".into(), name),
      ("Staff".into(), staff),
    ])
  }

  #[test]
  fn decodes_a_full_row() {
    let s = decode_student(&row("0a1b".into(), "Ada".into(), Value::Integer(1))).unwrap();
    assert_eq!(s.uid.as_str(), "0A1B");
    assert_eq!(s.name, "Ada");
    assert!(s.staff);
  }

  #[test]
  fn staff_accepts_textual_flag() {
    let s = decode_student(&row("01".into(), "Bob".into(), "1".into())).unwrap();
    assert!(s.staff);
    let s = decode_student(&row("01".into(), "Bob".into(), Value::Null)).unwrap();
    assert!(!s.staff);
  }

  #[test]
  fn bad_uid_is_skipped() {
    assert!(decode_student(&row("zz".into(), "Bob".into(), Value::Integer(0))).is_none());
    assert!(decode_student(&row(Value::Null, "Bob".into(), Value::Integer(0))).is_none());
  }
}
