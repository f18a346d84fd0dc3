//! Plain-text SQL scripts: exporting the roster and replaying external
//! scripts through the gateway.

use std::{fs, path::Path};

use rollcall_core::student::Student;

use crate::{
  Result,
  connector::Connector,
  encode::encode_staff,
  gateway::Gateway,
  schema::{NAME_COLUMN, STAFF_COLUMN, TableName, UID_COLUMN, column_definitions},
  statement::Statement,
};

/// A SQL string literal with embedded quotes doubled.
fn quote(text: &str) -> String { format!("'{}'", text.replace('\'', "''")) }

/// Render a script that recreates `table` holding exactly `students`.
pub fn export_script(table: &TableName, students: &[Student]) -> String {
  let mut out = String::new();
  out.push_str("-- ---------------------------\n");
  out.push_str("-- STRUCTURE\n");
  out.push_str("-- ---------------------------\n");
  out.push_str(&format!("DROP TABLE IF EXISTS {table};\n"));
  out.push_str(&format!("CREATE TABLE {table} ({});\n", column_definitions()));
  out.push('\n');
  out.push_str("-- ---------------------------\n");
  out.push_str("-- DATA\n");
  out.push_str("-- ---------------------------\n");
  for student in students {
    out.push_str(&format!(
      "INSERT INTO {table} ({UID_COLUMN}, {NAME_COLUMN}, {STAFF_COLUMN}) VALUES ({}, {}, {});\n",
      quote(student.uid.as_str()),
      quote(&student.name),
      encode_staff(student.staff),
    ));
  }
  out
}

pub fn write_export(path: &Path, table: &TableName, students: &[Student]) -> Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }
  fs::write(path, export_script(table, students))?;
  Ok(())
}

/// The executable lines of `script`.
///
/// Blank lines and `--` comments are dropped. A line starting with `/*`
/// opens a block comment that runs through the next line ending with `*/`.
pub fn statements(script: &str) -> Vec<&str> {
  let mut out = Vec::new();
  let mut in_block = false;
  for line in script.lines().map(str::trim) {
    if line.is_empty() {
      continue;
    }
    if line.starts_with("/*") {
      in_block = true;
    }
    if !in_block && !line.starts_with("--") {
      out.push(line);
    }
    if line.ends_with("*/") {
      in_block = false;
    }
  }
  out
}

/// Replay `script` line by line through [`Gateway::update`].
///
/// Returns the total number of affected rows. Lines that fail are logged by
/// the gateway and contribute nothing.
pub fn import_script<C: Connector>(gateway: &Gateway<C>, script: &str) -> usize {
  statements(script)
    .into_iter()
    .map(|line| gateway.update(&Statement::new(line)))
    .sum()
}

pub fn import_file<C: Connector>(gateway: &Gateway<C>, path: &Path) -> Result<usize> {
  let script = fs::read_to_string(path)?;
  Ok(import_script(gateway, &script))
}
