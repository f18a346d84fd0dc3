//! Reader configuration, deserialised from `rollcall.toml` and `ROLLCALL__*`
//! environment variables.

use std::path::{Path, PathBuf};

use rollcall_core::{
  group::Group,
  student::{Student, Uid},
  window::TimeWindow,
};
use rollcall_store_sqlite::{ConnectParams, TableName};
use serde::Deserialize;

// ─── Shape ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ReaderConfig {
  #[serde(default = "default_data_dir")]
  pub data_dir:            PathBuf,
  #[serde(default)]
  pub log_checks:          bool,
  #[serde(default)]
  pub windows:             Vec<String>,
  #[serde(default = "default_sweep_interval")]
  pub sweep_interval_secs: u64,
  #[serde(default)]
  pub store:               StoreConfig,
  #[serde(default)]
  pub groups:              Vec<GroupConfig>,
}

/// Connection settings for the identity table.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
  #[serde(default)]
  pub host:     String,
  #[serde(default)]
  pub port:     u16,
  #[serde(default = "default_database")]
  pub database: String,
  #[serde(default)]
  pub user:     String,
  #[serde(default)]
  pub password: String,
  #[serde(default)]
  pub table:    TableName,
}

/// A named set of members checked in during its windows.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
  pub name:    String,
  #[serde(default)]
  pub windows: Vec<String>,
  /// Member badge UIDs.
  #[serde(default)]
  pub members: Vec<String>,
}

fn default_data_dir() -> PathBuf { PathBuf::from("./RFID") }

fn default_sweep_interval() -> u64 { 30 }

fn default_database() -> String { "rollcall.db".to_string() }

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      host:     String::new(),
      port:     0,
      database: default_database(),
      user:     String::new(),
      password: String::new(),
      table:    TableName::default(),
    }
  }
}

// ─── Loading ──────────────────────────────────────────────────────────────────

impl ReaderConfig {
  /// Layer `ROLLCALL__*` environment variables over the optional file at
  /// `path`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("ROLLCALL").separator("__"))
      .build()?
      .try_deserialize()
  }

  /// Every parseable top-level window, in file order.
  pub fn windows(&self) -> Vec<TimeWindow> { TimeWindow::load_all(&self.windows) }

  pub fn export_path(&self) -> PathBuf { self.data_dir.join("SQLExport.sql") }

  /// Build the configured groups, resolving member UIDs against `known`.
  ///
  /// Members missing from `known` are logged and left out.
  pub fn build_groups(&self, known: &[Student]) -> Vec<Group> {
    self.groups.iter().map(|g| g.build(known)).collect()
  }
}

impl StoreConfig {
  pub fn connect_params(&self) -> ConnectParams {
    ConnectParams {
      host:     self.host.clone(),
      port:     self.port,
      database: self.database.clone(),
      user:     self.user.clone(),
      password: self.password.clone(),
    }
  }
}

impl GroupConfig {
  fn build(&self, known: &[Student]) -> Group {
    let members = self.members.iter().filter_map(|raw| {
      let found = Uid::parse(raw)
        .ok()
        .and_then(|uid| known.iter().find(|s| s.uid == uid).cloned());
      if found.is_none() {
        tracing::warn!(group = %self.name, uid = %raw, "unknown group member");
      }
      found
    });
    Group::new(&self.name, TimeWindow::load_all(&self.windows)).with_members(members)
  }
}
