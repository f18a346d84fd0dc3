//! `rollcall` badge reader binary.
//!
//! Reads `rollcall.toml` (or the path given with `--config`), opens the
//! identity store and consumes badge events from stdin, one per line.
//!
//! ```
//! rollcall --config /etc/rollcall.toml run < /dev/ttyACM0
//! rollcall export-sql --out backup.sql
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use rollcall_core::{
  journal::Journal,
  student::{Student, Uid},
  window::TimeWindow,
};
use rollcall_reader::{
  Reader, ReaderConfig,
  event::{self, Outcome},
  open_gateway,
  sweep::{Sweeper, group_windows},
};
use rollcall_store_sqlite::script;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Badge reader attendance service")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "rollcall.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Consume badge events from stdin (the default).
  Run,
  /// Print the configured windows and any overlaps between them.
  Windows,
  /// Write the identity table as a SQL script.
  ExportSql {
    /// Destination; defaults to `<data_dir>/SQLExport.sql`.
    #[arg(long)]
    out: Option<PathBuf>,
  },
  /// Replay a SQL script against the identity store.
  ImportSql { path: PathBuf },
  /// Register a card.
  AddStudent {
    uid:   String,
    name:  String,
    #[arg(long)]
    staff: bool,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = ReaderConfig::load(&cli.config)
    .with_context(|| format!("failed to load {}", cli.config.display()))?;

  match cli.command.unwrap_or(Command::Run) {
    Command::Run => run(cfg).await,
    Command::Windows => {
      print_windows(&cfg);
      Ok(())
    }
    Command::ExportSql { out } => {
      let out = out.unwrap_or_else(|| cfg.export_path());
      let gateway = open_gateway(&cfg);
      anyhow::ensure!(gateway.is_connected(), "identity store is unreachable");
      let students = gateway.all_students();
      script::write_export(&out, gateway.table(), &students)
        .with_context(|| format!("failed to write {}", out.display()))?;
      tracing::info!(path = %out.display(), students = students.len(), "export written");
      Ok(())
    }
    Command::ImportSql { path } => {
      let gateway = open_gateway(&cfg);
      anyhow::ensure!(gateway.is_connected(), "identity store is unreachable");
      let affected = script::import_file(&gateway, &path)
        .with_context(|| format!("failed to read {}", path.display()))?;
      tracing::info!(path = %path.display(), affected, "import replayed");
      Ok(())
    }
    Command::AddStudent { uid, name, staff } => {
      let uid = Uid::parse(&uid).with_context(|| format!("invalid uid {uid:?}"))?;
      let gateway = open_gateway(&cfg);
      anyhow::ensure!(gateway.is_connected(), "identity store is unreachable");
      let student = Student::new(uid, name, staff);
      gateway.insert(&student);
      tracing::info!(%student, "student registered");
      Ok(())
    }
  }
}

fn print_windows(cfg: &ReaderConfig) {
  let windows = cfg.windows();
  for window in &windows {
    println!("{}", window.display_string());
  }
  warn_overlaps(&windows);
}

fn warn_overlaps(windows: &[TimeWindow]) {
  for (i, j) in TimeWindow::overlapping_pairs(windows) {
    tracing::warn!(first = %windows[i], second = %windows[j], "time windows overlap");
  }
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run(cfg: ReaderConfig) -> anyhow::Result<()> {
  warn_overlaps(&cfg.windows());

  let (gateway, roster) = {
    let cfg = cfg.clone();
    tokio::task::spawn_blocking(move || {
      let gateway = Arc::new(open_gateway(&cfg));
      let roster = gateway.all_students();
      (gateway, roster)
    })
    .await
    .context("store connect task failed")?
  };
  let groups = cfg.build_groups(&roster);
  let windows = group_windows(groups.iter().flat_map(|g| g.windows()));
  tracing::info!(
    students = roster.len(),
    groups = groups.len(),
    windows = windows.len(),
    "reader ready"
  );

  let reader = Arc::new(Reader::new(
    roster,
    groups,
    Journal::new(&cfg.data_dir, cfg.log_checks),
    gateway,
  ));

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  let mut ticker = tokio::time::interval(Duration::from_secs(cfg.sweep_interval_secs.max(1)));
  let mut sweeper = Sweeper::default();
  let shutdown = tokio::signal::ctrl_c();
  tokio::pin!(shutdown);

  loop {
    tokio::select! {
      line = lines.next_line() => match line.context("failed to read badge events")? {
        Some(line) => handle_line(&reader, &line).await,
        None => {
          tracing::info!("badge stream closed");
          break;
        }
      },
      _ = ticker.tick() => {
        let now = Local::now().naive_local();
        for window in sweeper.tick(&windows, &now) {
          sweep(&reader, window, now.date()).await?;
        }
      }
      _ = &mut shutdown => {
        tracing::info!("shutting down");
        break;
      }
    }
  }

  // Final sweep for windows cut short by the shutdown.
  let today = Local::now().date_naive();
  for window in sweeper.finish(&windows, today) {
    sweep(&reader, window, today).await?;
  }

  let audit = reader.journal().metrics().snapshot();
  tracing::info!(
    written = audit.written,
    disabled = audit.disabled,
    failed = audit.failed,
    "audit journal totals"
  );
  Ok(())
}

async fn sweep(reader: &Arc<Reader>, window: TimeWindow, date: NaiveDate) -> anyhow::Result<()> {
  let task = Arc::clone(reader);
  let report = tokio::task::spawn_blocking(move || task.sweep_window(&window, date))
    .await
    .context("sweep task failed")?;
  tracing::info!(
    window = %window,
    absentees = report.absentees.len(),
    failed = report.failed,
    "window closed"
  );
  Ok(())
}

async fn handle_line(reader: &Arc<Reader>, line: &str) {
  let badge = match event::parse_line(line) {
    Ok(Some(badge)) => badge,
    Ok(None) => return,
    Err(e) => {
      tracing::warn!(line, error = %e, "unreadable badge event");
      return;
    }
  };

  let reader = Arc::clone(reader);
  let outcome = tokio::task::spawn_blocking(move || {
    event::apply(&reader, &badge, Local::now().fixed_offset())
  })
  .await;

  match outcome {
    Ok(Outcome::Checked(student)) => tracing::info!(%student, "checked in"),
    Ok(Outcome::Rejected(student)) => {
      tracing::info!(%student, "no group accepts this student now")
    }
    Ok(Outcome::Unknown(uid)) => tracing::warn!(uid, "unknown badge"),
    Err(e) => tracing::error!(error = %e, "badge task failed"),
  }
}
