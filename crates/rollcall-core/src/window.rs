//! Daily time windows used to decide which attendance session a scan belongs
//! to.
//!
//! A window is written `9h00-10h30` (either `h` or `H`, spaces ignored) and
//! covers the half-open interval `[start, end)` of a single day. Hours are not
//! range-checked: `99h00-99h30` parses and simply never matches a timestamp.

use std::{fmt, str::FromStr, sync::LazyLock};

use chrono::{NaiveTime, TimeDelta, Timelike};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

static WINDOW_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^([0-9]{1,2})[hH]([0-9]{1,2})-([0-9]{1,2})[hH]([0-9]{1,2})$")
    .expect("window pattern is a valid regex")
});

// ─── TimeWindow ──────────────────────────────────────────────────────────────

/// An immutable daily interval, e.g. `9h00-10h30`.
///
/// Serialises to and from its canonical string form so it can be stored
/// directly in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeWindow {
  start_hour:   u32,
  start_minute: u32,
  end_hour:     u32,
  end_minute:   u32,
}

impl TimeWindow {
  /// Parse a window string. Whitespace is stripped before validation.
  pub fn parse(text: &str) -> Result<Self> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let caps = WINDOW_PATTERN
      .captures(&compact)
      .ok_or_else(|| Error::InvalidWindow(text.to_owned()))?;

    let field = |i: usize| -> Result<u32> {
      caps[i]
        .parse()
        .map_err(|_| Error::InvalidWindow(text.to_owned()))
    };

    Ok(Self {
      start_hour:   field(1)?,
      start_minute: field(2)?,
      end_hour:     field(3)?,
      end_minute:   field(4)?,
    })
  }

  /// Parse every entry independently, keeping the ones that parse.
  ///
  /// Failures are logged and skipped; the result preserves input order and
  /// may be empty.
  pub fn load_all<I, S>(raw: I) -> Vec<Self>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    raw
      .into_iter()
      .filter_map(|entry| match Self::parse(entry.as_ref()) {
        Ok(window) => Some(window),
        Err(e) => {
          tracing::warn!(entry = entry.as_ref(), error = %e, "skipping time window");
          None
        }
      })
      .collect()
  }

  pub fn start_hour(&self) -> u32 { self.start_hour }

  pub fn start_minute(&self) -> u32 { self.start_minute }

  pub fn end_hour(&self) -> u32 { self.end_hour }

  pub fn end_minute(&self) -> u32 { self.end_minute }

  /// Whether `at` falls inside this window.
  ///
  /// The hour is read on a 12-hour dial (`hour % 12`), so `14:30` is seen as
  /// hour 2. Windows whose end hour is below their start hour are evaluated
  /// with the same arithmetic and do not wrap around midnight.
  pub fn contains<T: Timelike>(&self, at: &T) -> bool {
    self.contains_reading(at.hour() % 12, at.minute())
  }

  fn contains_reading(&self, hour: u32, minute: u32) -> bool {
    if self.start_hour == self.end_hour {
      return hour == self.start_hour
        && minute >= self.start_minute
        && minute < self.end_minute;
    }
    (hour > self.start_hour && hour < self.end_hour)
      || (hour == self.start_hour && minute >= self.start_minute)
      || (hour == self.end_hour && minute < self.end_minute)
  }

  /// Whether the two windows share at least one minute.
  ///
  /// Each window's first and last covered minute is tested against the
  /// other window. `None` never overlaps.
  pub fn overlaps(&self, other: Option<&TimeWindow>) -> bool {
    let Some(other) = other else {
      return false;
    };
    let hits = |window: &TimeWindow, probe: Option<NaiveTime>| {
      probe.is_some_and(|t| window.contains(&t))
    };
    hits(other, self.first_minute())
      || hits(other, self.last_minute())
      || hits(self, other.first_minute())
      || hits(self, other.last_minute())
  }

  /// Index pairs `(i, j)` with `i < j` of windows that overlap each other.
  pub fn overlapping_pairs(windows: &[TimeWindow]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for (i, a) in windows.iter().enumerate() {
      for (j, b) in windows.iter().enumerate().skip(i + 1) {
        if a.overlaps(Some(b)) {
          pairs.push((i, j));
        }
      }
    }
    pairs
  }

  /// Human-facing form, e.g. `9h00 - 10h30`.
  pub fn display_string(&self) -> String {
    format!(
      "{}h{:02} - {}h{:02}",
      self.start_hour, self.start_minute, self.end_hour, self.end_minute
    )
  }

  /// Storage form, e.g. `9h00-10h30`. Parses back to an equal window.
  pub fn canonical_string(&self) -> String {
    format!(
      "{}h{:02}-{}h{:02}",
      self.start_hour, self.start_minute, self.end_hour, self.end_minute
    )
  }

  fn first_minute(&self) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(self.start_hour, self.start_minute, 0)
  }

  fn last_minute(&self) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(self.end_hour, self.end_minute, 0)
      .map(|end| end - TimeDelta::minutes(1))
  }
}

impl fmt::Display for TimeWindow {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.canonical_string())
  }
}

impl FromStr for TimeWindow {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

impl TryFrom<String> for TimeWindow {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::parse(&value) }
}

impl From<TimeWindow> for String {
  fn from(window: TimeWindow) -> Self { window.canonical_string() }
}
