//! Detecting the end of a time window between two clock ticks.
//!
//! Windows are read on a 12-hour dial, so a morning window appears open a
//! second time in the evening. Each window is therefore swept at most once
//! per calendar date.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use rollcall_core::window::TimeWindow;

/// Remembers which windows were open at the previous tick and when each
/// was last swept.
#[derive(Debug, Default)]
pub struct Sweeper {
  open:  HashSet<TimeWindow>,
  swept: HashMap<TimeWindow, NaiveDate>,
}

impl Sweeper {
  /// Record the windows open at `now` and return those that were open at
  /// the previous tick, no longer are, and have not been swept on `now`'s
  /// date yet. Order follows `windows`.
  pub fn tick(&mut self, windows: &[TimeWindow], now: &NaiveDateTime) -> Vec<TimeWindow> {
    let open: HashSet<TimeWindow> = windows.iter().copied().filter(|w| w.contains(now)).collect();
    let ended: Vec<TimeWindow> = windows
      .iter()
      .copied()
      .filter(|w| self.open.contains(w) && !open.contains(w))
      .collect();
    self.open = open;
    ended.into_iter().filter(|w| self.claim(*w, now.date())).collect()
  }

  /// Close every window still open at the last tick, for a final sweep on
  /// shutdown. Windows already swept on `date` are left out.
  pub fn finish(&mut self, windows: &[TimeWindow], date: NaiveDate) -> Vec<TimeWindow> {
    let open: Vec<TimeWindow> = windows.iter().copied().filter(|w| self.open.contains(w)).collect();
    self.open.clear();
    open.into_iter().filter(|w| self.claim(*w, date)).collect()
  }

  /// Mark `window` swept on `date`; `false` if it already was.
  fn claim(&mut self, window: TimeWindow, date: NaiveDate) -> bool {
    self.swept.insert(window, date) != Some(date)
  }
}

/// Every distinct window used by any group, first occurrence first.
pub fn group_windows<'a, I>(windows: I) -> Vec<TimeWindow>
where
  I: IntoIterator<Item = &'a TimeWindow>,
{
  let mut seen = HashSet::new();
  windows.into_iter().copied().filter(|w| seen.insert(*w)).collect()
}
