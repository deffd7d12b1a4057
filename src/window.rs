//! Time windows over which usage metrics are aggregated

use crate::error::{CostError, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Half-open interval `[start, end)` with `end > start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(CostError::InvalidWindow(format!(
                "end {} is not after start {}",
                end.to_rfc3339(),
                start.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// Window of `length` ending `delay` before `now`.
    ///
    /// Metric sources publish with some lag, so periodic runs look at a window
    /// that closed a little while ago.
    pub fn trailing(now: DateTime<Utc>, delay: Duration, length: Duration) -> Result<Self> {
        let end = now - delay;
        Self::new(end - length, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration_seconds(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }

    /// Whole minutes spanned by the window, truncated toward zero.
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Length of the normalized cost window in seconds.
    ///
    /// Metrics report an average rate per minute across the window, so the
    /// elapsed seconds are divided by the whole minutes spanned. Windows
    /// shorter than one minute cannot be normalized.
    pub fn cost_window_seconds(&self) -> Result<f64> {
        let minutes = self.duration_minutes();
        if minutes < 1 {
            return Err(CostError::InvalidWindow(format!(
                "window of {}s spans no whole minute",
                self.duration_seconds()
            )));
        }
        Ok(self.duration_seconds() / minutes as f64)
    }

    /// Seconds in the calendar month containing the window end.
    pub fn seconds_in_month(&self) -> f64 {
        seconds_in_month_of(self.end)
    }
}

pub fn seconds_in_month_of(at: DateTime<Utc>) -> f64 {
    let (year, month) = (at.year(), at.month());
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let days = match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(first), Some(next)) => (next - first).num_days(),
        _ => 30,
    };
    (days * 24 * 60 * 60) as f64
}
