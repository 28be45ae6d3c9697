//! Calendar decomposition of play timestamps

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::database::Dialect;

/// Calendar fields of one play timestamp, in UTC
///
/// Matches what the `time` insert computes in the warehouse: ISO week number
/// and weekday counted from Sunday as 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeParts {
    /// Epoch milliseconds, as stored in `start_time`
    pub start_time: i64,
    pub hour: u32,
    pub day: u32,
    pub week: u32,
    pub month: u32,
    pub year: i32,
    pub weekday: u32,
}

impl TimeParts {
    /// Decompose an epoch-millisecond timestamp
    ///
    /// Returns `None` for values outside the representable date range.
    pub fn from_epoch_millis(millis: i64) -> Option<Self> {
        let at: DateTime<Utc> = DateTime::from_timestamp_millis(millis)?;

        Some(Self {
            start_time: millis,
            hour: at.hour(),
            day: at.day(),
            week: at.iso_week().week(),
            month: at.month(),
            year: at.year(),
            weekday: at.weekday().num_days_from_sunday(),
        })
    }
}

/// Expression converting the epoch-millisecond column `ts` to a timestamp
pub fn timestamp_expr(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Redshift => "TIMESTAMP 'epoch' + ts / 1000 * INTERVAL '1 second'",
        Dialect::DuckDb => "epoch_ms(ts)",
    }
}
