//! File modification times as whole seconds since the Unix epoch.

use std::fs::{File, FileTimes};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch. Stored as 64 bits so values past 2038 fit.
///
/// A value of `0` is the "unknown, always rebuild" sentinel used by build
/// records.
pub type Timestamp = i64;

/// Returns the last-modified time of `path`, or `None` if it cannot be read.
///
/// Times before the epoch are reported as negative seconds.
pub fn last_write_time(path: &Path) -> Option<Timestamp> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(to_timestamp(modified))
}

/// Sets the last-modified time of `path` to `timestamp`.
pub fn set_last_write_time(path: &Path, timestamp: Timestamp) -> std::io::Result<()> {
    let file = File::options().write(true).open(path)?;
    file.set_times(FileTimes::new().set_modified(from_timestamp(timestamp)))
}

fn to_timestamp(time: SystemTime) -> Timestamp {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as Timestamp,
        Err(e) => -(e.duration().as_secs() as Timestamp),
    }
}

fn from_timestamp(timestamp: Timestamp) -> SystemTime {
    if timestamp >= 0 {
        UNIX_EPOCH + Duration::from_secs(timestamp as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs(timestamp.unsigned_abs())
    }
}
