//! Millisecond timestamps and file modification times.
//!
//! All freshness decisions in the engine compare [`Timestamp`]s. A timestamp
//! is an integer count of milliseconds since the Unix epoch, UTC. Filesystem
//! mtimes are truncated to millisecond precision the moment they are read, so
//! a timestamp that has been persisted and reloaded compares equal to one
//! freshly taken from an unchanged file.

use std::fmt;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::ser::Error as _;
use serde::{Serialize, Serializer};

use crate::error::DepsError;

/// Format written and accepted for persisted timestamps, e.g.
/// `2024-03-05T12:30:00.000Z`. Always UTC, always three fractional digits.
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// A point in time with millisecond precision.
///
/// Ordering and equality are plain integer comparisons, so values survive a
/// round trip through the persisted store without drifting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    millis: i64,
}

impl Timestamp {
    /// Creates a timestamp from raw milliseconds since the Unix epoch.
    pub fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    /// Converts a [`SystemTime`], truncating any sub-millisecond part.
    pub fn from_system(time: SystemTime) -> Self {
        let millis = match time.duration_since(std::time::UNIX_EPOCH) {
            Ok(since) => since.as_millis() as i64,
            Err(before) => -(before.duration().as_millis() as i64),
        };
        Self { millis }
    }

    /// Returns the raw milliseconds since the Unix epoch.
    pub fn millis(&self) -> i64 {
        self.millis
    }

    /// Renders as ISO-8601 with exactly three fractional digits, or `None`
    /// if the value lies outside the representable date range.
    pub fn to_iso8601(&self) -> Option<String> {
        let time: DateTime<Utc> = DateTime::from_timestamp_millis(self.millis)?;
        Some(time.format(ISO_FORMAT).to_string())
    }

    /// Parses the exact form produced by [`Timestamp::to_iso8601`].
    ///
    /// The fractional part must be present with exactly three digits and the
    /// string must end in `Z`; anything looser is rejected so that a store
    /// written by a different tool cannot silently shift precision.
    pub fn parse(text: &str) -> Option<Self> {
        let body = text.strip_suffix('Z')?;
        let (_, fraction) = body.rsplit_once('.')?;
        if fraction.len() != 3 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let parsed = NaiveDateTime::parse_from_str(text, ISO_FORMAT).ok()?;
        Some(Self {
            millis: parsed.and_utc().timestamp_millis(),
        })
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_iso8601() {
            Some(text) => f.write_str(&text),
            None => write!(f, "{}ms", self.millis),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.to_iso8601() {
            Some(text) => serializer.serialize_str(&text),
            None => Err(S::Error::custom(format!(
                "timestamp {}ms is outside the representable date range",
                self.millis
            ))),
        }
    }
}

/// Source of file modification times.
///
/// The build engine only ever asks "when was this path last modified", so
/// tests can swap in a table of fabricated times and exercise the staleness
/// logic on synthetic dependency graphs without touching the filesystem.
pub trait MtimeSource {
    /// Returns the last-modification time of `path`.
    fn mtime(&self, path: &Path) -> Result<Timestamp, DepsError>;
}

/// The live [`MtimeSource`] backed by filesystem metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMtime;

impl MtimeSource for SystemMtime {
    fn mtime(&self, path: &Path) -> Result<Timestamp, DepsError> {
        mtime(path)
    }
}

/// Reads the modification time of `path` from filesystem metadata.
///
/// A missing file maps to [`DepsError::NotFound`]; a file whose metadata
/// carries no modification time maps to [`DepsError::MtimeUnavailable`].
pub fn mtime(path: &Path) -> Result<Timestamp, DepsError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DepsError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            DepsError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let modified = metadata.modified().map_err(|e| DepsError::MtimeUnavailable {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(Timestamp::from_system(modified))
}
