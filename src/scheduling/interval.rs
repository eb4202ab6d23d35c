//! Pure time interval algebra used by the slot generator
use chrono::{DateTime, Timelike, Utc};

/// A half-open time span `[start, end)`. A host is busy for the span
/// or a slot occupies the span; touching endpoints do not conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Half-open overlap test. `[a, b)` and `[b, c)` do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Truncate sub-second precision so slot start times compare equal
/// regardless of jitter between sources.
pub fn floor_to_second(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.with_nanosecond(0).unwrap_or(instant)
}
