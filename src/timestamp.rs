//! Tick timestamps.
//!
//! Rows carry the wall-clock time at which their tick began, as whole seconds since the Unix
//! epoch plus a microsecond remainder. Sub-microsecond precision is discarded, and
//! [`StampSequence`] keeps the stamps of one run strictly increasing.

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use tokio::time::Instant;

/// Seconds/microseconds pair written at the front of every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    /// Whole seconds since 1970-01-01T00:00:00Z.
    pub seconds: i64,
    /// Microseconds within the second, `0..=999_999`.
    pub microseconds: u32,
}

impl Timestamp {
    /// Truncate `t` to microseconds and split it.
    pub fn from_datetime(t: DateTime<Utc>) -> Self {
        Self {
            seconds: t.timestamp(),
            microseconds: t.timestamp_subsec_micros(),
        }
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// The next representable timestamp, one microsecond later.
    pub fn successor(self) -> Self {
        if self.microseconds >= 999_999 {
            Self {
                seconds: self.seconds.saturating_add(1),
                microseconds: 0,
            }
        } else {
            Self {
                seconds: self.seconds,
                microseconds: self.microseconds + 1,
            }
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(t: DateTime<Utc>) -> Self {
        Self::from_datetime(t)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.seconds, self.microseconds)
    }
}

/// Source of the wall-clock time read at the start of every tick.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall-clock time that advances with the tokio clock.
///
/// The wall clock is read once, when the clock is anchored. Later readings add the tokio
/// time elapsed since then, so a paused or advanced runtime moves this clock too.
#[derive(Debug, Clone, Copy)]
pub struct TickClock {
    wall: DateTime<Utc>,
    instant: Instant,
}

impl TickClock {
    /// Anchor to the current wall clock and tokio instant.
    pub fn start() -> Self {
        Self::anchored(Utc::now(), Instant::now())
    }

    /// Anchor to an explicit pair.
    pub fn anchored(wall: DateTime<Utc>, instant: Instant) -> Self {
        Self { wall, instant }
    }

    /// Wall-clock time of `instant`. Instants before the anchor map to the anchor.
    pub fn wall_time(&self, instant: Instant) -> DateTime<Utc> {
        let elapsed = instant.saturating_duration_since(self.instant);
        TimeDelta::from_std(elapsed)
            .ok()
            .and_then(|delta| self.wall.checked_add_signed(delta))
            .unwrap_or(self.wall)
    }
}

impl Clock for TickClock {
    fn now(&self) -> DateTime<Utc> {
        self.wall_time(Instant::now())
    }
}

/// Hands out strictly increasing row timestamps.
///
/// A reading that does not move past the previous stamp (a clock stepped backwards, or two
/// ticks within the same microsecond) is replaced by the previous stamp plus 1µs.
#[derive(Debug, Clone, Default)]
pub struct StampSequence {
    last: Option<Timestamp>,
}

impl StampSequence {
    /// Empty sequence; the first stamp is taken as read.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp for a tick that read the wall clock at `now`.
    pub fn next(&mut self, now: DateTime<Utc>) -> Timestamp {
        let read = Timestamp::from_datetime(now);
        let stamp = match self.last {
            Some(last) if read <= last => last.successor(),
            _ => read,
        };
        self.last = Some(stamp);
        stamp
    }

    /// The most recent stamp handed out.
    pub fn last(&self) -> Option<Timestamp> {
        self.last
    }
}
