use chrono::{DateTime, Duration, Timelike, Utc};
use parking_lot::Mutex;
use std::fmt;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Identifies the interval bracket a timestamp falls into, as the minute of the
/// day the bracket starts at. Only meaningful for equality within one day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MinuteKey(u16);

impl MinuteKey {
    pub fn minute_of_day(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for MinuteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{:02}", self.0 / 60, self.0 % 60)
    }
}

fn interval_minutes(interval: Duration) -> u32 {
    interval.num_minutes().clamp(1, MINUTES_PER_DAY as i64) as u32
}

/// Key of the bracket containing `time`. Two timestamps of the same day share a
/// key iff they round down to the same multiple of `interval`.
pub fn minute_key(interval: Duration, time: DateTime<Utc>) -> MinuteKey {
    let minute = time.hour() * 60 + time.minute();
    let step = interval_minutes(interval);
    MinuteKey((minute - minute % step) as u16)
}

/// Truncates `time` to the start of its minute.
pub fn open_boundary(time: DateTime<Utc>) -> DateTime<Utc> {
    time - Duration::seconds(time.second() as i64)
        - Duration::nanoseconds(time.nanosecond() as i64)
}

/// Start of the interval bracket containing `time`. Brackets are aligned to
/// midnight UTC, so for a one minute interval this is the same as
/// [`open_boundary`].
pub fn bracket_open(interval: Duration, time: DateTime<Utc>) -> DateTime<Utc> {
    let step = interval_minutes(interval);
    let into_bracket = (time.hour() * 60 + time.minute()) % step;
    open_boundary(time) - Duration::minutes(into_bracket as i64)
}

pub fn close_boundary(interval: Duration, open: DateTime<Utc>) -> DateTime<Utc> {
    open_boundary(open) + interval
}

/// Source of arrival timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used to replay recorded feeds.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *self.now.lock() = time;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
