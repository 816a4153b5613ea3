use chrono::{Local, NaiveDate, NaiveDateTime, Utc};

/// Source of "now" in the studio's local zone.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Seconds since the unix epoch, for comparing against Telegram timestamps.
    fn unix_now(&self) -> i64 {
        self.now().and_utc().timestamp()
    }
}

/// Wall clock in the process's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn unix_now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Frozen clock for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
