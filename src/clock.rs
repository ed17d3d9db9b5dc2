use chrono::{DateTime, Local, NaiveDate, Utc};

/// Time source for "today", timestamps and the busy deadline.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day in the local time zone.
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&Local).date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub use fixed::FixedClock;
