//! Time source for timestamps and "today".

use std::cell::Cell;
use std::rc::Rc;

use time::{Date, Duration, OffsetDateTime};

pub trait Clock {
    fn now(&self) -> OffsetDateTime;

    /// Calendar date of `now`, without time of day.
    fn today(&self) -> Date {
        self.now().date()
    }
}

/// Reads the local system clock, falling back to UTC when the local offset
/// cannot be determined.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
    }
}

/// A clock that only moves when told to. Clones share the same time.
///
/// # Examples
///
/// ```
/// use time::Duration;
/// use time::macros::datetime;
/// use tudo::{Clock, ManualClock};
///
/// let clock = ManualClock::new(datetime!(2024-06-15 12:00 UTC));
/// let handle = clock.clone();
/// handle.advance(Duration::days(1));
///
/// assert_eq!(clock.now(), datetime!(2024-06-16 12:00 UTC));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<OffsetDateTime>>,
}

impl ManualClock {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn today_drops_time_of_day() {
        let clock = ManualClock::new(datetime!(2024-06-15 23:59:59 UTC));
        assert_eq!(clock.today(), date!(2024 - 06 - 15));
    }

    #[test]
    fn manual_clock_rewinds() {
        let clock = ManualClock::new(datetime!(2024-06-15 12:00 UTC));
        clock.advance(Duration::days(-8));
        assert_eq!(clock.today(), date!(2024 - 06 - 07));
    }
}
