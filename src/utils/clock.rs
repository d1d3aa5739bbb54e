use chrono::{Local, NaiveDateTime};

/// Represents an entity responsible for providing the observation time across application. The
/// ledger has no time zones, so times are local wall-clock times. Tests inject fixed clocks.
#[cfg_attr(test, mockall::automock)]
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock stuck at a single moment. Keeps every read of one invocation consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
