use chrono::{DateTime, Local, NaiveDate, TimeZone};
use std::sync::Mutex;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    /// Local calendar date, time of day dropped
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock of the host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock pinned to a settable instant, used by tests
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Local>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Clock reading 06:00 local time on the given date
    pub fn at_date(date: NaiveDate) -> Self {
        Self::new(local_morning(date))
    }

    pub fn set_date(&self, date: NaiveDate) {
        if let Ok(mut now) = self.now.lock() {
            *now = local_morning(date);
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

fn local_morning(date: NaiveDate) -> DateTime<Local> {
    let naive = date.and_hms_opt(6, 0, 0).unwrap_or_default();
    Local
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
}
