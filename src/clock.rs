//! Time source for timestamps, exchange ids and the duplicate window

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

impl<T: Clock + ?Sized> Clock for std::sync::Arc<T> {
    fn now(&self) -> DateTime<Utc> { (**self).now() }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock { millis: AtomicI64 }

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self { Self { millis: AtomicI64::new(start.timestamp_millis()) } }

    pub fn advance(&self, by: Duration) { self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst); }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}
