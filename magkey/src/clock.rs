use embassy_time::{Duration, Instant};

/// Monotonic time source used for the calibration window and the inactivity timeout.
pub trait Clock {
    fn now(&self) -> Instant;

    /// Time elapsed since `since`, saturating at zero
    fn elapsed(&self, since: Instant) -> Duration {
        self.now().saturating_duration_since(since)
    }
}

/// Clock backed by the embassy time driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}
