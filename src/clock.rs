//! Monotonic time source for the event loop's periodic work.
//!
//! Time is counted in whole units (seconds). Readers only compare
//! differences, so wrap-around is harmless.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A monotonic clock.
pub trait Clock {
    /// Current time in whole units.
    fn now(&self) -> u32;
}

impl<C> Clock for &C
where
    C: ?Sized + Clock,
{
    #[inline]
    fn now(&self) -> u32 {
        (**self).now()
    }
}

impl<C> Clock for Arc<C>
where
    C: ?Sized + Clock,
{
    #[inline]
    fn now(&self) -> u32 {
        (**self).now()
    }
}

/// A counter advanced by an external tick source such as a timer interrupt
/// or a timer thread.
///
/// Every read and write is a single atomic operation, so a reader always
/// sees a consistent value.
#[derive(Debug, Default)]
pub struct TickClock {
    ticks: AtomicU32,
}

impl TickClock {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU32::new(0),
        }
    }

    /// Advance by one unit.
    pub fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::AcqRel);
    }

    /// Advance by `units`.
    pub fn advance(&self, units: u32) {
        self.ticks.fetch_add(units, Ordering::AcqRel);
    }

    /// Set the current time.
    pub fn set(&self, now: u32) {
        self.ticks.store(now, Ordering::Release);
    }
}

impl Clock for TickClock {
    #[inline]
    fn now(&self) -> u32 {
        self.ticks.load(Ordering::Acquire)
    }
}

/// Whole seconds since construction, from the operating system's monotonic
/// clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> u32 {
        self.start.elapsed().as_secs() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_clock() {
        let clock = TickClock::new();
        assert_eq!(clock.now(), 0);
        clock.tick();
        clock.advance(4);
        assert_eq!(clock.now(), 5);
        clock.set(u32::MAX);
        clock.tick();
        assert_eq!(clock.now(), 0);
    }

    #[test]
    fn test_shared_tick_clock() {
        let clock = Arc::new(TickClock::new());
        let shared = clock.clone();

        std::thread::spawn(move || {
            for _ in 0..100 {
                shared.tick();
            }
        })
        .join()
        .unwrap();

        assert_eq!(Clock::now(&clock), 100);
    }

    #[test]
    fn test_system_clock_starts_at_zero() {
        assert_eq!(SystemClock::new().now(), 0);
    }
}
