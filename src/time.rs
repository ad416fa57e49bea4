//! Time abstraction traits, deadlines and the interrupt-driven tick clock.

use core::cell::Cell;

use critical_section::Mutex;

use crate::config::TICK_PERIOD_US;

/// Trait for abstracting time sources.
pub trait TimeSource<I: TimeInstant> {
    /// Returns the current time instant.
    fn now(&self) -> I;
}

impl<I: TimeInstant, T: TimeSource<I> + ?Sized> TimeSource<I> for &T {
    fn now(&self) -> I {
        (**self).now()
    }
}

/// Trait abstraction for duration types.
pub trait TimeDuration: Copy + PartialEq {
    /// Zero duration constant.
    const ZERO: Self;

    /// Converts duration to milliseconds.
    fn as_millis(&self) -> u64;

    /// Creates duration from milliseconds.
    fn from_millis(millis: u64) -> Self;

    /// Saturating subtraction (returns ZERO on underflow).
    fn saturating_sub(self, other: Self) -> Self;
}

/// Trait abstraction for instant types.
pub trait TimeInstant: Copy {
    /// Duration type for this instant.
    type Duration: TimeDuration;

    /// Calculates duration since an earlier instant.
    fn duration_since(&self, earlier: Self) -> Self::Duration;
}

/// A point in time after which a wait is over.
///
/// Replaces blocking delays: the owner starts a deadline once and polls
/// [`Deadline::has_elapsed`] on every pass of its loop. Nothing can shorten or
/// cancel a running deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline<I: TimeInstant> {
    start: I,
    duration: I::Duration,
}

impl<I: TimeInstant> Deadline<I> {
    /// Starts a deadline `duration` after `now`.
    pub fn start(now: I, duration: I::Duration) -> Self {
        Self {
            start: now,
            duration,
        }
    }

    /// Time since the deadline was started.
    pub fn elapsed(&self, now: I) -> I::Duration {
        now.duration_since(self.start)
    }

    /// Time left until the deadline, ZERO once it has passed.
    pub fn remaining(&self, now: I) -> I::Duration {
        self.duration.saturating_sub(self.elapsed(now))
    }

    /// Returns true once `now` is at or past the deadline.
    pub fn has_elapsed(&self, now: I) -> bool {
        self.elapsed(now).as_millis() >= self.duration.as_millis()
    }
}

/// Duration in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Millis(pub u64);

impl TimeDuration for Millis {
    const ZERO: Self = Millis(0);

    fn as_millis(&self) -> u64 {
        self.0
    }

    fn from_millis(millis: u64) -> Self {
        Millis(millis)
    }

    fn saturating_sub(self, other: Self) -> Self {
        Millis(self.0.saturating_sub(other.0))
    }
}

/// Instant counted in timer ticks since power-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickInstant(pub u32);

impl TickInstant {
    /// Returns the raw tick count.
    pub fn ticks(&self) -> u32 {
        self.0
    }
}

impl TimeInstant for TickInstant {
    type Duration = Millis;

    fn duration_since(&self, earlier: Self) -> Millis {
        // Wrapping keeps the difference right across counter rollover.
        let ticks = self.0.wrapping_sub(earlier.0) as u64;
        Millis(ticks * TICK_PERIOD_US as u64 / 1_000)
    }
}

/// Clock advanced by the periodic timer interrupt.
///
/// [`TickClock::tick`] is called from interrupt context on every timer
/// overflow; [`TimeSource::now`] is read from the foreground.
pub struct TickClock {
    ticks: Mutex<Cell<u32>>,
}

impl TickClock {
    pub const fn new() -> Self {
        Self {
            ticks: Mutex::new(Cell::new(0)),
        }
    }

    /// Advances the clock by one tick.
    pub fn tick(&self) {
        critical_section::with(|cs| {
            let counter = self.ticks.borrow(cs);
            counter.set(counter.get().wrapping_add(1));
        });
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource<TickInstant> for TickClock {
    fn now(&self) -> TickInstant {
        critical_section::with(|cs| TickInstant(self.ticks.borrow(cs).get()))
    }
}
