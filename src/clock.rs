// src/clock.rs
//
// Monotonic time source for the planner. The decider reads it once per
// cycle; tests and the replay binary drive a ManualClock instead.

use std::cell::Cell;
use std::time::Instant;

pub trait Clock {
    /// Seconds since an arbitrary, fixed origin. Never decreases.
    fn now_seconds(&self) -> f64;
}

pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_seconds(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Clock whose reading only changes when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, seconds: f64) {
        self.now.set(seconds);
    }

    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }
}

impl Clock for ManualClock {
    fn now_seconds(&self) -> f64 {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_seconds(&self) -> f64 {
        (**self).now_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(10.0);
        assert_eq!(clock.now_seconds(), 10.0);
        clock.advance(0.25);
        assert!((clock.now_seconds() - 10.25).abs() < 1e-12);
        clock.set(3.0);
        assert_eq!(clock.now_seconds(), 3.0);
    }

    #[test]
    fn test_monotonic_clock_never_goes_back() {
        let clock = MonotonicClock::new();
        let a = clock.now_seconds();
        let b = clock.now_seconds();
        assert!(b >= a);
        assert!(a >= 0.0);
    }
}
