//! Countdown Timers
//!
//! Per-entity countdowns driving the move/turn/attack/death state machine.

use serde::{Serialize, Deserialize};

/// Remaining time at or below this counts as stopped.
///
/// Lets a sequence of `update(dt)` calls whose dt's sum to the original
/// duration stop the timer despite floating-point residue.
pub const TIMER_EPSILON: f64 = 1e-9;

/// A countdown from a duration to zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CountdownTimer {
    duration: f64,
    remaining: f64,
}

impl CountdownTimer {
    /// Create a stopped timer.
    pub const fn new() -> Self {
        Self {
            duration: 0.0,
            remaining: 0.0,
        }
    }

    /// Create a timer already running from `duration`.
    pub fn started(duration: f64) -> Self {
        let mut timer = Self::new();
        timer.reset(duration);
        timer
    }

    /// Restart from `duration`. A non-positive duration stops the timer.
    pub fn reset(&mut self, duration: f64) {
        let duration = duration.max(0.0);
        self.duration = duration;
        self.remaining = if duration <= TIMER_EPSILON { 0.0 } else { duration };
    }

    /// Count down by `dt`, clamped at zero.
    pub fn update(&mut self, dt: f64) {
        self.remaining -= dt.max(0.0);
        if self.remaining <= TIMER_EPSILON {
            self.remaining = 0.0;
        }
    }

    /// Force the timer to zero.
    pub fn stop(&mut self) {
        self.remaining = 0.0;
    }

    /// True once the countdown has reached zero.
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.remaining == 0.0
    }

    /// Time left in seconds.
    #[inline]
    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    /// Duration of the last reset.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Fraction of the duration already elapsed, in `[0, 1]`.
    pub fn elapsed_ratio(&self) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        1.0 - self.remaining / self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_duration_is_stopped() {
        let mut timer = CountdownTimer::new();
        assert!(timer.is_stopped());
        timer.reset(0.0);
        assert!(timer.is_stopped());
        assert_eq!(timer.elapsed_ratio(), 1.0);
    }

    #[test]
    fn test_countdown_clamps_at_zero() {
        let mut timer = CountdownTimer::started(0.5);
        assert!(!timer.is_stopped());
        timer.update(0.2);
        assert!((timer.remaining() - 0.3).abs() < 1e-12);
        timer.update(10.0);
        assert_eq!(timer.remaining(), 0.0);
        assert!(timer.is_stopped());
    }

    #[test]
    fn test_non_uniform_split_stops_exactly() {
        let mut timer = CountdownTimer::started(0.25);
        for dt in [0.1, 0.05, 0.07, 0.03] {
            timer.update(dt);
        }
        assert!(timer.is_stopped());
    }

    #[test]
    fn test_negative_dt_ignored() {
        let mut timer = CountdownTimer::started(1.0);
        timer.update(-5.0);
        assert_eq!(timer.remaining(), 1.0);
        assert_eq!(timer.duration(), 1.0);
    }

    #[test]
    fn test_elapsed_ratio() {
        let mut timer = CountdownTimer::started(2.0);
        timer.update(0.5);
        assert!((timer.elapsed_ratio() - 0.25).abs() < 1e-12);
        timer.stop();
        assert_eq!(timer.elapsed_ratio(), 1.0);
    }
}
