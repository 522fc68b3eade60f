use std::fmt;
use std::ops::Sub;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The fixed simulation interval every physics advance uses.
pub const FIXED_DT: f32 = 1.0 / 60.0;

// ---------------------------------------------------------------------------
// SimTime
// ---------------------------------------------------------------------------

/// Integer-nanosecond simulation clock.
///
/// Elapsed time is a monotonically increasing `u64` nanosecond count so lap
/// times do not drift from floating-point accumulation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SimTime {
    nanos: u64,
}

impl SimTime {
    #[must_use]
    pub const fn new() -> Self {
        Self { nanos: 0 }
    }

    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_secs(secs: f64) -> Self {
        Self {
            nanos: (secs * 1_000_000_000.0) as u64,
        }
    }

    #[must_use]
    pub const fn nanos(&self) -> u64 {
        self.nanos
    }

    /// Elapsed milliseconds (truncated).
    #[must_use]
    pub const fn millis(&self) -> u64 {
        self.nanos / 1_000_000
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn secs_f64(&self) -> f64 {
        self.nanos as f64 / 1_000_000_000.0
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn secs_f32(&self) -> f32 {
        self.nanos as f32 / 1_000_000_000.0
    }

    pub const fn advance(&mut self, delta_nanos: u64) {
        self.nanos = self.nanos.saturating_add(delta_nanos);
    }

    pub const fn reset(&mut self) {
        self.nanos = 0;
    }

    /// Split into `(minutes, seconds, hundredths)` the way race chronos display it.
    #[must_use]
    pub const fn chrono_parts(&self) -> (u64, u64, u64) {
        let centis = self.nanos / 10_000_000;
        (centis / 6000, (centis / 100) % 60, centis % 100)
    }
}

impl Sub for SimTime {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        Duration::from_nanos(self.nanos.saturating_sub(rhs.nanos))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (min, sec, centi) = self.chrono_parts();
        write!(f, "{min:02}:{sec:02}.{centi:02}")
    }
}

// ---------------------------------------------------------------------------
// RaceClock
// ---------------------------------------------------------------------------

/// Fixed-step clock advanced once per simulated frame.
///
/// There is no wall-clock accumulation: each call to [`advance`](Self::advance)
/// is exactly one fixed interval.
#[derive(Debug, Clone)]
pub struct RaceClock {
    time: SimTime,
    step_nanos: u64,
    steps: u64,
}

impl RaceClock {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(dt_secs: f64) -> Self {
        Self {
            time: SimTime::new(),
            step_nanos: (dt_secs * 1_000_000_000.0).round() as u64,
            steps: 0,
        }
    }

    pub const fn advance(&mut self) {
        self.time.advance(self.step_nanos);
        self.steps += 1;
    }

    #[must_use]
    pub const fn time(&self) -> SimTime {
        self.time
    }

    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn dt_secs(&self) -> f32 {
        self.step_nanos as f32 / 1_000_000_000.0
    }

    pub const fn reset(&mut self) {
        self.time.reset();
        self.steps = 0;
    }
}

impl Default for RaceClock {
    fn default() -> Self {
        Self::new(f64::from(FIXED_DT))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simtime_from_secs() {
        let t = SimTime::from_secs(2.5);
        assert_eq!(t.nanos(), 2_500_000_000);
        assert_eq!(t.millis(), 2500);
    }

    #[test]
    fn simtime_sub_saturates() {
        let a = SimTime::from_nanos(100);
        let b = SimTime::from_nanos(300);
        assert_eq!(b - a, Duration::from_nanos(200));
        assert_eq!(a - b, Duration::ZERO);
    }

    #[test]
    fn simtime_display_as_chrono() {
        let t = SimTime::from_secs(83.456);
        assert_eq!(t.chrono_parts(), (1, 23, 45));
        assert_eq!(t.to_string(), "01:23.45");
    }

    #[test]
    fn race_clock_advances_fixed_steps() {
        let mut clock = RaceClock::new(0.5);
        clock.advance();
        clock.advance();
        assert_eq!(clock.steps(), 2);
        assert_eq!(clock.time().nanos(), 1_000_000_000);
        assert!((clock.dt_secs() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn race_clock_default_is_sixty_hz() {
        let mut clock = RaceClock::default();
        for _ in 0..60 {
            clock.advance();
        }
        assert!((clock.time().secs_f64() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn race_clock_reset() {
        let mut clock = RaceClock::default();
        clock.advance();
        clock.reset();
        assert_eq!(clock.steps(), 0);
        assert_eq!(clock.time(), SimTime::new());
    }
}
