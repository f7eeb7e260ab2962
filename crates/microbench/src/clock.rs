use clap::ValueEnum;
use eyre::Result;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// A point in time, in nanoseconds from a clock-specific origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Time elapsed between `start` and `self`. Saturates at zero when the
    /// source steps backwards.
    #[inline]
    pub fn elapsed_since(self, start: Timestamp) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(start.0))
    }
}

/// A timestamp source that benchmarks read from and are timed with.
///
/// `now` is fallible so that sources backed by a system call can surface
/// their error instead of returning a bogus value.
pub trait Clock {
    fn description(&self) -> &'static str;

    /// The call made by one `now` read, e.g. `clock_gettime()`.
    fn call_name(&self) -> &'static str;

    fn now(&self) -> Result<Timestamp>;

    fn resolution(&self) -> Result<Duration>;
}

/// Selects which [`Clock`] a benchmark runs against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClockKind {
    /// `clock_gettime(CLOCK_MONOTONIC)`
    #[default]
    Monotonic,
    /// TSC-backed clock from the `quanta` crate
    Quanta,
    /// `std::time::Instant`
    Std,
}

impl fmt::Display for ClockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockKind::Monotonic => write!(f, "monotonic"),
            ClockKind::Quanta => write!(f, "quanta"),
            ClockKind::Std => write!(f, "std"),
        }
    }
}

#[cfg(unix)]
pub use monotonic::MonotonicClock;

#[cfg(unix)]
mod monotonic {
    use super::{Clock, Timestamp};
    use eyre::{Result, WrapErr};
    use std::io;
    use std::time::Duration;

    const NANOS_PER_SEC: u64 = 1_000_000_000;

    #[derive(Debug, Default, Clone, Copy)]
    pub struct MonotonicClock;

    fn timespec_nanos(ts: &libc::timespec) -> u64 {
        (ts.tv_sec as u64)
            .wrapping_mul(NANOS_PER_SEC)
            .wrapping_add(ts.tv_nsec as u64)
    }

    impl Clock for MonotonicClock {
        fn description(&self) -> &'static str {
            "CLOCK_MONOTONIC"
        }

        fn call_name(&self) -> &'static str {
            "clock_gettime()"
        }

        #[inline]
        fn now(&self) -> Result<Timestamp> {
            // SAFETY: timespec is plain old data; all-zero is a valid value.
            let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
            // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
            let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
            if rc < 0 {
                return Err(io::Error::last_os_error()).wrap_err("clock_gettime");
            }
            Ok(Timestamp(timespec_nanos(&ts)))
        }

        fn resolution(&self) -> Result<Duration> {
            // SAFETY: timespec is plain old data; all-zero is a valid value.
            let mut res: libc::timespec = unsafe { std::mem::zeroed() };
            // SAFETY: `res` is a valid, writable timespec for the duration of the call.
            let rc = unsafe { libc::clock_getres(libc::CLOCK_MONOTONIC, &mut res) };
            if rc < 0 {
                return Err(io::Error::last_os_error()).wrap_err("clock_getres");
            }
            Ok(Duration::from_nanos(timespec_nanos(&res)))
        }
    }
}

pub struct QuantaClock {
    clock: quanta::Clock,
    origin: quanta::Instant,
}

impl QuantaClock {
    pub fn new() -> Self {
        let clock = quanta::Clock::new();
        let origin = clock.now();
        Self { clock, origin }
    }
}

impl Default for QuantaClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for QuantaClock {
    fn description(&self) -> &'static str {
        "quanta::Clock"
    }

    fn call_name(&self) -> &'static str {
        "quanta::Clock::now()"
    }

    #[inline]
    fn now(&self) -> Result<Timestamp> {
        let elapsed = self.clock.now().duration_since(self.origin);
        Ok(Timestamp(elapsed.as_nanos() as u64))
    }

    fn resolution(&self) -> Result<Duration> {
        estimate_resolution(self)
    }
}

pub struct StdClock {
    origin: std::time::Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn description(&self) -> &'static str {
        "std::time::Instant"
    }

    fn call_name(&self) -> &'static str {
        "Instant::now()"
    }

    #[inline]
    fn now(&self) -> Result<Timestamp> {
        Ok(Timestamp(self.origin.elapsed().as_nanos() as u64))
    }

    fn resolution(&self) -> Result<Duration> {
        estimate_resolution(self)
    }
}

const RESOLUTION_SAMPLES: usize = 1_000;

/// Smallest non-zero step observed between consecutive reads of `clock`.
///
/// Used for sources that do not report their resolution. Returns 1ns when no
/// step was observed within the sample budget.
pub fn estimate_resolution<C: Clock + ?Sized>(clock: &C) -> Result<Duration> {
    let mut best: Option<u64> = None;
    let mut prev = clock.now()?;

    for _ in 0..RESOLUTION_SAMPLES {
        let next = clock.now()?;
        let step = next.0.saturating_sub(prev.0);
        if step > 0 {
            best = Some(best.map_or(step, |b| b.min(step)));
            if step == 1 {
                break;
            }
        }
        prev = next;
    }

    Ok(Duration::from_nanos(best.unwrap_or(1)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;

    /// Advances by a fixed step on every read.
    pub(crate) struct SteppingClock {
        pub(crate) current: Cell<u64>,
        pub(crate) step: u64,
    }

    impl SteppingClock {
        pub(crate) fn new(step: u64) -> Self {
            Self {
                current: Cell::new(0),
                step,
            }
        }
    }

    impl Clock for SteppingClock {
        fn description(&self) -> &'static str {
            "stepping"
        }

        fn call_name(&self) -> &'static str {
            "stepping::now()"
        }

        fn now(&self) -> Result<Timestamp> {
            let now = self.current.get();
            self.current.set(now + self.step);
            Ok(Timestamp(now))
        }

        fn resolution(&self) -> Result<Duration> {
            Ok(Duration::from_nanos(self.step))
        }
    }

    /// Fails once `remaining` successful reads are used up.
    pub(crate) struct FailingClock {
        pub(crate) remaining: Cell<u32>,
    }

    impl Clock for FailingClock {
        fn description(&self) -> &'static str {
            "failing"
        }

        fn call_name(&self) -> &'static str {
            "clock_gettime()"
        }

        fn now(&self) -> Result<Timestamp> {
            let left = self.remaining.get();
            if left == 0 {
                let cause = eyre::eyre!("Invalid argument (os error 22)");
                return Err(cause.wrap_err("clock_gettime"));
            }
            self.remaining.set(left - 1);
            Ok(Timestamp(u64::from(left)))
        }

        fn resolution(&self) -> Result<Duration> {
            Ok(Duration::from_nanos(1))
        }
    }

    #[test]
    fn test_elapsed_since_saturates() {
        let earlier = Timestamp(100);
        let later = Timestamp(250);
        assert_eq!(later.elapsed_since(earlier), Duration::from_nanos(150));
        assert_eq!(earlier.elapsed_since(later), Duration::ZERO);
    }

    #[test]
    fn test_estimate_resolution_uses_smallest_step() {
        let clock = SteppingClock::new(40);
        let res = estimate_resolution(&clock).unwrap();
        assert_eq!(res, Duration::from_nanos(40));
    }

    #[test]
    fn test_std_clock_is_monotonic() {
        let clock = StdClock::new();
        let a = clock.now().unwrap();
        let b = clock.now().unwrap();
        assert!(b >= a);
        assert!(clock.resolution().unwrap() > Duration::ZERO);
    }

    #[test]
    fn test_quanta_clock_is_monotonic() {
        let clock = QuantaClock::new();
        let a = clock.now().unwrap();
        let b = clock.now().unwrap();
        assert!(b >= a);
    }

    #[cfg(unix)]
    #[test]
    fn test_monotonic_clock_reads_and_resolution() {
        let clock = MonotonicClock;
        let a = clock.now().unwrap();
        let b = clock.now().unwrap();
        assert!(b >= a);

        let res = clock.resolution().unwrap();
        assert!(res > Duration::ZERO);
        assert!(res < Duration::from_secs(1));
    }

    #[test]
    fn test_call_names() {
        assert_eq!(QuantaClock::new().call_name(), "quanta::Clock::now()");
        assert_eq!(StdClock::new().call_name(), "Instant::now()");
        #[cfg(unix)]
        assert_eq!(MonotonicClock.call_name(), "clock_gettime()");
    }

    #[test]
    fn test_failing_clock_reports_call_name() {
        let clock = FailingClock {
            remaining: Cell::new(0),
        };
        let err = clock.now().unwrap_err();
        assert_eq!(err.to_string(), "clock_gettime");
    }
}
