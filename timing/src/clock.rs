//! monotonic cycle sources
//!
//! the pacer and the egress worker only ever see [`CycleClock`]; production
//! uses [`TscClock`], tests drive a [`VirtualClock`] so no test spins on real
//! time.

use crate::rdtsc::{counter_frequency, duration_to_cycles, rdtsc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// monotonic counter plus its frequency.
pub trait CycleClock: Send + Sync {
    /// current counter value.
    fn now(&self) -> u64;

    /// counter ticks per second.
    fn cycles_per_second(&self) -> u64;

    /// `duration` expressed in this clock's ticks.
    #[inline]
    fn cycles_for(&self, duration: Duration) -> u64 {
        duration_to_cycles(duration, self.cycles_per_second())
    }
}

impl<C: CycleClock + ?Sized> CycleClock for Arc<C> {
    #[inline]
    fn now(&self) -> u64 {
        (**self).now()
    }

    #[inline]
    fn cycles_per_second(&self) -> u64 {
        (**self).cycles_per_second()
    }
}

/// hardware time-stamp counter.
#[derive(Debug, Clone, Copy)]
pub struct TscClock {
    hz: u64,
}

impl TscClock {
    /// tsc clock with the process-wide calibrated frequency.
    ///
    /// first call spends ~100ms calibrating.
    pub fn calibrated() -> Self {
        Self {
            hz: counter_frequency(),
        }
    }

    /// tsc clock with a known frequency (e.g. from cpuid or a previous run).
    pub const fn with_frequency(hz: u64) -> Self {
        Self { hz }
    }
}

impl Default for TscClock {
    fn default() -> Self {
        Self::calibrated()
    }
}

impl CycleClock for TscClock {
    #[inline(always)]
    fn now(&self) -> u64 {
        rdtsc()
    }

    #[inline(always)]
    fn cycles_per_second(&self) -> u64 {
        self.hz
    }
}

/// `Instant`-backed clock in nanoseconds, for hosts without a usable tsc.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleClock for MonotonicClock {
    #[inline]
    fn now(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    #[inline]
    fn cycles_per_second(&self) -> u64 {
        1_000_000_000
    }
}

/// manually driven clock.
///
/// with a non-zero auto-advance step every `now()` read moves time forward,
/// so spin loops polling it terminate deterministically.
#[derive(Debug)]
pub struct VirtualClock {
    ticks: AtomicU64,
    step: u64,
    hz: u64,
    reads: AtomicU64,
}

impl VirtualClock {
    /// frozen clock at tick 0.
    pub fn new(hz: u64) -> Self {
        Self::with_auto_advance(hz, 0)
    }

    /// clock advancing by `step` ticks after every read.
    pub fn with_auto_advance(hz: u64, step: u64) -> Self {
        Self {
            ticks: AtomicU64::new(0),
            step,
            hz,
            reads: AtomicU64::new(0),
        }
    }

    /// move time forward by `ticks`.
    pub fn advance(&self, ticks: u64) {
        self.ticks.fetch_add(ticks, Ordering::AcqRel);
    }

    /// move time forward by `duration`.
    pub fn advance_by(&self, duration: Duration) {
        self.advance(self.cycles_for(duration));
    }

    /// current tick without advancing.
    pub fn peek(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// number of `now()` calls so far.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

impl CycleClock for VirtualClock {
    #[inline]
    fn now(&self) -> u64 {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.ticks.fetch_add(self.step, Ordering::AcqRel)
    }

    #[inline]
    fn cycles_per_second(&self) -> u64 {
        self.hz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_clock_frozen() {
        let clock = VirtualClock::new(1_000);
        assert_eq!(clock.now(), 0);
        assert_eq!(clock.now(), 0);
        clock.advance(7);
        assert_eq!(clock.now(), 7);
        assert_eq!(clock.reads(), 3);
    }

    #[test]
    fn test_virtual_clock_auto_advance() {
        let clock = VirtualClock::with_auto_advance(1_000, 2);
        assert_eq!(clock.now(), 0);
        assert_eq!(clock.now(), 2);
        assert_eq!(clock.peek(), 4);
    }

    #[test]
    fn test_cycles_for() {
        let clock = VirtualClock::new(1_000);
        assert_eq!(clock.cycles_for(Duration::from_millis(500)), 500);
        clock.advance_by(Duration::from_secs(2));
        assert_eq!(clock.peek(), 2_000);
    }

    #[test]
    fn test_monotonic_clock() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        std::thread::sleep(Duration::from_millis(1));
        let b = clock.now();
        assert!(b >= a + 1_000_000);
        assert_eq!(clock.cycles_for(Duration::from_millis(500)), 500_000_000);
    }

    #[test]
    fn test_arc_clock_forwards() {
        let clock = Arc::new(VirtualClock::new(10));
        let shared: Arc<VirtualClock> = Arc::clone(&clock);
        clock.advance(3);
        assert_eq!(shared.now(), 3);
        assert_eq!(shared.cycles_per_second(), 10);
    }

    #[test]
    fn test_tsc_clock_with_frequency() {
        let clock = TscClock::with_frequency(3_000_000_000);
        assert_eq!(clock.cycles_for(Duration::from_millis(500)), 1_500_000_000);
        let a = clock.now();
        assert!(clock.now() >= a);
    }
}
