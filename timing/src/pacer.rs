//! fixed-budget cycle pacing
//!
//! a cycle starts at a counter reading; [`CyclePacer::pace`] spins until the
//! configured budget has elapsed since that reading. it never sleeps, and a
//! cycle that already overran its budget returns at once: no catch-up, no
//! skipped cycles.

use crate::clock::CycleClock;
use pulse_cpu::{SpinMode, WaitStrategy};
use std::time::Duration;

/// result of one pacing step, in clock ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaceOutcome {
    /// ticks elapsed between cycle start and entering `pace`.
    pub elapsed: u64,
    /// ticks spent spinning.
    pub waited: u64,
    /// work alone exceeded the budget.
    pub overrun: bool,
}

impl PaceOutcome {
    /// total cycle length in ticks.
    #[inline]
    pub fn total(&self) -> u64 {
        self.elapsed.saturating_add(self.waited)
    }
}

/// spins out the remainder of a fixed cycle budget.
#[derive(Debug, Clone)]
pub struct CyclePacer<C, W = SpinMode> {
    clock: C,
    budget: u64,
    wait: W,
}

impl<C: CycleClock, W: WaitStrategy> CyclePacer<C, W> {
    /// pacer enforcing `budget` per cycle on `clock`.
    pub fn new(clock: C, budget: Duration, wait: W) -> Self {
        let budget = clock.cycles_for(budget);
        Self {
            clock,
            budget,
            wait,
        }
    }

    /// budget in clock ticks.
    #[inline]
    pub fn budget_cycles(&self) -> u64 {
        self.budget
    }

    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// counter reading marking the start of a cycle.
    #[inline(always)]
    pub fn start(&self) -> u64 {
        self.clock.now()
    }

    /// block until `budget` ticks have passed since `start`.
    pub fn pace(&self, start: u64) -> PaceOutcome {
        let entry = self.clock.now();
        let elapsed = entry.wrapping_sub(start);

        if elapsed >= self.budget {
            return PaceOutcome {
                elapsed,
                waited: 0,
                overrun: elapsed > self.budget,
            };
        }

        let mut last = entry;
        self.wait.spin_until(|| {
            last = self.clock.now();
            last.wrapping_sub(start) >= self.budget
        });

        PaceOutcome {
            elapsed,
            waited: last.wrapping_sub(entry),
            overrun: false,
        }
    }
}
