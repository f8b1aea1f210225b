// wait strategies for spin-until-condition loops
// decides what a pinned thread does between two polls of its exit condition
//
// | strategy             | jitter   | cpu      | use case                       |
// |----------------------|----------|----------|--------------------------------|
// | BusySpinWait         | lowest   | highest  | isolated cores                 |
// | SpinLoopHintWait     | low      | high     | pinned core with smt sibling   |
// | YieldingWait         | moderate | low      | shared cores, tests            |

use {crate::hint::cpu_pause, std::str::FromStr};

// what to do after a failed poll
pub trait WaitStrategy: Send + Sync {
    // called once per failed poll, `spins` counts failed polls so far (starting at 1)
    fn relax(&self, spins: u64);

    // poll `done` until it returns true, returns number of failed polls
    #[inline]
    fn spin_until(&self, mut done: impl FnMut() -> bool) -> u64
    where
        Self: Sized,
    {
        let mut spins = 0u64;
        while !done() {
            spins += 1;
            self.relax(spins);
        }
        spins
    }
}

// pure busy spin - no hint, no yield
#[derive(Debug, Clone, Copy, Default)]
pub struct BusySpinWait;

impl WaitStrategy for BusySpinWait {
    #[inline(always)]
    fn relax(&self, _spins: u64) {}
}

// spin with PAUSE between polls
// frees pipeline resources for an smt sibling without giving up the core
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinLoopHintWait;

impl WaitStrategy for SpinLoopHintWait {
    #[inline(always)]
    fn relax(&self, _spins: u64) {
        cpu_pause();
    }
}

// spin `spin_tries` polls, then yield to the os scheduler once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YieldingWait {
    spin_tries: u32,
}

impl YieldingWait {
    #[inline]
    pub const fn new(spin_tries: u32) -> Self {
        Self { spin_tries }
    }
}

impl Default for YieldingWait {
    fn default() -> Self {
        Self::new(100)
    }
}

impl WaitStrategy for YieldingWait {
    #[inline]
    fn relax(&self, spins: u64) {
        if self.spin_tries == 0 || spins % u64::from(self.spin_tries) == 0 {
            std::thread::yield_now();
        } else {
            cpu_pause();
        }
    }
}

// runtime-selectable strategy, carried in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpinMode {
    Busy,
    #[default]
    Hint,
    Yield(YieldingWait),
}

impl WaitStrategy for SpinMode {
    #[inline]
    fn relax(&self, spins: u64) {
        match self {
            SpinMode::Busy => BusySpinWait.relax(spins),
            SpinMode::Hint => SpinLoopHintWait.relax(spins),
            SpinMode::Yield(wait) => wait.relax(spins),
        }
    }
}

impl FromStr for SpinMode {
    type Err = String;

    // "busy", "hint", "yield" or "yield:<spin_tries>"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "busy" => Ok(SpinMode::Busy),
            "hint" => Ok(SpinMode::Hint),
            "yield" => Ok(SpinMode::Yield(YieldingWait::default())),
            other => match other.strip_prefix("yield:") {
                Some(tries) => tries
                    .parse()
                    .map(|t| SpinMode::Yield(YieldingWait::new(t)))
                    .map_err(|_| format!("invalid yield spin count: {tries}")),
                None => Err(format!("unknown spin mode: {other}")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_spin_until_counts_failed_polls() {
        let polls = Cell::new(0u32);
        let spins = SpinLoopHintWait.spin_until(|| {
            polls.set(polls.get() + 1);
            polls.get() > 5
        });
        assert_eq!(spins, 5);
        assert_eq!(polls.get(), 6);
    }

    #[test]
    fn test_spin_until_already_done() {
        assert_eq!(BusySpinWait.spin_until(|| true), 0);
    }

    #[test]
    fn test_yielding_wait_terminates() {
        let polls = Cell::new(0u32);
        let spins = YieldingWait::new(2).spin_until(|| {
            polls.set(polls.get() + 1);
            polls.get() > 10
        });
        assert_eq!(spins, 10);
    }

    #[test]
    fn test_spin_mode_parse() {
        assert_eq!("busy".parse::<SpinMode>(), Ok(SpinMode::Busy));
        assert_eq!("HINT".parse::<SpinMode>(), Ok(SpinMode::Hint));
        assert_eq!(
            "yield".parse::<SpinMode>(),
            Ok(SpinMode::Yield(YieldingWait::new(100)))
        );
        assert_eq!(
            "yield:8".parse::<SpinMode>(),
            Ok(SpinMode::Yield(YieldingWait::new(8)))
        );
        assert!("yield:x".parse::<SpinMode>().is_err());
        assert!("sleep".parse::<SpinMode>().is_err());
    }
}
