//! cycle timing for paced worker loops
//!
//! provides the rdtsc counter, injectable clocks and the busy-wait pacer.

pub mod clock;
pub mod pacer;
pub mod rdtsc;

pub use clock::{CycleClock, MonotonicClock, TscClock, VirtualClock};
pub use pacer::{CyclePacer, PaceOutcome};
pub use rdtsc::{calibrate_frequency, counter_frequency, cycles_to_nanos, duration_to_cycles, rdtsc};
