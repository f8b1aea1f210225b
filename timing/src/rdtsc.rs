//! rdtsc (read time-stamp counter) access and calibration
//!
//! on x86_64 reads the invariant tsc directly. elsewhere falls back to a
//! process-wide monotonic nanosecond counter so callers see the same api.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// reads the time-stamp counter
#[inline(always)]
#[cfg(target_arch = "x86_64")]
pub fn rdtsc() -> u64 {
    unsafe {
        let lo: u32;
        let hi: u32;
        std::arch::asm!(
            "rdtsc",
            out("eax") lo,
            out("edx") hi,
            options(nostack, nomem),
        );
        ((hi as u64) << 32) | (lo as u64)
    }
}

/// nanoseconds since first use, standing in for the tsc
#[inline(always)]
#[cfg(not(target_arch = "x86_64"))]
pub fn rdtsc() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// measures counter frequency against `Instant` over `window`
///
/// returns cycles per second.
pub fn calibrate_frequency(window: Duration) -> u64 {
    // warm up
    for _ in 0..10 {
        std::hint::black_box(rdtsc());
    }

    let start_instant = Instant::now();
    let start_cycles = rdtsc();

    while start_instant.elapsed() < window {
        std::hint::spin_loop();
    }

    let end_cycles = rdtsc();
    let nanos = start_instant.elapsed().as_nanos().max(1);
    let cycles = end_cycles.saturating_sub(start_cycles);

    ((cycles as u128 * 1_000_000_000) / nanos) as u64
}

/// counter frequency, calibrated once per process over 100ms
pub fn counter_frequency() -> u64 {
    static HZ: OnceLock<u64> = OnceLock::new();
    *HZ.get_or_init(|| {
        if cfg!(target_arch = "x86_64") {
            let hz = calibrate_frequency(Duration::from_millis(100));
            log::info!("timing: calibrated tsc at {:.3} ghz", hz as f64 / 1e9);
            hz
        } else {
            1_000_000_000
        }
    })
}

/// converts cycles to nanoseconds at `hz`
#[inline(always)]
pub fn cycles_to_nanos(cycles: u64, hz: u64) -> u64 {
    if hz == 0 {
        return 0;
    }
    ((cycles as u128 * 1_000_000_000) / hz as u128) as u64
}

/// converts a duration to cycles at `hz`, saturating at `u64::MAX`
#[inline(always)]
pub fn duration_to_cycles(duration: Duration, hz: u64) -> u64 {
    let cycles = (duration.as_nanos() * hz as u128) / 1_000_000_000;
    u64::try_from(cycles).unwrap_or(u64::MAX)
}
