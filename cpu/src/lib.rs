// pulse-cpu

mod affinity;
mod cache_padded;
mod error;
mod hint;
mod topology;
pub mod wait_strategy;

pub use {
    affinity::{cpu_count, max_cpu_id, pin_current_thread, set_cpu_affinity, CPU_SETSIZE},
    cache_padded::{CachePadded, CACHE_LINE_SIZE},
    error::CpuAffinityError,
    hint::cpu_pause,
    topology::physical_core_count,
    wait_strategy::{BusySpinWait, SpinLoopHintWait, SpinMode, WaitStrategy, YieldingWait},
};
