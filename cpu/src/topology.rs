// cpu topology detection, used to decide whether a worker can get an isolated core

use {
    crate::{
        affinity::{cpu_count, max_cpu_id},
        error::CpuAffinityError,
    },
    std::{collections::HashSet, fs},
};

// number of physical cores (hyperthread siblings counted once)
#[cfg(target_os = "linux")]
pub fn physical_core_count() -> Result<usize, CpuAffinityError> {
    let max_cpu = max_cpu_id()?;
    let ids = (0..=max_cpu).filter_map(|cpu| {
        let path = format!("/sys/devices/system/cpu/cpu{cpu}/topology/core_id");
        fs::read_to_string(path).ok()
    });

    match count_distinct_cores(ids, max_cpu) {
        // no topology in sysfs: assume no hyperthreading
        0 => cpu_count(),
        n => Ok(n),
    }
}

#[cfg(not(target_os = "linux"))]
pub fn physical_core_count() -> Result<usize, CpuAffinityError> {
    Err(CpuAffinityError::NotSupported)
}

// core_id values are package-local and sparse, bound them by max_cpu * 2
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn count_distinct_cores(ids: impl IntoIterator<Item = String>, max_cpu: usize) -> usize {
    let bound = max_cpu.saturating_mul(2);
    ids.into_iter()
        .filter_map(|raw| raw.trim().parse::<usize>().ok())
        .filter(|id| *id <= bound)
        .collect::<HashSet<_>>()
        .len()
}
