// thread-to-core pinning for dedicated worker threads

use {
    crate::error::CpuAffinityError,
    std::{fs, io},
};

// upper bound of cpu ids usable with CPU_SET
// fixed at 1024 in glibc across major distros
pub const CPU_SETSIZE: usize = 1024;

// pin calling thread to the given cpus
#[cfg(target_os = "linux")]
pub fn set_cpu_affinity(cpus: impl IntoIterator<Item = usize>) -> Result<(), CpuAffinityError> {
    // safety: cpu_set_t is pod type, zero-initialization standard
    let mut cpu_set: libc::cpu_set_t = unsafe { std::mem::zeroed() };
    let max_cpu = max_cpu_id()?;
    let mut has_cpus = false;

    for cpu in cpus {
        check_cpu(cpu, max_cpu)?;

        // safety: cpu validated against CPU_SETSIZE above
        unsafe {
            libc::CPU_SET(cpu, &mut cpu_set);
        }
        has_cpus = true;
    }

    if !has_cpus {
        return Err(CpuAffinityError::EmptyCpuList);
    }

    // safety: pid 0 targets the calling thread, set size matches cpu_set
    let result = unsafe {
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &cpu_set)
    };

    if result != 0 {
        return Err(CpuAffinityError::Io(io::Error::last_os_error()));
    }

    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn set_cpu_affinity(_cpus: impl IntoIterator<Item = usize>) -> Result<(), CpuAffinityError> {
    Err(CpuAffinityError::NotSupported)
}

// pin calling thread to exactly one core
#[inline]
pub fn pin_current_thread(core: usize) -> Result<(), CpuAffinityError> {
    set_cpu_affinity([core])
}

fn check_cpu(cpu: usize, max_cpu: usize) -> Result<(), CpuAffinityError> {
    if cpu > max_cpu {
        return Err(CpuAffinityError::InvalidCpu { cpu, max: max_cpu });
    }
    if cpu >= CPU_SETSIZE {
        return Err(CpuAffinityError::InvalidCpu {
            cpu,
            max: CPU_SETSIZE - 1,
        });
    }
    Ok(())
}

// highest online cpu id
#[cfg(target_os = "linux")]
pub fn max_cpu_id() -> Result<usize, CpuAffinityError> {
    // sysfs reports ranges like "0-127" or a single "0"
    if let Ok(content) = fs::read_to_string("/sys/devices/system/cpu/online") {
        if let Some(max) = parse_online_max(content.trim()) {
            return Ok(max);
        }
    }

    // safety: sysconf safe to call
    let count = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };

    if count <= 0 {
        return Err(CpuAffinityError::Io(io::Error::last_os_error()));
    }

    Ok((count as usize).saturating_sub(1))
}

#[cfg(not(target_os = "linux"))]
pub fn max_cpu_id() -> Result<usize, CpuAffinityError> {
    Err(CpuAffinityError::NotSupported)
}

// last number of the last range, e.g. "0-3,8-11" -> 11
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_online_max(content: &str) -> Option<usize> {
    let last = content.rsplit(',').next()?;
    let upper = last.rsplit('-').next()?;
    upper.trim().parse().ok()
}

// number of online logical cpus (max_cpu_id + 1)
pub fn cpu_count() -> Result<usize, CpuAffinityError> {
    Ok(max_cpu_id()?.saturating_add(1))
}
