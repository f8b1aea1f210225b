use crate::transmit::CycleReport;
use pulse_cpu::CachePadded;
use pulse_timing::PaceOutcome;
use std::sync::atomic::{AtomicU64, Ordering};

/// counters written by the egress thread, readable from any thread.
#[derive(Debug, Default)]
pub struct WorkerStats {
    cycles: CachePadded<AtomicU64>,
    packets_sent: CachePadded<AtomicU64>,
    retries: CachePadded<AtomicU64>,
    chunk_failures: CachePadded<AtomicU64>,
    aborted_cycles: CachePadded<AtomicU64>,
    overrun_cycles: CachePadded<AtomicU64>,
    faults: CachePadded<AtomicU64>,
}

/// point-in-time copy of [`WorkerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cycles: u64,
    pub packets_sent: u64,
    pub retries: u64,
    pub chunk_failures: u64,
    pub aborted_cycles: u64,
    pub overrun_cycles: u64,
    pub faults: u64,
}

impl WorkerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_cycle(&self, report: &CycleReport, pace: &PaceOutcome) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.packets_sent
            .fetch_add(report.packets_sent as u64, Ordering::Relaxed);
        self.retries.fetch_add(report.retries, Ordering::Relaxed);
        self.chunk_failures
            .fetch_add(u64::from(report.failed_chunks), Ordering::Relaxed);
        if report.aborted {
            self.aborted_cycles.fetch_add(1, Ordering::Relaxed);
        }
        if pace.overrun {
            self.overrun_cycles.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_fault(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            chunk_failures: self.chunk_failures.load(Ordering::Relaxed),
            aborted_cycles: self.aborted_cycles.load(Ordering::Relaxed),
            overrun_cycles: self.overrun_cycles.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_cycle() {
        let stats = WorkerStats::new();
        let report = CycleReport {
            packets_sent: 70,
            retries: 2,
            failed_chunks: 6,
            aborted: true,
            ..CycleReport::default()
        };
        let pace = PaceOutcome {
            elapsed: 700,
            waited: 0,
            overrun: true,
        };
        stats.record_cycle(&report, &pace);
        stats.record_fault();

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                cycles: 2,
                packets_sent: 70,
                retries: 2,
                chunk_failures: 6,
                aborted_cycles: 1,
                overrun_cycles: 1,
                faults: 1,
            }
        );
    }
}
