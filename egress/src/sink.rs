//! observability side channel of the egress loop.
//!
//! the worker reports through [`DiagnosticSink`] and never reads anything
//! back, so swapping the sink changes output only, never control flow.

use crate::error::EgressError;
use crate::transmit::CycleReport;
use log::{error, info, warn};
use pulse_timing::PaceOutcome;
use std::time::{SystemTime, UNIX_EPOCH};

/// receives per-cycle diagnostics from the egress worker.
pub trait DiagnosticSink: Send + Sync {
    /// top of every cycle: wall-clock time and pool size.
    fn cycle_started(&self, now: SystemTime, pool_size: usize);

    /// a cycle finished its transmission and pacing phases.
    fn cycle_completed(&self, report: &CycleReport, pace: &PaceOutcome) {
        let _ = (report, pace);
    }

    /// too many failed chunks, the rest of the cycle was skipped.
    fn cycle_aborted(&self, report: &CycleReport);

    /// a cycle ended in an error or a panic.
    fn cycle_failed(&self, error: &EgressError);

    /// the loop observed `stop` and is returning.
    fn worker_exited(&self, core_id: usize);
}

/// default sink, writes through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn cycle_started(&self, now: SystemTime, pool_size: usize) {
        let millis = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        info!(
            "tick {}.{:03} pool_size {}",
            millis / 1000,
            millis % 1000,
            pool_size
        );
    }

    fn cycle_completed(&self, report: &CycleReport, pace: &PaceOutcome) {
        if pace.overrun {
            warn!(
                "egress: cycle overran its budget ({} ticks of work, {} packets)",
                pace.elapsed, report.packets_sent
            );
        }
    }

    fn cycle_aborted(&self, report: &CycleReport) {
        warn!(
            "egress: errors while sending packets, dropping send try ({} failed chunks, {} skipped)",
            report.failed_chunks,
            report.skipped_chunks()
        );
    }

    fn cycle_failed(&self, error: &EgressError) {
        error!("egress: {}", error);
    }

    fn worker_exited(&self, core_id: usize) {
        info!("egress: worker on core {} exited", core_id);
    }
}
