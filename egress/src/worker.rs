//! the pinned egress loop.
//!
//! one thread, one core: every cycle snapshots the pool, pushes it through
//! the [`BatchTransmitter`] and spins out the rest of the cycle budget.
//! faults are contained per cycle, the only way out of the loop is
//! [`EgressWorker::stop`].

use crate::config::EgressConfig;
use crate::error::{ConfigError, EgressError, Result};
use crate::sink::{DiagnosticSink, LogSink};
use crate::stats::{StatsSnapshot, WorkerStats};
use crate::transmit::{BatchTransmitter, CycleReport};
use log::{info, warn};
use pulse_cpu::{pin_current_thread, SpinMode, CPU_SETSIZE};
use pulse_timing::{CycleClock, CyclePacer, PaceOutcome, TscClock};
use pulse_traits::{NetworkDevice, PacketPool};
use std::any::Any;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::SystemTime;

/// core id reported before the first `run`; outside any valid cpu set.
pub const UNASSIGNED_CORE: usize = CPU_SETSIZE + 1;

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// lifecycle of an [`EgressWorker`]: idle -> running -> stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Stopped,
}

/// requests termination of a worker from any thread.
#[derive(Debug, Clone)]
pub struct StopHandle {
    state: Arc<AtomicU8>,
}

impl StopHandle {
    /// takes effect at the top of the next cycle.
    #[inline]
    pub fn stop(&self) {
        self.state.store(STOPPED, Ordering::Release);
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.state.load(Ordering::Acquire) == STOPPED
    }
}

/// paced egress worker.
pub struct EgressWorker<D, P, C = TscClock>
where
    D: NetworkDevice,
    P: PacketPool<Packet = D::Packet>,
    C: CycleClock,
{
    device: Arc<D>,
    pool: Arc<P>,
    config: EgressConfig,
    pacer: CyclePacer<C, SpinMode>,
    sink: Arc<dyn DiagnosticSink>,
    state: Arc<AtomicU8>,
    core_id: AtomicUsize,
    stats: WorkerStats,
}

impl<D, P> EgressWorker<D, P, TscClock>
where
    D: NetworkDevice,
    P: PacketPool<Packet = D::Packet>,
{
    /// worker on the calibrated tsc, logging through `log`.
    pub fn with_defaults(device: Arc<D>, pool: Arc<P>, config: EgressConfig) -> Result<Self> {
        Self::new(device, pool, config, TscClock::calibrated(), Arc::new(LogSink))
    }
}

impl<D, P, C> EgressWorker<D, P, C>
where
    D: NetworkDevice,
    P: PacketPool<Packet = D::Packet>,
    C: CycleClock,
{
    /// create a new worker. device and pool stay shared with their owners.
    pub fn new(
        device: Arc<D>,
        pool: Arc<P>,
        config: EgressConfig,
        clock: C,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self> {
        config.validate()?;

        let pacer = CyclePacer::new(clock, config.cycle_budget, config.spin);
        if pacer.budget_cycles() == 0 {
            return Err(ConfigError::BudgetBelowResolution {
                hz: pacer.clock().cycles_per_second(),
            }
            .into());
        }

        Ok(Self {
            device,
            pool,
            config,
            pacer,
            sink,
            state: Arc::new(AtomicU8::new(IDLE)),
            core_id: AtomicUsize::new(UNASSIGNED_CORE),
            stats: WorkerStats::new(),
        })
    }

    /// run the egress loop on the calling thread until stopped.
    ///
    /// returns `true` on clean exit, `false` if the worker was already
    /// running elsewhere. a worker stopped before it ever ran returns `true`
    /// without running a cycle.
    pub fn run(&self, core_id: usize) -> bool {
        match self
            .state
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {}
            Err(RUNNING) => {
                warn!(
                    "egress: worker already running on core {}, ignoring run({})",
                    self.core_id(),
                    core_id
                );
                return false;
            }
            Err(_) => {
                self.core_id.store(core_id, Ordering::Release);
                info!("egress: worker stopped before start");
                self.sink.worker_exited(core_id);
                return true;
            }
        }

        self.core_id.store(core_id, Ordering::Release);

        if self.config.pin_thread {
            match pin_current_thread(core_id) {
                Ok(()) => info!("egress: worker pinned to CPU core {}", core_id),
                Err(e) => warn!("egress: failed to pin worker to CPU core {}: {}", core_id, e),
            }
        }

        let transmitter = BatchTransmitter::new(
            &*self.device,
            self.config.batch_limits(),
            self.config.queue_id,
            self.config.flush,
        );

        info!(
            "egress: loop started (chunk_size={}, max_retries={}, max_chunk_failures={}, budget={:?})",
            self.config.chunk_size,
            self.config.max_retries,
            self.config.max_chunk_failures,
            self.config.cycle_budget
        );

        while self.state.load(Ordering::Acquire) == RUNNING {
            let cycle = catch_unwind(AssertUnwindSafe(|| self.run_cycle(&transmitter)))
                .unwrap_or_else(|payload| Err(EgressError::Panicked(panic_message(&*payload))));

            match &cycle {
                Ok((report, pace)) => self.stats.record_cycle(report, pace),
                Err(_) => self.stats.record_fault(),
            }

            let reported = catch_unwind(AssertUnwindSafe(|| match &cycle {
                Ok((report, pace)) => self.sink.cycle_completed(report, pace),
                Err(err) => self.sink.cycle_failed(err),
            }));
            if let Err(payload) = reported {
                warn!(
                    "egress: diagnostic sink panicked: {}",
                    panic_message(&*payload).as_deref().unwrap_or("unhandled error")
                );
            }
        }

        self.sink.worker_exited(core_id);
        true
    }

    // one cycle: start mark, diagnostics, snapshot + transmit, pace
    //
    // everything between the start mark and `pace` is fault-contained, so
    // every failed cycle still lasts at least one budget
    fn run_cycle(&self, transmitter: &BatchTransmitter<'_, D>) -> Result<(CycleReport, PaceOutcome)> {
        let start = self.pacer.start();
        let transmitted = catch_unwind(AssertUnwindSafe(|| {
            self.sink.cycle_started(SystemTime::now(), self.pool.len());
            self.pool
                .with_snapshot(|snapshot| transmitter.transmit(snapshot))
                .map_err(EgressError::from)
        }))
        .unwrap_or_else(|payload| Err(EgressError::Panicked(panic_message(&*payload))));
        let pace = self.pacer.pace(start);

        let report = transmitted?;
        if report.aborted {
            self.sink.cycle_aborted(&report);
        }
        Ok((report, pace))
    }

    /// request termination after the current cycle.
    #[inline]
    pub fn stop(&self) {
        self.state.store(STOPPED, Ordering::Release);
    }

    /// handle that can stop this worker without holding it.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// core passed to the latest `run`, or [`UNASSIGNED_CORE`].
    #[inline]
    pub fn core_id(&self) -> usize {
        self.core_id.load(Ordering::Acquire)
    }

    pub fn state(&self) -> WorkerState {
        match self.state.load(Ordering::Acquire) {
            IDLE => WorkerState::Idle,
            RUNNING => WorkerState::Running,
            _ => WorkerState::Stopped,
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &EgressConfig {
        &self.config
    }
}

impl<D, P, C> EgressWorker<D, P, C>
where
    D: NetworkDevice + 'static,
    P: PacketPool<Packet = D::Packet> + 'static,
    C: CycleClock + 'static,
{
    /// run the loop on a new thread named `pulse-egress-<core>`.
    pub fn spawn(self: &Arc<Self>, core_id: usize) -> io::Result<thread::JoinHandle<bool>> {
        let worker = Arc::clone(self);
        thread::Builder::new()
            .name(format!("pulse-egress-{core_id}"))
            .spawn(move || worker.run(core_id))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
}
