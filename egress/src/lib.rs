//! pulse-egress: paced packet egress on a pinned core.
//!
//! a single [`EgressWorker`] pins itself to a core and, once per cycle,
//! pushes a snapshot of a shared [`PacketPool`](pulse_traits::PacketPool)
//! through a [`NetworkDevice`](pulse_traits::NetworkDevice) in bounded
//! bursts, then busy-waits out the remainder of the cycle budget.
//!
//! ```ignore
//! use pulse_egress::{device::NullDevice, EgressConfig, EgressWorker};
//! use pulse_pool::SwapPool;
//!
//! let worker = Arc::new(EgressWorker::with_defaults(
//!     Arc::new(NullDevice::new(0)),
//!     Arc::new(SwapPool::<RawPacket>::new()),
//!     EgressConfig::default(),
//! )?);
//! let handle = worker.spawn(2)?;
//! // ...
//! worker.stop();
//! handle.join();
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod sink;
pub mod stats;
pub mod transmit;
pub mod worker;

#[cfg(test)]
mod testing;

pub use config::{
    validate_core, BatchLimits, EgressConfig, DEFAULT_CHUNK_SIZE, DEFAULT_CYCLE_BUDGET,
    DEFAULT_MAX_CHUNK_FAILURES, DEFAULT_MAX_RETRIES, MAX_CHUNK_SIZE,
};
pub use error::{ConfigError, EgressError, Result};
pub use sink::{DiagnosticSink, LogSink};
pub use stats::{StatsSnapshot, WorkerStats};
pub use transmit::{chunk_count, BatchTransmitter, CycleReport};
pub use worker::{EgressWorker, StopHandle, WorkerState, UNASSIGNED_CORE};
