use crate::error::ConfigError;
use pulse_cpu::{SpinMode, CPU_SETSIZE};
use std::time::Duration;

/// packets handed to the device per send attempt.
pub const DEFAULT_CHUNK_SIZE: usize = 32;

/// extra attempts for a chunk after a short send.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// failed chunks tolerated per cycle; one more aborts the cycle.
pub const DEFAULT_MAX_CHUNK_FAILURES: u32 = 5;

/// largest accepted chunk size.
pub const MAX_CHUNK_SIZE: usize = 4096;

/// minimum wall-clock length of one cycle.
pub const DEFAULT_CYCLE_BUDGET: Duration = Duration::from_millis(500);

/// configuration for the egress worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EgressConfig {
    /// packets per chunk.
    pub chunk_size: usize,

    /// retries per chunk beyond the first attempt.
    pub max_retries: u32,

    /// failed chunks tolerated per cycle before the rest is skipped.
    pub max_chunk_failures: u32,

    /// minimum length of one cycle, enforced by busy-waiting.
    pub cycle_budget: Duration,

    /// device tx queue.
    pub queue_id: u16,

    /// ask the device to flush after each burst.
    pub flush: bool,

    /// pin the worker thread to the core passed to `run`.
    pub pin_thread: bool,

    /// what the pacer does between counter polls.
    pub spin: SpinMode,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            max_chunk_failures: DEFAULT_MAX_CHUNK_FAILURES,
            cycle_budget: DEFAULT_CYCLE_BUDGET,
            queue_id: 0,
            flush: false,
            pin_thread: true,
            spin: SpinMode::Hint,
        }
    }
}

impl EgressConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_max_chunk_failures(mut self, max_chunk_failures: u32) -> Self {
        self.max_chunk_failures = max_chunk_failures;
        self
    }

    pub fn with_cycle_budget(mut self, cycle_budget: Duration) -> Self {
        self.cycle_budget = cycle_budget;
        self
    }

    pub fn with_queue_id(mut self, queue_id: u16) -> Self {
        self.queue_id = queue_id;
        self
    }

    pub fn with_flush(mut self, flush: bool) -> Self {
        self.flush = flush;
        self
    }

    pub fn with_pin_thread(mut self, pin_thread: bool) -> Self {
        self.pin_thread = pin_thread;
        self
    }

    pub fn with_spin(mut self, spin: SpinMode) -> Self {
        self.spin = spin;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::ChunkSizeTooLarge {
                size: self.chunk_size,
                max: MAX_CHUNK_SIZE,
            });
        }
        if self.cycle_budget.is_zero() {
            return Err(ConfigError::ZeroCycleBudget);
        }
        Ok(())
    }

    /// chunking and failure bounds for one cycle.
    pub fn batch_limits(&self) -> BatchLimits {
        BatchLimits {
            chunk_size: self.chunk_size,
            max_retries: self.max_retries,
            max_chunk_failures: self.max_chunk_failures,
        }
    }
}

/// bounds applied by the batch transmitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub chunk_size: usize,
    pub max_retries: u32,
    pub max_chunk_failures: u32,
}

impl Default for BatchLimits {
    fn default() -> Self {
        EgressConfig::default().batch_limits()
    }
}

/// check a core id against the cpu-set range.
pub fn validate_core(core: usize) -> Result<usize, ConfigError> {
    if core >= CPU_SETSIZE {
        return Err(ConfigError::CoreOutOfRange {
            core,
            max: CPU_SETSIZE - 1,
        });
    }
    Ok(core)
}
