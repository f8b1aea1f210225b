use pulse_traits::DeviceError;
use thiserror::Error;

/// invalid worker configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("chunk size must be greater than 0")]
    ZeroChunkSize,

    #[error("chunk size {size} exceeds the maximum of {max}")]
    ChunkSizeTooLarge { size: usize, max: usize },

    #[error("cycle budget must be greater than 0")]
    ZeroCycleBudget,

    #[error("cycle budget is below one clock tick at {hz} Hz")]
    BudgetBelowResolution { hz: u64 },

    #[error("core {core} is out of range (max {max})")]
    CoreOutOfRange { core: usize, max: usize },
}

/// errors surfaced by the egress worker.
///
/// inside the loop these never escape a cycle: they are reported to the
/// diagnostic sink and the next cycle starts as usual.
#[derive(Debug, Error)]
pub enum EgressError {
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Cycle panicked: {}", .0.as_deref().unwrap_or("unhandled error"))]
    Panicked(Option<String>),
}

pub type Result<T> = std::result::Result<T, EgressError>;
