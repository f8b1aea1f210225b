//! configuration for the pulse daemon.

use pulse_cpu::{cpu_count, physical_core_count, SpinMode};
use pulse_egress::{validate_core, ConfigError, EgressConfig};
use pulse_pool::PoolKind;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// errors while reading flags / env vars.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid value for {flag}: {value:?} ({reason})")]
    Invalid {
        flag: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Egress(#[from] ConfigError),
}

/// daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// datagram destination.
    pub target_addr: SocketAddr,
    /// local bind address of the udp device.
    pub bind_addr: SocketAddr,
    /// port id frames get bound to.
    pub port_id: u16,
    /// packets kept in the pool by the built-in producer.
    pub packet_count: usize,
    /// bytes per packet.
    pub payload_size: usize,
    /// how often the producer rebuilds the pool.
    pub refresh_interval: Duration,
    /// pool discipline.
    pub pool: PoolKind,
    /// core allocation.
    pub allocation: CoreAllocation,
    /// worker settings.
    pub egress: EgressConfig,
}

/// cpu core allocation for threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreAllocation {
    pub egress: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_addr: SocketAddr::from(([127, 0, 0, 1], 9000)),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 0)),
            port_id: 0,
            packet_count: 64,
            payload_size: 512,
            refresh_interval: Duration::from_secs(1),
            pool: PoolKind::default(),
            allocation: CoreAllocation::auto_detect(),
            egress: EgressConfig::default(),
        }
    }
}

impl Config {
    /// set datagram destination.
    pub fn with_target_addr(mut self, addr: SocketAddr) -> Self {
        self.target_addr = addr;
        self
    }

    /// set core allocation.
    pub fn with_allocation(mut self, allocation: CoreAllocation) -> Self {
        self.allocation = allocation;
        self
    }

    /// set pool discipline.
    pub fn with_pool(mut self, pool: PoolKind) -> Self {
        self.pool = pool;
        self
    }

    /// read `--flag value` arguments, falling back to `PULSE_*` env vars.
    ///
    /// `--core none` (or `PULSE_CORE=none`) disables pinning.
    pub fn parse(
        args: &[String],
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ParseError> {
        let lookup = |flag: &str, var: &str| arg_value(args, flag).or_else(|| env(var));
        let mut config = Config::default();

        if let Some(v) = lookup("--target", "PULSE_TARGET") {
            config.target_addr = parse_value("--target", v)?;
        }
        if let Some(v) = lookup("--bind", "PULSE_BIND") {
            config.bind_addr = parse_value("--bind", v)?;
        }
        if let Some(v) = lookup("--port-id", "PULSE_PORT_ID") {
            config.port_id = parse_value("--port-id", v)?;
        }
        if let Some(v) = lookup("--packets", "PULSE_PACKETS") {
            config.packet_count = parse_value("--packets", v)?;
        }
        if let Some(v) = lookup("--payload", "PULSE_PAYLOAD") {
            config.payload_size = parse_value("--payload", v)?;
        }
        if let Some(v) = lookup("--refresh-ms", "PULSE_REFRESH_MS") {
            config.refresh_interval = Duration::from_millis(parse_value("--refresh-ms", v)?);
        }
        if let Some(v) = lookup("--pool", "PULSE_POOL") {
            config.pool = parse_value::<PoolKind>("--pool", v)?;
        }
        if let Some(v) = lookup("--core", "PULSE_CORE") {
            config.allocation = if v.eq_ignore_ascii_case("none") {
                CoreAllocation::none()
            } else {
                CoreAllocation::new(Some(validate_core(parse_value("--core", v)?)?))
            };
        }

        let mut egress = EgressConfig::default();
        if let Some(v) = lookup("--chunk", "PULSE_CHUNK") {
            egress.chunk_size = parse_value("--chunk", v)?;
        }
        if let Some(v) = lookup("--retries", "PULSE_RETRIES") {
            egress.max_retries = parse_value("--retries", v)?;
        }
        if let Some(v) = lookup("--max-failures", "PULSE_MAX_FAILURES") {
            egress.max_chunk_failures = parse_value("--max-failures", v)?;
        }
        if let Some(v) = lookup("--budget-ms", "PULSE_BUDGET_MS") {
            egress.cycle_budget = Duration::from_millis(parse_value("--budget-ms", v)?);
        }
        if let Some(v) = lookup("--spin", "PULSE_SPIN") {
            egress.spin = parse_value::<SpinMode>("--spin", v)?;
        }
        egress.pin_thread = config.allocation.egress.is_some();
        egress.validate()?;
        config.egress = egress;

        Ok(config)
    }

    /// core handed to the worker; unpinned workers report core 0.
    pub fn worker_core(&self) -> usize {
        self.allocation.egress.unwrap_or(0)
    }
}

impl CoreAllocation {
    /// create allocation with an explicit egress core.
    pub fn new(egress: Option<usize>) -> Self {
        Self { egress }
    }

    /// auto-detect core allocation based on system topology.
    ///
    /// layout:
    /// - core 0: avoid (interrupts, housekeeping)
    /// - core 1: tokio / producer
    /// - core 2: egress worker (isolated)
    pub fn auto_detect() -> Self {
        let cores = cpu_count().unwrap_or(1);
        let physical = physical_core_count().unwrap_or(cores);
        Self::for_physical_cores(physical)
    }

    /// allocation for a machine with `physical` cores.
    pub fn for_physical_cores(physical: usize) -> Self {
        if physical >= 4 {
            Self { egress: Some(2) }
        } else {
            // <4 cores: no isolation
            Self::none()
        }
    }

    /// create allocation with no pinning.
    pub fn none() -> Self {
        Self { egress: None }
    }
}

impl Default for CoreAllocation {
    fn default() -> Self {
        Self::auto_detect()
    }
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

fn parse_value<T>(flag: &'static str, value: String) -> Result<T, ParseError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|e| ParseError::Invalid {
        flag,
        reason: e.to_string(),
        value,
    })
}
