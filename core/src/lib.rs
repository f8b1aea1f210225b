//! pulse daemon core.
//!
//! thin orchestration layer that wires together:
//! - **pulse_pool**: the shared packet pool (mutex table or swapped generations)
//! - **pulse_egress**: the pinned, paced egress worker and its udp device
//! - a built-in producer keeping the pool stocked
//!
//! # architecture
//!
//! ```text
//! ┌─────────────────┐                     ┌─────────────────┐
//! │    producer     │                     │  egress worker  │
//! │ (refresh timer) │                     │ (isolated core) │
//! └────────┬────────┘                     └────────┬────────┘
//!          │ refill                      snapshot  │ send_packets
//!          ▼                                       ▼
//! ┌─────────────────────────────────┐     ┌─────────────────┐
//! │ LockedPool / SwapPool<RawPacket>│     │    UdpDevice    │
//! └─────────────────────────────────┘     └─────────────────┘
//! ```

pub mod config;
pub mod producer;

pub use config::{Config, CoreAllocation, ParseError};
pub use producer::{build_generation, build_packet, Producer, Refill};
