//! packet pools shared between a producer and the egress worker.
//!
//! two access disciplines:
//!
//! - [`LockedPool`]: one mutex guards a flow-keyed table; the worker holds it
//!   for the whole transmission phase, so producers wait out a burst.
//! - [`SwapPool`]: producers publish immutable generations through `ArcSwap`;
//!   the worker pins one generation per cycle and never blocks a producer.
//!
//! both keep packets in a contiguous `Vec` so a snapshot is a plain slice.

mod locked;
mod swap;

pub use locked::LockedPool;
pub use swap::SwapPool;

use std::str::FromStr;

/// which pool implementation to wire up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolKind {
    #[default]
    Locked,
    Swap,
}

impl FromStr for PoolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "locked" | "mutex" => Ok(PoolKind::Locked),
            "swap" => Ok(PoolKind::Swap),
            other => Err(format!("unknown pool kind: {other}")),
        }
    }
}
