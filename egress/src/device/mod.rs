//! concrete [`NetworkDevice`](pulse_traits::NetworkDevice) implementations.

mod null;
mod udp;

pub use null::NullDevice;
pub use udp::UdpDevice;
