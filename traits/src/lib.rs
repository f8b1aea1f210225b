//! shared contracts for pulse_* crates.
//!
//! the egress worker is written against these traits only: a
//! [`NetworkDevice`] that accepts bursts of frames and a [`PacketPool`] that
//! hands out a contiguous, read-only snapshot of pre-built packets.

use std::sync::Arc;
use thiserror::Error;

/// pre-built outbound packet: wire bytes plus the flow it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    flow_id: u64,
    data: Arc<[u8]>,
}

impl RawPacket {
    pub fn new(flow_id: u64, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            flow_id,
            data: data.into(),
        }
    }

    #[inline]
    pub fn flow_id(&self) -> u64 {
        self.flow_id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for RawPacket {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// who frees a frame's buffer once the device is done with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// caller keeps ownership, device must not free.
    Caller,
    /// device releases the buffer after transmission.
    Device,
}

/// one packet bound to a device port for a single send attempt.
#[derive(Debug)]
pub struct TxFrame<'a, P> {
    packet: &'a P,
    port: u16,
    release: Release,
}

impl<'a, P> TxFrame<'a, P> {
    /// bind `packet` to `port`, caller-owned.
    #[inline]
    pub fn bind(packet: &'a P, port: u16) -> Self {
        Self {
            packet,
            port,
            release: Release::Caller,
        }
    }

    /// hand buffer release to the device.
    #[inline]
    pub fn release_on_completion(mut self) -> Self {
        self.release = Release::Device;
        self
    }

    #[inline]
    pub fn packet(&self) -> &'a P {
        self.packet
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[inline]
    pub fn release(&self) -> Release {
        self.release
    }
}

/// errors a device reports instead of a (possibly short) sent count.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Link down on port {0}")]
    LinkDown(u16),

    #[error("Frame rejected: {0}")]
    Rejected(String),
}

/// burst transmit primitive.
pub trait NetworkDevice: Send + Sync {
    /// packet type the device can put on the wire.
    type Packet: Send + Sync;

    /// port frames get bound to.
    fn port_id(&self) -> u16;

    /// try to send `frames` on tx queue `queue_id`.
    ///
    /// returns how many leading frames were accepted; fewer than
    /// `frames.len()` is a short send, not an error. accepted frames marked
    /// [`Release::Device`] belong to the device from then on.
    fn send_packets(
        &self,
        frames: &[TxFrame<'_, Self::Packet>],
        queue_id: u16,
        flush: bool,
    ) -> Result<usize, DeviceError>;
}

/// blanket impl for Arc<T> - just forwards.
impl<T: NetworkDevice + ?Sized> NetworkDevice for Arc<T> {
    type Packet = T::Packet;

    #[inline]
    fn port_id(&self) -> u16 {
        (**self).port_id()
    }

    #[inline]
    fn send_packets(
        &self,
        frames: &[TxFrame<'_, Self::Packet>],
        queue_id: u16,
        flush: bool,
    ) -> Result<usize, DeviceError> {
        (**self).send_packets(frames, queue_id, flush)
    }
}

/// producer-populated packet collection, read by the egress worker.
pub trait PacketPool: Send + Sync {
    type Packet: Send + Sync;

    /// current number of packets.
    fn len(&self) -> usize;

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// run `f` over a contiguous, point-in-time view of the pool.
    ///
    /// the slice stays valid and unchanged for the duration of `f`; how that
    /// is guaranteed (exclusive lock, immutable generation) is up to the pool.
    fn with_snapshot<R>(&self, f: impl FnOnce(&[Self::Packet]) -> R) -> R;
}

impl<T: PacketPool> PacketPool for Arc<T> {
    type Packet = T::Packet;

    #[inline]
    fn len(&self) -> usize {
        (**self).len()
    }

    #[inline]
    fn with_snapshot<R>(&self, f: impl FnOnce(&[Self::Packet]) -> R) -> R {
        (**self).with_snapshot(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_packet() {
        let packet = RawPacket::new(7, vec![1u8, 2, 3]);
        assert_eq!(packet.flow_id(), 7);
        assert_eq!(packet.len(), 3);
        assert_eq!(packet.as_ref(), &[1, 2, 3]);
        assert!(RawPacket::new(0, Vec::new()).is_empty());
    }

    #[test]
    fn test_frame_binding() {
        let packet = RawPacket::new(1, vec![0u8; 4]);
        let frame = TxFrame::bind(&packet, 3);
        assert_eq!(frame.port(), 3);
        assert_eq!(frame.release(), Release::Caller);

        let frame = frame.release_on_completion();
        assert_eq!(frame.release(), Release::Device);
        assert_eq!(frame.packet().flow_id(), 1);
    }

    #[test]
    fn test_device_error_display() {
        assert_eq!(DeviceError::LinkDown(2).to_string(), "Link down on port 2");
        assert_eq!(
            DeviceError::Rejected("bad frame".into()).to_string(),
            "Frame rejected: bad frame"
        );
    }
}
