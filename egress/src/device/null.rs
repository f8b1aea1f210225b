use pulse_traits::{DeviceError, NetworkDevice, TxFrame};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

/// accepts every frame and drops it; counts what went through.
#[derive(Debug)]
pub struct NullDevice<P> {
    port: u16,
    frames: AtomicU64,
    bursts: AtomicU64,
    _packet: PhantomData<fn() -> P>,
}

impl<P> NullDevice<P> {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            frames: AtomicU64::new(0),
            bursts: AtomicU64::new(0),
            _packet: PhantomData,
        }
    }

    /// frames accepted so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// `send_packets` calls so far.
    pub fn bursts(&self) -> u64 {
        self.bursts.load(Ordering::Relaxed)
    }
}

impl<P> Default for NullDevice<P> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<P: Send + Sync> NetworkDevice for NullDevice<P> {
    type Packet = P;

    #[inline]
    fn port_id(&self) -> u16 {
        self.port
    }

    fn send_packets(
        &self,
        frames: &[TxFrame<'_, P>],
        _queue_id: u16,
        _flush: bool,
    ) -> Result<usize, DeviceError> {
        self.bursts.fetch_add(1, Ordering::Relaxed);
        self.frames.fetch_add(frames.len() as u64, Ordering::Relaxed);
        Ok(frames.len())
    }
}
