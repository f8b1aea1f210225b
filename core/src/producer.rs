//! built-in packet producer.
//!
//! keeps the pool stocked with `packet_count` flows, rebuilding every
//! payload once per refresh interval with a fresh sequence number.

use log::{debug, info};
use pulse_pool::{LockedPool, SwapPool};
use pulse_traits::RawPacket;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const FILL: u8 = 0xA5;

/// pool side the producer writes to.
pub trait Refill: Send + Sync {
    /// replace the pool contents with `packets`.
    fn refill(&self, packets: Vec<RawPacket>);
}

impl Refill for LockedPool<u64, RawPacket> {
    fn refill(&self, packets: Vec<RawPacket>) {
        // flows are stable across refreshes, add replaces in place
        for packet in packets {
            self.add(packet.flow_id(), packet);
        }
    }
}

impl Refill for SwapPool<RawPacket> {
    fn refill(&self, packets: Vec<RawPacket>) {
        self.publish(packets);
    }
}

/// wire layout: flow id (8 bytes le) | sequence (8 bytes le) | fill.
/// truncated when `payload_size` is below the 16-byte header.
pub fn build_packet(flow_id: u64, seq: u64, payload_size: usize) -> RawPacket {
    let mut data = Vec::with_capacity(payload_size.max(16));
    data.extend_from_slice(&flow_id.to_le_bytes());
    data.extend_from_slice(&seq.to_le_bytes());
    data.resize(payload_size.max(16), FILL);
    data.truncate(payload_size);
    RawPacket::new(flow_id, data)
}

/// one full generation of packets.
pub fn build_generation(count: usize, seq: u64, payload_size: usize) -> Vec<RawPacket> {
    (0..count as u64)
        .map(|flow| build_packet(flow, seq, payload_size))
        .collect()
}

/// background refresher thread.
pub struct Producer {
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<u64>,
}

impl Producer {
    /// fill `pool` once, then keep refreshing it every `interval`.
    pub fn spawn<R: Refill + 'static>(
        pool: Arc<R>,
        count: usize,
        payload_size: usize,
        interval: Duration,
    ) -> io::Result<Self> {
        pool.refill(build_generation(count, 0, payload_size));
        info!(
            "producer: pool stocked with {} packets of {} bytes",
            count, payload_size
        );

        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name("pulse-producer".into())
            .spawn(move || {
                let mut seq = 0u64;
                loop {
                    let deadline = Instant::now() + interval;
                    while !flag.load(Ordering::Acquire) {
                        let now = Instant::now();
                        if now >= deadline {
                            break;
                        }
                        thread::park_timeout(deadline - now);
                    }
                    if flag.load(Ordering::Acquire) {
                        break;
                    }
                    seq += 1;
                    pool.refill(build_generation(count, seq, payload_size));
                    debug!("producer: generation {}", seq);
                }
                seq
            })?;

        Ok(Self { shutdown, handle })
    }

    /// stop refreshing; returns the number of refreshes done.
    pub fn stop(self) -> u64 {
        self.shutdown.store(true, Ordering::Release);
        self.handle.thread().unpark();
        self.handle.join().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_traits::PacketPool;

    #[test]
    fn test_packet_layout() {
        let packet = build_packet(7, 3, 20);
        let bytes = packet.as_ref();
        assert_eq!(packet.flow_id(), 7);
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[..8], &7u64.to_le_bytes());
        assert_eq!(&bytes[8..16], &3u64.to_le_bytes());
        assert!(bytes[16..].iter().all(|b| *b == FILL));

        assert_eq!(build_packet(7, 3, 4).len(), 4);
        assert!(build_packet(7, 3, 0).is_empty());
    }

    #[test]
    fn test_locked_refill_replaces_by_flow() {
        let pool: LockedPool<u64, RawPacket> = LockedPool::new();
        pool.refill(build_generation(4, 0, 32));
        pool.refill(build_generation(4, 1, 32));
        assert_eq!(pool.len(), 4);
        pool.with_snapshot(|packets| {
            assert!(packets.iter().all(|p| p.as_ref()[8..16] == 1u64.to_le_bytes()));
        });
    }

    #[test]
    fn test_producer_stocks_and_stops() {
        let pool = Arc::new(SwapPool::<RawPacket>::new());
        let producer =
            Producer::spawn(Arc::clone(&pool), 5, 64, Duration::from_secs(60)).unwrap();
        assert_eq!(pool.len(), 5);
        assert_eq!(pool.generation(), 1);
        // woken by stop, no refresh on the way out
        assert_eq!(producer.stop(), 0);
        assert_eq!(pool.generation(), 1);
    }
}
