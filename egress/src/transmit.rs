//! chunked burst transmission of one pool snapshot.
//!
//! the snapshot is cut into chunks of `chunk_size` packets, sent in snapshot
//! order. a short send is retried for the unsent tail of the same chunk, at
//! most `max_retries` times; a chunk still incomplete after that is
//! abandoned and counted as failed. once more than `max_chunk_failures`
//! chunks failed, the remaining chunks of the cycle are skipped.

use crate::config::BatchLimits;
use log::{debug, trace};
use pulse_traits::{DeviceError, NetworkDevice, TxFrame};

/// what one transmission phase did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// chunks in the snapshot.
    pub chunks_total: usize,
    /// chunks handed to the device at least once.
    pub chunks_attempted: usize,
    /// chunks fully accepted.
    pub chunks_sent: usize,
    /// packets accepted by the device.
    pub packets_sent: usize,
    /// `send_packets` calls.
    pub send_attempts: u64,
    /// calls beyond the first per chunk.
    pub retries: u64,
    /// chunks abandoned after exhausting retries.
    pub failed_chunks: u32,
    /// failure threshold hit, rest of the cycle skipped.
    pub aborted: bool,
}

impl CycleReport {
    /// chunks never attempted because the cycle was aborted.
    #[inline]
    pub fn skipped_chunks(&self) -> usize {
        self.chunks_total - self.chunks_attempted
    }
}

/// number of chunks a snapshot of `len` packets splits into.
#[inline]
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size)
}

/// sends snapshots through one device in bounded bursts.
pub struct BatchTransmitter<'d, D> {
    device: &'d D,
    limits: BatchLimits,
    queue_id: u16,
    flush: bool,
}

impl<'d, D: NetworkDevice> BatchTransmitter<'d, D> {
    pub fn new(device: &'d D, limits: BatchLimits, queue_id: u16, flush: bool) -> Self {
        Self {
            device,
            limits,
            queue_id,
            flush,
        }
    }

    #[inline]
    pub fn limits(&self) -> BatchLimits {
        self.limits
    }

    /// send every chunk of `snapshot`, in order.
    ///
    /// a device error ends the phase at once and is returned; short sends
    /// never are.
    pub fn transmit(&self, snapshot: &[D::Packet]) -> Result<CycleReport, DeviceError> {
        let chunk_size = self.limits.chunk_size.max(1);
        let port = self.device.port_id();
        let mut report = CycleReport {
            chunks_total: chunk_count(snapshot.len(), chunk_size),
            ..CycleReport::default()
        };

        // reused across chunks, frames only live for one chunk
        let mut frames: Vec<TxFrame<'_, D::Packet>> =
            Vec::with_capacity(chunk_size.min(snapshot.len()));

        for (index, chunk) in snapshot.chunks(chunk_size).enumerate() {
            frames.clear();
            frames.extend(
                chunk
                    .iter()
                    .map(|packet| TxFrame::bind(packet, port).release_on_completion()),
            );

            report.chunks_attempted += 1;
            if self.send_chunk(&frames, &mut report)? {
                report.chunks_sent += 1;
                continue;
            }

            report.failed_chunks += 1;
            debug!(
                "egress: chunk {} abandoned after {} attempts ({} failed this cycle)",
                index,
                self.limits.max_retries + 1,
                report.failed_chunks
            );

            if report.failed_chunks > self.limits.max_chunk_failures {
                report.aborted = true;
                break;
            }
        }

        Ok(report)
    }

    // true once the whole chunk was accepted
    fn send_chunk(
        &self,
        frames: &[TxFrame<'_, D::Packet>],
        report: &mut CycleReport,
    ) -> Result<bool, DeviceError> {
        let mut sent = 0usize;
        let mut attempts = 0u32;

        loop {
            let pending = &frames[sent..];
            let accepted = self
                .device
                .send_packets(pending, self.queue_id, self.flush)?
                .min(pending.len());

            attempts += 1;
            report.send_attempts += 1;
            if attempts > 1 {
                report.retries += 1;
            }

            sent += accepted;
            report.packets_sent += accepted;

            if sent == frames.len() {
                return Ok(true);
            }

            trace!(
                "egress: short send {}/{} (attempt {})",
                accepted,
                pending.len(),
                attempts
            );

            if attempts > self.limits.max_retries {
                return Ok(false);
            }
        }
    }
}
