//! snapshot-swap pool: producers publish, the worker pins a generation.

use arc_swap::ArcSwap;
use pulse_traits::PacketPool;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// packet list published as immutable generations.
///
/// a reader keeps its generation alive for as long as it needs it; a
/// producer replacing the list meanwhile never waits on that reader.
pub struct SwapPool<P> {
    current: ArcSwap<Vec<P>>,
    generation: AtomicU64,
}

impl<P> SwapPool<P> {
    pub fn new() -> Self {
        Self::from_packets(Vec::new())
    }

    pub fn from_packets(packets: Vec<P>) -> Self {
        Self {
            current: ArcSwap::from_pointee(packets),
            generation: AtomicU64::new(0),
        }
    }

    /// replace the whole list.
    pub fn publish(&self, packets: Vec<P>) {
        self.current.store(Arc::new(packets));
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        log::trace!("pool: published generation {generation}");
    }

    /// drop every packet.
    pub fn clear(&self) {
        self.publish(Vec::new());
    }

    /// number of publishes so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// pin the current generation.
    pub fn load(&self) -> Arc<Vec<P>> {
        self.current.load_full()
    }
}

impl<P: Clone> SwapPool<P> {
    /// copy-modify-publish; `f` may run more than once under contention.
    pub fn update(&self, mut f: impl FnMut(&mut Vec<P>)) {
        self.current.rcu(|current| {
            let mut next = Vec::clone(current);
            f(&mut next);
            next
        });
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// append one packet.
    pub fn push(&self, packet: P) {
        self.update(|packets| packets.push(packet.clone()));
    }
}

impl<P> Default for SwapPool<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Send + Sync> PacketPool for SwapPool<P> {
    type Packet = P;

    fn len(&self) -> usize {
        self.current.load().len()
    }

    // holds a full Arc, not a guard: the transmit phase may be long
    fn with_snapshot<R>(&self, f: impl FnOnce(&[P]) -> R) -> R {
        let snapshot = self.current.load_full();
        f(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_snapshot() {
        let pool = SwapPool::new();
        assert!(pool.is_empty());

        pool.publish(vec![1, 2, 3]);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.generation(), 1);
        assert_eq!(pool.with_snapshot(|p| p.to_vec()), vec![1, 2, 3]);
    }

    #[test]
    fn test_producer_not_blocked_by_snapshot() {
        let pool = SwapPool::from_packets(vec![1, 2]);

        // a mutex pool would deadlock publishing from inside the snapshot
        let seen = pool.with_snapshot(|snapshot| {
            pool.publish(vec![9]);
            pool.push(10);
            snapshot.to_vec()
        });

        assert_eq!(seen, vec![1, 2]);
        assert_eq!(*pool.load(), vec![9, 10]);
        assert_eq!(pool.generation(), 2);
    }

    #[test]
    fn test_pinned_generation_survives_clear() {
        let pool = SwapPool::from_packets(vec!["a", "b"]);
        let pinned = pool.load();
        pool.clear();

        assert!(pool.is_empty());
        assert_eq!(*pinned, vec!["a", "b"]);
    }

    #[test]
    fn test_update_from_many_threads() {
        let pool = Arc::new(SwapPool::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        pool.push(t * 100 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(pool.len(), 200);
        assert_eq!(pool.generation(), 200);
    }
}
