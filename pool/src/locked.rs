//! mutex-guarded, flow-keyed packet table.

use pulse_traits::PacketPool;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

struct Table<K, P> {
    // packets[i] belongs to keys[i]
    packets: Vec<P>,
    keys: Vec<K>,
    index: HashMap<K, usize>,
}

/// packet table behind a single exclusive lock.
///
/// removal swaps the last packet into the hole so the table stays
/// contiguous; snapshot order is therefore insertion order only until the
/// first removal.
pub struct LockedPool<K, P> {
    table: Mutex<Table<K, P>>,
}

impl<K: Hash + Eq + Clone, P> LockedPool<K, P> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: Mutex::new(Table {
                packets: Vec::with_capacity(capacity),
                keys: Vec::with_capacity(capacity),
                index: HashMap::with_capacity(capacity),
            }),
        }
    }

    // the egress side only reads, a panic there leaves the table intact
    fn lock(&self) -> MutexGuard<'_, Table<K, P>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// insert or replace the packet for `key`, returning the replaced one.
    pub fn add(&self, key: K, packet: P) -> Option<P> {
        let mut table = self.lock();
        if let Some(&slot) = table.index.get(&key) {
            return Some(std::mem::replace(&mut table.packets[slot], packet));
        }
        let slot = table.packets.len();
        table.packets.push(packet);
        table.keys.push(key.clone());
        table.index.insert(key, slot);
        None
    }

    /// remove the packet for `key`.
    pub fn remove(&self, key: &K) -> Option<P> {
        let mut table = self.lock();
        let slot = table.index.remove(key)?;
        let packet = table.packets.swap_remove(slot);
        table.keys.swap_remove(slot);
        if let Some(moved) = table.keys.get(slot).cloned() {
            table.index.insert(moved, slot);
        }
        Some(packet)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lock().index.contains_key(key)
    }

    /// drop every packet.
    pub fn clear(&self) {
        let mut table = self.lock();
        table.packets.clear();
        table.keys.clear();
        table.index.clear();
    }
}

impl<K: Hash + Eq + Clone, P> Default for LockedPool<K, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, P> PacketPool for LockedPool<K, P>
where
    K: Hash + Eq + Clone + Send,
    P: Send + Sync,
{
    type Packet = P;

    fn len(&self) -> usize {
        self.lock().packets.len()
    }

    // lock held until `f` returns
    fn with_snapshot<R>(&self, f: impl FnOnce(&[P]) -> R) -> R {
        let table = self.lock();
        f(&table.packets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    fn snapshot(pool: &LockedPool<u64, &'static str>) -> Vec<&'static str> {
        pool.with_snapshot(|packets| packets.to_vec())
    }

    #[test]
    fn test_add_keeps_insertion_order() {
        let pool = LockedPool::new();
        assert!(pool.is_empty());
        pool.add(1, "a");
        pool.add(2, "b");
        pool.add(3, "c");
        assert_eq!(pool.len(), 3);
        assert_eq!(snapshot(&pool), ["a", "b", "c"]);
    }

    #[test]
    fn test_add_replaces_existing_flow() {
        let pool = LockedPool::new();
        pool.add(1, "a");
        assert_eq!(pool.add(1, "a2"), Some("a"));
        assert_eq!(snapshot(&pool), ["a2"]);
    }

    #[test]
    fn test_remove_swaps_last_into_hole() {
        let pool = LockedPool::new();
        pool.add(1, "a");
        pool.add(2, "b");
        pool.add(3, "c");

        assert_eq!(pool.remove(&1), Some("a"));
        assert_eq!(snapshot(&pool), ["c", "b"]);
        assert!(!pool.contains(&1));

        // moved entry is still addressable
        assert_eq!(pool.remove(&3), Some("c"));
        assert_eq!(snapshot(&pool), ["b"]);
        assert_eq!(pool.remove(&3), None);
    }

    #[test]
    fn test_remove_last_entry() {
        let pool = LockedPool::new();
        pool.add(1, "a");
        pool.add(2, "b");
        assert_eq!(pool.remove(&2), Some("b"));
        assert_eq!(snapshot(&pool), ["a"]);
        assert!(pool.contains(&1));
    }

    #[test]
    fn test_clear() {
        let pool = LockedPool::new();
        pool.add(1, "a");
        pool.clear();
        assert!(pool.is_empty());
        assert!(!pool.contains(&1));
    }

    #[test]
    fn test_recovers_from_poisoned_lock() {
        let pool = LockedPool::new();
        pool.add(1, "a");

        let result = catch_unwind(AssertUnwindSafe(|| {
            pool.with_snapshot(|_| panic!("reader blew up"));
        }));
        assert!(result.is_err());

        assert_eq!(pool.len(), 1);
        pool.add(2, "b");
        assert_eq!(snapshot(&pool), ["a", "b"]);
    }
}
