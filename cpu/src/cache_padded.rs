// cache-line padding for counters written by the egress thread and read by others
//
// the worker bumps its stats on every cycle while monitoring threads poll them;
// padding keeps each hot counter on its own line so readers never bounce the
// writer's line

use core::fmt;
use core::ops::Deref;

pub const CACHE_LINE_SIZE: usize = 64;

// aligned to 64, size rounded up to a multiple of 64, value at offset 0
#[repr(C, align(64))]
pub struct CachePadded<T> {
    value: T,
}

impl<T> CachePadded<T> {
    #[inline]
    pub const fn new(value: T) -> Self {
        Self { value }
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for CachePadded<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Default> Default for CachePadded<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for CachePadded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.value, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_layout() {
        assert_eq!(core::mem::align_of::<CachePadded<u8>>(), CACHE_LINE_SIZE);
        assert_eq!(core::mem::size_of::<CachePadded<u8>>(), CACHE_LINE_SIZE);
        assert_eq!(core::mem::size_of::<[CachePadded<AtomicU64>; 2]>(), 2 * CACHE_LINE_SIZE);
    }

    #[test]
    fn test_deref_counter() {
        let counter = CachePadded::new(AtomicU64::new(0));
        counter.fetch_add(3, Ordering::Relaxed);
        assert_eq!(counter.into_inner().into_inner(), 3);
    }
}
