//! Bounded lock-free object pool
//!
//! A fixed-size ring of reusable boxes. Two cursor words (`start`, `end`) pack a
//! 16-bit slot index, a wrap-around bit and, on `end` only, a lock bit. Both are
//! advanced with compare-and-swap; slots are `AtomicCell`s so taking and storing
//! an item never needs a lock.
//!
//! The pool is a cache, not a buffer: renting from an empty pool returns `None`
//! and returning into a full pool drops the item.

use crossbeam_utils::atomic::AtomicCell;
use crossbeam_utils::Backoff;
use std::sync::atomic::{AtomicU32, Ordering};

const MASK_VALUE: u32 = 0x0000_FFFF;
const MASK_LOOP: u32 = 0x4000_0000;
const MASK_LOCKED: u32 = 0x8000_0000;

/// Largest supported pool capacity (the slot index is 16 bits wide).
pub const MAX_POOL_CAPACITY: usize = (MASK_VALUE as usize) + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Index(u32);

impl Index {
    #[inline]
    fn value(self) -> usize {
        (self.0 & MASK_VALUE) as usize
    }

    #[inline]
    fn is_loop(self) -> bool {
        self.0 & MASK_LOOP != 0
    }

    #[inline]
    fn is_locked(self) -> bool {
        self.0 & MASK_LOCKED != 0
    }

    #[inline]
    fn inc(self) -> Index {
        Index(self.0 + 1)
    }

    /// Reset the slot index to zero and flip the wrap-around bit.
    #[inline]
    fn toggle_loop(self) -> Index {
        Index((self.0 & !MASK_VALUE) ^ MASK_LOOP)
    }

    #[inline]
    fn lock(self) -> Index {
        Index(self.0 | MASK_LOCKED)
    }

    #[inline]
    fn advance(self, max_index: usize) -> Index {
        if self.value() == max_index {
            self.toggle_loop()
        } else {
            self.inc()
        }
    }
}

/// Distance from `start` to `end`, or `None` when the two loads are not a
/// consistent snapshot (`start` appears ahead of `end`).
#[inline]
fn compute_size(start: Index, end: Index, capacity: usize) -> Option<usize> {
    let lap = 2 * capacity;
    let position = |index: Index| index.value() + if index.is_loop() { capacity } else { 0 };
    let size = (position(end) + lap - position(start)) % lap;
    (size <= capacity).then_some(size)
}

pub struct FixSizePool<T> {
    items: Box<[AtomicCell<Option<Box<T>>>]>,
    start: AtomicU32,
    end: AtomicU32,
    max_index: usize,
}

impl<T> FixSizePool<T> {
    /// Create a pool holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or larger than [`MAX_POOL_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity > 0 && capacity <= MAX_POOL_CAPACITY,
            "Pool capacity must be between 1 and {}",
            MAX_POOL_CAPACITY
        );
        let items = (0..capacity)
            .map(|_| AtomicCell::new(None))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            items,
            start: AtomicU32::new(0),
            end: AtomicU32::new(0),
            max_index: capacity - 1,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    /// Number of items currently cached.
    pub fn len(&self) -> usize {
        let start = Index(self.start.load(Ordering::SeqCst));
        let end = Index(self.end.load(Ordering::SeqCst));
        compute_size(start, end, self.capacity()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take a cached item, or `None` when the pool is empty.
    pub fn try_rent(&self) -> Option<Box<T>> {
        let backoff = Backoff::new();
        loop {
            // `start` first: `end` never trails a `start` loaded before it
            let start = Index(self.start.load(Ordering::SeqCst));
            let end = Index(self.end.load(Ordering::SeqCst));
            if end.is_locked() {
                // a return is writing its slot
                backoff.snooze();
                continue;
            }
            match compute_size(start, end, self.capacity()) {
                Some(0) => return None,
                Some(_) => {}
                None => {
                    backoff.spin();
                    continue;
                }
            }
            let next = start.advance(self.max_index);
            if self
                .start
                .compare_exchange(start.0, next.0, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                if let Some(item) = self.items[start.value()].take() {
                    return Some(item);
                }
                // slot was emptied by a racing lap; claim the next one
            }
            backoff.spin();
        }
    }

    /// Take a cached item or build a fresh one.
    pub fn rent_or_else(&self, create: impl FnOnce() -> T) -> Box<T> {
        match self.try_rent() {
            Some(item) => item,
            None => Box::new(create()),
        }
    }

    /// Hand an item back. Dropped silently when the pool is full.
    pub fn give_back(&self, item: Box<T>) {
        let backoff = Backoff::new();
        loop {
            let end = Index(self.end.load(Ordering::SeqCst));
            if end.is_locked() {
                backoff.snooze();
                continue;
            }
            let start = Index(self.start.load(Ordering::SeqCst));
            match compute_size(start, end, self.capacity()) {
                Some(size) if size >= self.capacity() => {
                    drop(item);
                    return;
                }
                Some(_) => {}
                None => {
                    // `end` moved after it was read
                    backoff.spin();
                    continue;
                }
            }
            let locked = end.lock();
            if self
                .end
                .compare_exchange(end.0, locked.0, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                backoff.spin();
                continue;
            }
            // slot reserved: no renter can pass `end` while it is locked
            if let Some(stale) = self.items[end.value()].swap(Some(item)) {
                drop(stale);
            }
            let next = end.advance(self.max_index);
            // only the lock holder moves `end`
            debug_assert_eq!(self.end.load(Ordering::SeqCst), locked.0);
            self.end.store(next.0, Ordering::SeqCst);
            return;
        }
    }
}

impl<T> std::fmt::Debug for FixSizePool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixSizePool")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}
