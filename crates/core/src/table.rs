//! Per-CID context table with capacity-bounded LRU eviction.
//!
//! Grounded in the teacher's `Table<K, V>` pre-allocated-capacity `HashMap`
//! wrapper and its `Timer` (a bare `AtomicU64` logical clock used to order
//! sessions for eviction) from `session/mod.rs`. A ROHC endpoint never runs
//! concurrently with itself (§5), so the clock here is a plain `u64`
//! counter rather than the teacher's atomic — no internal locking is
//! needed either, unlike the teacher's `parking_lot`-guarded session map.

use ahash::HashMap;

/// Monotonic logical clock used to timestamp context accesses for LRU.
#[derive(Debug, Default)]
pub struct Timer(u64);

impl Timer {
    pub fn tick(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

struct Slot<C> {
    context: C,
    last_used: u64,
}

/// A capacity-bounded map from CID to context, evicting the
/// least-recently-used entry when a new CID is allocated past capacity.
pub struct ContextTable<C> {
    slots: HashMap<u16, Slot<C>>,
    capacity: usize,
    clock: Timer,
}

impl<C> ContextTable<C> {
    /// `max_cid` is the largest CID the table will ever hold; capacity is
    /// `max_cid + 1` slots (CID 0 included).
    pub fn new(max_cid: u16) -> Self {
        let capacity = max_cid as usize + 1;
        Self {
            slots: HashMap::with_capacity(capacity),
            capacity,
            clock: Timer::default(),
        }
    }

    pub fn get(&mut self, cid: u16) -> Option<&C> {
        let now = self.clock.tick();
        let slot = self.slots.get_mut(&cid)?;
        slot.last_used = now;
        Some(&slot.context)
    }

    pub fn get_mut(&mut self, cid: u16) -> Option<&mut C> {
        let now = self.clock.tick();
        let slot = self.slots.get_mut(&cid)?;
        slot.last_used = now;
        Some(&mut slot.context)
    }

    pub fn contains(&self, cid: u16) -> bool {
        self.slots.contains_key(&cid)
    }

    /// Inserts `context` under `cid`. If the table is at capacity and `cid`
    /// is not already present, evicts the least-recently-used entry first
    /// and returns its CID alongside the evicted context.
    pub fn insert(&mut self, cid: u16, context: C) -> Option<(u16, C)> {
        let now = self.clock.tick();
        let evicted = if self.slots.len() >= self.capacity && !self.slots.contains_key(&cid) {
            self.evict_lru()
        } else {
            None
        };

        self.slots.insert(
            cid,
            Slot {
                context,
                last_used: now,
            },
        );

        evicted
    }

    pub fn remove(&mut self, cid: u16) -> Option<C> {
        self.slots.remove(&cid).map(|slot| slot.context)
    }

    fn evict_lru(&mut self) -> Option<(u16, C)> {
        let lru_cid = self
            .slots
            .iter()
            .min_by_key(|(_, slot)| slot.last_used)
            .map(|(cid, _)| *cid)?;
        self.slots.remove(&lru_cid).map(|slot| (lru_cid, slot.context))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_round_trip() {
        let mut table = ContextTable::new(3);
        table.insert(0, "ctx0");
        assert_eq!(table.get(0), Some(&"ctx0"));
        assert_eq!(table.get(7), None);
    }

    #[test]
    fn evicts_least_recently_used_when_full() {
        let mut table = ContextTable::new(1); // capacity 2: CIDs 0 and 1
        table.insert(0, "a");
        table.insert(1, "b");
        // touch CID 0 so CID 1 becomes the LRU entry
        table.get(0);
        let evicted = table.insert(2, "c");
        assert_eq!(evicted, Some((1, "b")));
        assert!(table.contains(0));
        assert!(table.contains(2));
        assert!(!table.contains(1));
    }

    #[test]
    fn inserting_existing_cid_does_not_evict() {
        let mut table = ContextTable::new(0); // capacity 1
        table.insert(5, "a");
        let evicted = table.insert(5, "b");
        assert_eq!(evicted, None);
        assert_eq!(table.get(5), Some(&"b"));
    }
}
