//! Store slot indices and allocation.
//!
//! A [`UnitIndex`] is a dense 32-bit slot number into the columnar
//! [`UnitStore`](crate::store::UnitStore). Slots are handed out by the
//! [`SlotAllocator`], which recycles freed slots in FIFO order so that reuse
//! is spread out over time rather than concentrated on a hot slot.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

// ---------------------------------------------------------------------------
// UnitIndex
// ---------------------------------------------------------------------------

/// A stable integer index into the unit store.
///
/// The index stays valid for the lifetime of the unit. Once the unit is
/// pruned the slot may be handed to a later spawn.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitIndex(pub u32);

impl UnitIndex {
    /// The slot number as a `usize`, for column access.
    #[inline]
    pub fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for UnitIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitIndex({})", self.0)
    }
}

impl fmt::Display for UnitIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SlotAllocator
// ---------------------------------------------------------------------------

/// Allocates and recycles store slots up to a capacity.
///
/// The allocator never grows on its own; the store decides whether to
/// [`grow`](Self::grow) or reject when [`allocate`](Self::allocate) returns
/// `None`.
#[derive(Debug, Clone)]
pub struct SlotAllocator {
    /// Whether each slot currently holds an active unit.
    active: Vec<bool>,
    /// Recyclable slots (FIFO queue).
    free: VecDeque<u32>,
    /// Released slots held back from reuse until [`recycle`](Self::recycle).
    retired: Vec<u32>,
    /// Maximum number of slots.
    capacity: usize,
}

impl SlotAllocator {
    /// Create an allocator with room for `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            active: Vec::with_capacity(capacity),
            free: VecDeque::new(),
            retired: Vec::new(),
            capacity,
        }
    }

    /// Allocate a slot, or `None` when every slot is taken.
    ///
    /// Recycled slots are preferred over fresh ones.
    pub fn allocate(&mut self) -> Option<UnitIndex> {
        if let Some(slot) = self.free.pop_front() {
            self.active[slot as usize] = true;
            return Some(UnitIndex(slot));
        }
        if self.active.len() >= self.capacity {
            return None;
        }
        let slot = self.active.len() as u32;
        self.active.push(true);
        Some(UnitIndex(slot))
    }

    /// Return a slot to the free-list.
    ///
    /// Returns `false` if the slot was never allocated or is already free.
    pub fn release(&mut self, index: UnitIndex) -> bool {
        match self.active.get_mut(index.slot()) {
            Some(active) if *active => {
                *active = false;
                self.free.push_back(index.0);
                true
            }
            _ => false,
        }
    }

    /// Deactivate a slot without making it reusable yet.
    ///
    /// Returns `false` if the slot was never allocated or is already free.
    pub fn retire(&mut self, index: UnitIndex) -> bool {
        match self.active.get_mut(index.slot()) {
            Some(active) if *active => {
                *active = false;
                self.retired.push(index.0);
                true
            }
            _ => false,
        }
    }

    /// Move retired slots to the back of the free-list, in retirement order.
    /// Returns how many were moved.
    pub fn recycle(&mut self) -> usize {
        let n = self.retired.len();
        self.free.extend(self.retired.drain(..));
        n
    }

    /// Whether [`allocate`](Self::allocate) would succeed.
    pub fn has_room(&self) -> bool {
        !self.free.is_empty() || self.active.len() < self.capacity
    }

    /// Whether `index` currently holds an active unit.
    pub fn is_active(&self, index: UnitIndex) -> bool {
        self.active.get(index.slot()).copied().unwrap_or(false)
    }

    /// Raise the capacity. Existing slots are untouched.
    pub fn grow(&mut self, new_capacity: usize) {
        if new_capacity > self.capacity {
            self.capacity = new_capacity;
        }
    }

    /// Maximum number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots ever allocated (active, free or retired).
    pub fn high_water(&self) -> usize {
        self.active.len()
    }

    /// Number of currently active slots.
    pub fn active_count(&self) -> usize {
        self.active.len() - self.free.len() - self.retired.len()
    }

    /// Free slots in the order they will be reused.
    pub fn free_slots(&self) -> impl Iterator<Item = UnitIndex> + '_ {
        self.free.iter().map(|&i| UnitIndex(i))
    }

    /// Retired slots in retirement order.
    pub fn retired_slots(&self) -> impl Iterator<Item = UnitIndex> + '_ {
        self.retired.iter().map(|&i| UnitIndex(i))
    }

    /// Iterate active slots in ascending index order.
    pub fn iter_active(&self) -> impl Iterator<Item = UnitIndex> + '_ {
        self.active
            .iter()
            .enumerate()
            .filter(|(_, &a)| a)
            .map(|(i, _)| UnitIndex(i as u32))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_unique_slots() {
        let mut alloc = SlotAllocator::with_capacity(100);
        let mut slots: Vec<u32> = (0..100).map(|_| alloc.allocate().unwrap().0).collect();
        slots.sort();
        slots.dedup();
        assert_eq!(slots.len(), 100);
    }

    #[test]
    fn allocate_past_capacity_returns_none() {
        let mut alloc = SlotAllocator::with_capacity(2);
        assert!(alloc.allocate().is_some());
        assert!(alloc.allocate().is_some());
        assert!(alloc.allocate().is_none());
    }

    #[test]
    fn released_slot_is_recycled_fifo() {
        let mut alloc = SlotAllocator::with_capacity(3);
        let a = alloc.allocate().unwrap();
        let b = alloc.allocate().unwrap();
        let _c = alloc.allocate().unwrap();
        assert!(alloc.release(b));
        assert!(alloc.release(a));
        assert_eq!(alloc.allocate(), Some(b));
        assert_eq!(alloc.allocate(), Some(a));
    }

    #[test]
    fn double_release_returns_false() {
        let mut alloc = SlotAllocator::with_capacity(4);
        let a = alloc.allocate().unwrap();
        assert!(alloc.release(a));
        assert!(!alloc.release(a));
        assert!(!alloc.release(UnitIndex(99)));
    }

    #[test]
    fn grow_allows_more_slots() {
        let mut alloc = SlotAllocator::with_capacity(1);
        alloc.allocate().unwrap();
        assert!(alloc.allocate().is_none());
        alloc.grow(2);
        assert_eq!(alloc.allocate(), Some(UnitIndex(1)));
        assert_eq!(alloc.capacity(), 2);
    }

    #[test]
    fn active_iteration_skips_free_slots() {
        let mut alloc = SlotAllocator::with_capacity(4);
        let a = alloc.allocate().unwrap();
        let b = alloc.allocate().unwrap();
        let c = alloc.allocate().unwrap();
        alloc.release(b);
        let active: Vec<_> = alloc.iter_active().collect();
        assert_eq!(active, vec![a, c]);
        assert_eq!(alloc.active_count(), 2);
        assert_eq!(alloc.high_water(), 3);
    }

    #[test]
    fn retired_slot_waits_for_recycle() {
        let mut alloc = SlotAllocator::with_capacity(2);
        let a = alloc.allocate().unwrap();
        let _b = alloc.allocate().unwrap();
        assert!(alloc.retire(a));
        assert!(!alloc.retire(a));
        assert!(!alloc.is_active(a));
        assert_eq!(alloc.active_count(), 1);
        assert!(!alloc.has_room());
        assert_eq!(alloc.allocate(), None);

        assert_eq!(alloc.recycle(), 1);
        assert!(alloc.has_room());
        assert_eq!(alloc.allocate(), Some(a));
    }
}
