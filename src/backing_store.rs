//! BackingStore: power-of-two slot array shared by every container.
//!
//! Slots are `Option<T>`; a vacated slot is always reset to `None` so the
//! store never retains ownership of removed elements. Which slots are
//! occupied is tracked by the owning container (a prefix for lists and
//! sorted sequences, a wrapped range for the ring buffer).

use core::cmp::Ordering;
use core::ops::Range;

/// Capacity used by `new()` and restored by `reset()`.
pub const DEFAULT_CAPACITY: usize = 8;

/// Smallest capacity a store is ever allocated with.
pub const MIN_CAPACITY: usize = 2;

/// Borrowing iterator over an occupied slot range.
pub type Items<'a, T> = core::iter::Flatten<core::slice::Iter<'a, Option<T>>>;

#[derive(Debug)]
pub struct BackingStore<T> {
    slots: Box<[Option<T>]>,
}

fn empty_slots<T>(capacity: usize) -> Box<[Option<T>]> {
    core::iter::repeat_with(|| None).take(capacity).collect()
}

impl<T> BackingStore<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Allocate at least `capacity` slots, rounded up to a power of two.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: empty_slots(capacity.max(MIN_CAPACITY).next_power_of_two()),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<&T> {
        self.slots.get(slot)?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        self.slots.get_mut(slot)?.as_mut()
    }

    /// Access a slot the owning container knows to be occupied.
    #[inline]
    pub fn occupied(&self, slot: usize) -> &T {
        self.slots[slot].as_ref().expect("slot must be occupied")
    }

    #[inline]
    pub fn occupied_mut(&mut self, slot: usize) -> &mut T {
        self.slots[slot].as_mut().expect("slot must be occupied")
    }

    /// Store `item` at `slot`, returning the previous occupant.
    #[inline]
    pub fn put(&mut self, slot: usize, item: T) -> Option<T> {
        self.slots[slot].replace(item)
    }

    /// Vacate `slot`.
    #[inline]
    pub fn take(&mut self, slot: usize) -> Option<T> {
        self.slots[slot].take()
    }

    #[inline]
    pub fn swap(&mut self, a: usize, b: usize) {
        self.slots.swap(a, b);
    }

    /// Reallocate with at least double capacity (and at least
    /// `min_capacity`), moving the items found at `live` to slots `0..`
    /// in iteration order.
    pub fn grow<I>(&mut self, min_capacity: usize, live: I)
    where
        I: IntoIterator<Item = usize>,
    {
        let capacity = (self.capacity() * 2).max(min_capacity.next_power_of_two());
        let mut slots = empty_slots(capacity);
        for (dst, src) in live.into_iter().enumerate() {
            slots[dst] = self.slots[src].take();
        }
        tracing::trace!(from = self.capacity(), to = capacity, "growing backing store");
        self.slots = slots;
    }

    /// Move `range` right by `by` slots. `range.end..range.end + by` must be
    /// vacant; it ends up at `range.start..range.start + by`.
    pub fn shift_right(&mut self, range: Range<usize>, by: usize) {
        if by == 0 {
            return;
        }
        self.slots[range.start..range.end + by].rotate_right(by);
    }

    /// Move `range` left by `by` slots. `range.start - by..range.start` must
    /// be vacant; it ends up at `range.end - by..range.end`.
    pub fn shift_left(&mut self, range: Range<usize>, by: usize) {
        if by == 0 {
            return;
        }
        self.slots[range.start - by..range.end].rotate_left(by);
    }

    /// Drop every item in `range`.
    pub fn clear_range(&mut self, range: Range<usize>) {
        for slot in &mut self.slots[range] {
            *slot = None;
        }
    }

    /// Drop everything and shrink back to `capacity`.
    pub fn reset(&mut self, capacity: usize) {
        tracing::trace!(from = self.capacity(), "resetting backing store");
        self.slots = empty_slots(capacity.max(MIN_CAPACITY).next_power_of_two());
    }

    /// Reverse the items in an occupied range.
    pub fn reverse_range(&mut self, range: Range<usize>) {
        self.slots[range].reverse();
    }

    /// Stable sort of an occupied range.
    pub fn sort_range_by<F>(&mut self, range: Range<usize>, mut compare: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.slots[range].sort_by(|a, b| match (a, b) {
            (Some(a), Some(b)) => compare(a, b),
            // occupied ranges hold no vacant slots
            _ => Ordering::Equal,
        });
    }

    /// Items in an occupied range, in slot order.
    pub fn iter_range(&self, range: Range<usize>) -> Items<'_, T> {
        self.slots[range].iter().flatten()
    }

    /// Whether every slot in `range` is vacant.
    pub fn is_vacant(&self, range: Range<usize>) -> bool {
        self.slots[range].iter().all(Option::is_none)
    }
}

impl<T> Default for BackingStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
