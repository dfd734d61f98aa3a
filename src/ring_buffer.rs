//! RingBuffer: double-ended queue/stack over a circular BackingStore.
//!
//! `front` is the slot of the first element and `back` the slot one past
//! the last, both modulo capacity. `front == back` means empty, so the ring
//! holds at most `capacity - 1` elements; it doubles as soon as it fills.

use crate::backing_store::BackingStore;
use crate::error::CollectionError;
use crate::stamp::{Cursor, Direction, Generation, ModificationStamp};

pub struct RingBuffer<T> {
    store: BackingStore<T>,
    front: usize,
    back: usize,
    stamp: ModificationStamp,
}

impl<T> RingBuffer<T> {
    pub fn new() -> Self {
        Self::from_store(BackingStore::new())
    }

    /// Ring with at least `capacity` slots (rounded up to a power of two).
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_store(BackingStore::with_capacity(capacity))
    }

    fn from_store(store: BackingStore<T>) -> Self {
        Self {
            store,
            front: 0,
            back: 0,
            stamp: ModificationStamp::new(),
        }
    }

    #[inline]
    fn mask(&self) -> usize {
        self.store.capacity() - 1
    }

    #[inline]
    fn slot(&self, index: usize) -> usize {
        (self.front + index) & self.mask()
    }

    pub fn len(&self) -> usize {
        if self.front <= self.back {
            self.back - self.front
        } else {
            self.store.capacity() + self.back - self.front
        }
    }

    pub fn is_empty(&self) -> bool {
        self.front == self.back
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    pub fn generation(&self) -> Generation {
        self.stamp.generation()
    }

    fn grow_if_full(&mut self) {
        let len = self.len();
        if len + 1 < self.store.capacity() {
            return;
        }
        let (front, mask) = (self.front, self.mask());
        self.store.grow(0, (0..len).map(|i| (front + i) & mask));
        self.front = 0;
        self.back = len;
    }

    pub fn push_back(&mut self, item: T) {
        self.store.put(self.back, item);
        self.back = (self.back + 1) & self.mask();
        self.stamp.bump();
        self.grow_if_full();
    }

    pub fn push_front(&mut self, item: T) {
        self.front = self.front.wrapping_sub(1) & self.mask();
        self.store.put(self.front, item);
        self.stamp.bump();
        self.grow_if_full();
    }

    pub fn pop_front(&mut self) -> Result<T, CollectionError> {
        if self.is_empty() {
            return Err(CollectionError::EmptyCollection);
        }
        let item = self.store.take(self.front).expect("front slot must be occupied");
        self.front = (self.front + 1) & self.mask();
        self.stamp.bump();
        Ok(item)
    }

    pub fn pop_back(&mut self) -> Result<T, CollectionError> {
        if self.is_empty() {
            return Err(CollectionError::EmptyCollection);
        }
        self.back = self.back.wrapping_sub(1) & self.mask();
        let item = self.store.take(self.back).expect("back slot must be occupied");
        self.stamp.bump();
        Ok(item)
    }

    /// Stack push (at the back).
    pub fn push(&mut self, item: T) {
        self.push_back(item);
    }

    /// Stack pop (from the back).
    pub fn pop(&mut self) -> Result<T, CollectionError> {
        self.pop_back()
    }

    /// FIFO enqueue (at the back).
    pub fn enqueue(&mut self, item: T) {
        self.push_back(item);
    }

    /// FIFO dequeue (from the front).
    pub fn dequeue(&mut self) -> Result<T, CollectionError> {
        self.pop_front()
    }

    pub fn peek_front(&self) -> Result<&T, CollectionError> {
        if self.is_empty() {
            return Err(CollectionError::EmptyCollection);
        }
        Ok(self.store.occupied(self.front))
    }

    pub fn peek_back(&self) -> Result<&T, CollectionError> {
        if self.is_empty() {
            return Err(CollectionError::EmptyCollection);
        }
        Ok(self.store.occupied(self.back.wrapping_sub(1) & self.mask()))
    }

    /// An arbitrary element; the front one.
    pub fn choose(&self) -> Result<&T, CollectionError> {
        self.peek_front()
    }

    /// Element `index` counted from the front.
    pub fn get(&self, index: usize) -> Result<&T, CollectionError> {
        let len = self.len();
        if index >= len {
            return Err(CollectionError::index(index, len));
        }
        Ok(self.store.occupied(self.slot(index)))
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut T, CollectionError> {
        let len = self.len();
        if index >= len {
            return Err(CollectionError::index(index, len));
        }
        let slot = self.slot(index);
        Ok(self.store.occupied_mut(slot))
    }

    /// Drop every element, keeping the current capacity.
    pub fn clear(&mut self) {
        if self.is_empty() {
            return;
        }
        let (front, mask) = (self.front, self.mask());
        for i in 0..self.len() {
            self.store.take((front + i) & mask);
        }
        self.front = 0;
        self.back = 0;
        self.stamp.bump();
    }

    /// Borrowing iterator, front to back; `.rev()` walks back to front.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            ring: self,
            front: 0,
            back: self.len(),
        }
    }

    /// Detached fail-fast traversal; advance it with [`RingBuffer::step`].
    pub fn cursor(&self, direction: Direction) -> Cursor {
        Cursor::new(self.stamp.generation(), direction, 0, self.len())
    }

    /// Next element of `cursor`, or `ConcurrentModification` if the ring was
    /// mutated since the cursor was created.
    pub fn step(&self, cursor: &mut Cursor) -> Result<Option<&T>, CollectionError> {
        self.stamp.check(cursor.generation())?;
        cursor.check_window(0, self.len())?;
        Ok(cursor.advance().map(|i| self.store.occupied(self.slot(i))))
    }
}

impl<T> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> Extend<T> for RingBuffer<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push_back(item);
        }
    }
}

impl<T> FromIterator<T> for RingBuffer<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut ring = RingBuffer::new();
        ring.extend(iter);
        ring
    }
}

/// Borrowing iterator over a [`RingBuffer`].
pub struct Iter<'a, T> {
    ring: &'a RingBuffer<T>,
    front: usize,
    back: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        let slot = self.ring.slot(self.front);
        self.front += 1;
        Some(self.ring.store.occupied(slot))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        Some(self.ring.store.occupied(self.ring.slot(self.back)))
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
