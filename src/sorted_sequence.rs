//! SortedSequence: a set kept strictly ascending in a BackingStore.
//!
//! Every lookup is a binary search over the occupied prefix `0..len`; every
//! query below is a `partition_point` with a different predicate, so the
//! sequence never needs more than two searches per operation.

use crate::backing_store::{BackingStore, Items};
use crate::error::CollectionError;
use crate::stamp::{Cursor, Direction, Generation, ModificationStamp};
use core::cmp::Ordering;

/// Total order used by a [`SortedSequence`].
pub trait Comparator<T: ?Sized> {
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

/// The order given by `T: Ord`.
#[derive(Copy, Clone, Debug, Default)]
pub struct NaturalOrder;

impl<T: Ord + ?Sized> Comparator<T> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

impl<T: ?Sized, F> Comparator<T> for F
where
    F: Fn(&T, &T) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self(a, b)
    }
}

/// Result of [`SortedSequence::cut`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cut<'a, T> {
    /// Largest element where the cut function is positive.
    pub low: Option<&'a T>,
    /// Least element where the cut function is negative.
    pub high: Option<&'a T>,
    /// Whether the cut function is zero on some element.
    pub found: bool,
}

/// Borrowing iterator over a [`SortedSequence`] or one of its ranges.
pub type Iter<'a, T> = Items<'a, T>;

pub struct SortedSequence<T, C = NaturalOrder> {
    store: BackingStore<T>,
    len: usize,
    cmp: C,
    stamp: ModificationStamp,
}

impl<T: Ord> SortedSequence<T> {
    pub fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_comparator(capacity, NaturalOrder)
    }
}

impl<T: Ord> Default for SortedSequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C: Comparator<T>> SortedSequence<T, C> {
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            store: BackingStore::new(),
            len: 0,
            cmp,
            stamp: ModificationStamp::new(),
        }
    }

    pub fn with_capacity_and_comparator(capacity: usize, cmp: C) -> Self {
        Self {
            store: BackingStore::with_capacity(capacity),
            len: 0,
            cmp,
            stamp: ModificationStamp::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    pub fn generation(&self) -> Generation {
        self.stamp.generation()
    }

    #[inline]
    fn at(&self, index: usize) -> &T {
        self.store.occupied(index)
    }

    /// First index whose element does not satisfy `below`.
    fn partition_point<P>(&self, mut below: P) -> usize
    where
        P: FnMut(&T) -> bool,
    {
        let (mut lo, mut hi) = (0, self.len);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if below(self.at(mid)) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Smallest index whose element is not less than `item`.
    fn lower_bound(&self, item: &T) -> usize {
        self.partition_point(|e| self.cmp.compare(e, item) == Ordering::Less)
    }

    /// Smallest index whose element is greater than `item`.
    fn upper_bound(&self, item: &T) -> usize {
        self.partition_point(|e| self.cmp.compare(e, item) != Ordering::Greater)
    }

    /// `Ok(position)` of an equal element, or `Err(position)` where `item`
    /// would be inserted. The position is the lower bound in both cases.
    pub fn binary_search(&self, item: &T) -> Result<usize, usize> {
        let pos = self.lower_bound(item);
        if pos < self.len && self.cmp.compare(self.at(pos), item) == Ordering::Equal {
            Ok(pos)
        } else {
            Err(pos)
        }
    }

    pub fn contains(&self, item: &T) -> bool {
        self.binary_search(item).is_ok()
    }

    /// The stored representative equal to `item`.
    pub fn find(&self, item: &T) -> Option<&T> {
        self.binary_search(item).ok().map(|pos| self.at(pos))
    }

    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.binary_search(item).ok()
    }

    pub fn get(&self, index: usize) -> Result<&T, CollectionError> {
        if index >= self.len {
            return Err(CollectionError::index(index, self.len));
        }
        Ok(self.at(index))
    }

    fn insert_at(&mut self, pos: usize, item: T) {
        if self.len == self.store.capacity() {
            self.store.grow(self.len + 1, 0..self.len);
        }
        self.store.shift_right(pos..self.len, 1);
        self.store.put(pos, item);
        self.len += 1;
        self.stamp.bump();
    }

    fn remove_at_unchecked(&mut self, pos: usize) -> T {
        let item = self.store.take(pos).expect("slot must be occupied");
        self.store.shift_left(pos + 1..self.len, 1);
        self.len -= 1;
        self.stamp.bump();
        item
    }

    fn remove_span(&mut self, lo: usize, hi: usize) -> usize {
        if lo >= hi {
            return 0;
        }
        self.store.clear_range(lo..hi);
        self.store.shift_left(hi..self.len, hi - lo);
        self.len -= hi - lo;
        self.stamp.bump();
        hi - lo
    }

    /// Insert `item` unless an equal element is present. Returns whether it
    /// was added.
    pub fn add(&mut self, item: T) -> bool {
        match self.binary_search(&item) {
            Ok(_) => false,
            Err(pos) => {
                self.insert_at(pos, item);
                true
            }
        }
    }

    /// Strict insert: the position of the new element, or
    /// `DuplicateNotAllowed` when an equal element is present.
    pub fn insert(&mut self, item: T) -> Result<usize, CollectionError> {
        match self.binary_search(&item) {
            Ok(_) => Err(CollectionError::DuplicateNotAllowed),
            Err(pos) => {
                self.insert_at(pos, item);
                Ok(pos)
            }
        }
    }

    pub fn remove(&mut self, item: &T) -> Option<T> {
        let pos = self.binary_search(item).ok()?;
        Some(self.remove_at_unchecked(pos))
    }

    pub fn remove_at(&mut self, index: usize) -> Result<T, CollectionError> {
        if index >= self.len {
            return Err(CollectionError::index(index, self.len));
        }
        Ok(self.remove_at_unchecked(index))
    }

    /// Replace the stored representative equal to `item`, returning the old
    /// one. Position is unchanged since the two compare equal.
    pub fn update(&mut self, item: T) -> Option<T> {
        let pos = self.binary_search(&item).ok()?;
        let old = self.store.put(pos, item);
        self.stamp.bump();
        old
    }

    /// The stored element equal to `item`, inserting `item` first when
    /// absent. The flag is `true` when it was already present.
    pub fn find_or_add(&mut self, item: T) -> (&T, bool) {
        match self.binary_search(&item) {
            Ok(pos) => (self.at(pos), true),
            Err(pos) => {
                self.insert_at(pos, item);
                (self.at(pos), false)
            }
        }
    }

    /// Update when present, add otherwise; returns the replaced element.
    pub fn update_or_add(&mut self, item: T) -> Option<T> {
        match self.binary_search(&item) {
            Ok(pos) => {
                let old = self.store.put(pos, item);
                self.stamp.bump();
                old
            }
            Err(pos) => {
                self.insert_at(pos, item);
                None
            }
        }
    }

    /// Merge an ascending sequence, skipping elements already present.
    /// Fails with `UnsortedInput`, leaving `self` untouched, when `items` is
    /// not ascending. Returns the number of elements added.
    pub fn add_sorted<I>(&mut self, items: I) -> Result<usize, CollectionError>
    where
        I: IntoIterator<Item = T>,
    {
        let incoming: Vec<T> = items.into_iter().collect();
        if incoming
            .windows(2)
            .any(|w| self.cmp.compare(&w[0], &w[1]) == Ordering::Greater)
        {
            return Err(CollectionError::UnsortedInput);
        }
        Ok(self.merge(incoming))
    }

    /// Add every element of `items` in any order. Returns the number added.
    pub fn add_all<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let mut incoming: Vec<T> = items.into_iter().collect();
        let cmp = &self.cmp;
        incoming.sort_by(|a, b| cmp.compare(a, b));
        self.merge(incoming)
    }

    /// O(n + m) merge of non-decreasing `incoming` into a fresh store.
    fn merge(&mut self, incoming: Vec<T>) -> usize {
        if incoming.is_empty() {
            return 0;
        }
        let total = self.len + incoming.len();
        let mut merged = BackingStore::with_capacity(total.max(self.store.capacity()));
        let (mut out, mut added) = (0, 0);
        {
            let len = self.len;
            let store = &mut self.store;
            let cmp = &self.cmp;
            let mut old = (0..len).filter_map(|i| store.take(i)).peekable();
            let mut new = incoming.into_iter().peekable();
            loop {
                let from_new = match (old.peek(), new.peek()) {
                    (None, None) => break,
                    (Some(_), None) => false,
                    (None, Some(_)) => true,
                    (Some(a), Some(b)) => match cmp.compare(a, b) {
                        Ordering::Less => false,
                        Ordering::Greater => true,
                        Ordering::Equal => {
                            new.next();
                            continue;
                        }
                    },
                };
                let next = if from_new { new.next() } else { old.next() };
                let Some(item) = next else { break };
                if from_new
                    && out > 0
                    && cmp.compare(merged.occupied(out - 1), &item) == Ordering::Equal
                {
                    continue;
                }
                merged.put(out, item);
                out += 1;
                if from_new {
                    added += 1;
                }
            }
        }
        self.store = merged;
        self.len = out;
        if added > 0 {
            self.stamp.bump();
        }
        added
    }

    /// Number of elements `>= bot`.
    pub fn count_from(&self, bot: &T) -> usize {
        self.len - self.lower_bound(bot)
    }

    /// Number of elements `< top`.
    pub fn count_to(&self, top: &T) -> usize {
        self.lower_bound(top)
    }

    /// Number of elements in `[bot, top)`.
    pub fn count_from_to(&self, bot: &T, top: &T) -> usize {
        self.lower_bound(top).saturating_sub(self.lower_bound(bot))
    }

    /// Elements `>= bot`, ascending.
    pub fn range_from(&self, bot: &T) -> Iter<'_, T> {
        self.store.iter_range(self.lower_bound(bot)..self.len)
    }

    /// Elements `< top`, ascending.
    pub fn range_to(&self, top: &T) -> Iter<'_, T> {
        self.store.iter_range(0..self.lower_bound(top))
    }

    /// Elements in `[bot, top)`, ascending.
    pub fn range_from_to(&self, bot: &T, top: &T) -> Iter<'_, T> {
        let lo = self.lower_bound(bot);
        let hi = self.lower_bound(top).max(lo);
        self.store.iter_range(lo..hi)
    }

    /// Remove elements `>= bot`; returns how many were removed.
    pub fn remove_range_from(&mut self, bot: &T) -> usize {
        let lo = self.lower_bound(bot);
        self.remove_span(lo, self.len)
    }

    /// Remove elements `< top`.
    pub fn remove_range_to(&mut self, top: &T) -> usize {
        let hi = self.lower_bound(top);
        self.remove_span(0, hi)
    }

    /// Remove elements in `[bot, top)`.
    pub fn remove_range_from_to(&mut self, bot: &T, top: &T) -> usize {
        let lo = self.lower_bound(bot);
        let hi = self.lower_bound(top);
        self.remove_span(lo, hi)
    }

    /// Greatest element strictly less than `item`.
    pub fn predecessor(&self, item: &T) -> Result<&T, CollectionError> {
        match self.lower_bound(item) {
            0 => Err(CollectionError::NoSuchItem),
            pos => Ok(self.at(pos - 1)),
        }
    }

    /// Greatest element less than or equal to `item`.
    pub fn weak_predecessor(&self, item: &T) -> Result<&T, CollectionError> {
        match self.upper_bound(item) {
            0 => Err(CollectionError::NoSuchItem),
            pos => Ok(self.at(pos - 1)),
        }
    }

    /// Least element strictly greater than `item`.
    pub fn successor(&self, item: &T) -> Result<&T, CollectionError> {
        let pos = self.upper_bound(item);
        if pos == self.len {
            return Err(CollectionError::NoSuchItem);
        }
        Ok(self.at(pos))
    }

    /// Least element greater than or equal to `item`.
    pub fn weak_successor(&self, item: &T) -> Result<&T, CollectionError> {
        let pos = self.lower_bound(item);
        if pos == self.len {
            return Err(CollectionError::NoSuchItem);
        }
        Ok(self.at(pos))
    }

    /// Partition the sequence by a cut function that compares the cut point
    /// to each element: `Greater` for elements below the cut, `Less` for
    /// elements above it. The function must be non-increasing along the
    /// sequence; otherwise the result is unspecified.
    pub fn cut<F>(&self, mut cut: F) -> Cut<'_, T>
    where
        F: FnMut(&T) -> Ordering,
    {
        let low_end = self.partition_point(|e| cut(e) == Ordering::Greater);
        let high_start = self.partition_point(|e| cut(e) != Ordering::Less);
        Cut {
            low: low_end.checked_sub(1).map(|i| self.at(i)),
            high: (high_start < self.len).then(|| self.at(high_start)),
            found: high_start > low_end,
        }
    }

    pub fn find_min(&self) -> Result<&T, CollectionError> {
        if self.len == 0 {
            return Err(CollectionError::EmptyCollection);
        }
        Ok(self.at(0))
    }

    pub fn find_max(&self) -> Result<&T, CollectionError> {
        if self.len == 0 {
            return Err(CollectionError::EmptyCollection);
        }
        Ok(self.at(self.len - 1))
    }

    /// Remove the least element; O(n) because the rest shifts left.
    pub fn delete_min(&mut self) -> Result<T, CollectionError> {
        if self.len == 0 {
            return Err(CollectionError::EmptyCollection);
        }
        Ok(self.remove_at_unchecked(0))
    }

    pub fn delete_max(&mut self) -> Result<T, CollectionError> {
        if self.len == 0 {
            return Err(CollectionError::EmptyCollection);
        }
        Ok(self.remove_at_unchecked(self.len - 1))
    }

    pub fn clear(&mut self) {
        if self.len == 0 {
            return;
        }
        self.store.clear_range(0..self.len);
        self.len = 0;
        self.stamp.bump();
    }

    /// Ascending borrowing iterator; `.rev()` for descending.
    pub fn iter(&self) -> Iter<'_, T> {
        self.store.iter_range(0..self.len)
    }

    /// Detached fail-fast traversal; advance it with [`SortedSequence::step`].
    pub fn cursor(&self, direction: Direction) -> Cursor {
        Cursor::new(self.stamp.generation(), direction, 0, self.len)
    }

    pub fn step(&self, cursor: &mut Cursor) -> Result<Option<&T>, CollectionError> {
        self.stamp.check(cursor.generation())?;
        cursor.check_window(0, self.len)?;
        Ok(cursor.advance().map(|i| self.at(i)))
    }
}

impl<T: core::fmt::Debug, C> core::fmt::Debug for SortedSequence<T, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set()
            .entries(self.store.iter_range(0..self.len))
            .finish()
    }
}

impl<T, C: Comparator<T>> Extend<T> for SortedSequence<T, C> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.add_all(iter);
    }
}

impl<T: Ord> FromIterator<T> for SortedSequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut seq = SortedSequence::new();
        seq.add_all(iter);
        seq
    }
}

impl<'a, T, C: Comparator<T>> IntoIterator for &'a SortedSequence<T, C> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(items: &[i32]) -> SortedSequence<i32> {
        items.iter().copied().collect()
    }

    fn contents<C: Comparator<i32>>(s: &SortedSequence<i32, C>) -> Vec<i32> {
        s.iter().copied().collect()
    }

    /// Invariant: binary search returns the lower bound whether or not found.
    #[test]
    fn binary_search_lower_bound() {
        let s = seq(&[10, 20, 30]);
        assert_eq!(s.binary_search(&20), Ok(1));
        assert_eq!(s.binary_search(&5), Err(0));
        assert_eq!(s.binary_search(&25), Err(2));
        assert_eq!(s.binary_search(&35), Err(3));
    }

    /// Invariant: duplicates are rejected without mutation or stamp change.
    #[test]
    fn add_rejects_duplicates() {
        let mut s = seq(&[1, 3]);
        let g = s.generation();
        assert!(!s.add(3));
        assert_eq!(s.generation(), g);
        assert!(s.add(2));
        assert_eq!(contents(&s), vec![1, 2, 3]);
        assert_eq!(s.insert(2), Err(CollectionError::DuplicateNotAllowed));
        assert_eq!(s.insert(0), Ok(0));
    }

    /// Invariant: growth past the initial capacity keeps order.
    #[test]
    fn grows_past_initial_capacity() {
        let mut s = SortedSequence::with_capacity(2);
        for i in (0..100).rev() {
            assert!(s.add(i));
        }
        assert_eq!(s.len(), 100);
        assert_eq!(s.capacity(), 128);
        assert_eq!(contents(&s), (0..100).collect::<Vec<_>>());
    }

    /// Invariant: cut splits at a monotone boundary.
    #[test]
    fn cut_between_elements() {
        let s = seq(&[10, 20, 30]);
        let c = s.cut(|x| 15_i32.cmp(x));
        assert_eq!(c.low, Some(&10));
        assert_eq!(c.high, Some(&20));
        assert!(!c.found);

        let c = s.cut(|x| 20_i32.cmp(x));
        assert_eq!((c.low, c.high, c.found), (Some(&10), Some(&30), true));

        let c = s.cut(|x| 5_i32.cmp(x));
        assert_eq!((c.low, c.high, c.found), (None, Some(&10), false));
    }

    /// Invariant: strict variants exclude an exact match, weak include it.
    #[test]
    fn predecessor_family() {
        let s = seq(&[10, 20, 30]);
        assert_eq!(s.predecessor(&20), Ok(&10));
        assert_eq!(s.weak_predecessor(&20), Ok(&20));
        assert_eq!(s.successor(&20), Ok(&30));
        assert_eq!(s.weak_successor(&20), Ok(&20));
        assert_eq!(s.predecessor(&10), Err(CollectionError::NoSuchItem));
        assert_eq!(s.successor(&30), Err(CollectionError::NoSuchItem));
        assert_eq!(s.weak_successor(&31), Err(CollectionError::NoSuchItem));
        assert_eq!(s.weak_predecessor(&9), Err(CollectionError::NoSuchItem));
    }

    /// Invariant: merge skips duplicates and rejects unsorted input atomically.
    #[test]
    fn add_sorted_merges() {
        let mut s = seq(&[2, 4, 6]);
        assert_eq!(s.add_sorted([1, 2, 3, 3, 7]), Ok(3));
        assert_eq!(contents(&s), vec![1, 2, 3, 4, 6, 7]);
        assert_eq!(s.add_sorted([9, 8]), Err(CollectionError::UnsortedInput));
        assert_eq!(contents(&s), vec![1, 2, 3, 4, 6, 7]);
    }

    /// Invariant: ranges and counts agree.
    #[test]
    fn ranges_and_counts() {
        let mut s = seq(&[1, 3, 5, 7, 9]);
        assert_eq!(s.count_from(&4), 3);
        assert_eq!(s.count_to(&5), 2);
        assert_eq!(s.count_from_to(&3, &8), 3);
        assert_eq!(s.count_from_to(&8, &3), 0);
        assert_eq!(s.range_from_to(&3, &8).copied().collect::<Vec<_>>(), vec![3, 5, 7]);
        assert_eq!(s.range_to(&5).rev().copied().collect::<Vec<_>>(), vec![3, 1]);
        assert_eq!(s.remove_range_from_to(&3, &8), 3);
        assert_eq!(contents(&s), vec![1, 9]);
    }

    /// Invariant: a reversed comparator yields descending storage.
    #[test]
    fn custom_comparator() {
        let mut s = SortedSequence::with_comparator(|a: &i32, b: &i32| b.cmp(a));
        s.add_all([1, 5, 3]);
        assert_eq!(contents(&s), vec![5, 3, 1]);
        assert_eq!(s.find_min(), Ok(&5));
    }
}
