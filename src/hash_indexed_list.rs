//! HashIndexedList: ordered list with set semantics and live views.
//!
//! Every handle (the list itself and each view) shares one `Rc<RefCell<_>>`
//! holding the store, the position index, the view registry and the
//! modification stamp. A handle is either the whole list (`view == None`) or
//! a registered window. Operations on a handle address positions relative to
//! its window; the shared state works in absolute store positions.

use crate::backing_store::{BackingStore, DEFAULT_CAPACITY};
use crate::error::CollectionError;
use crate::position_index::{PositionIndex, Slot};
use crate::stamp::{Cursor, Direction, Generation, ModificationStamp};
use crate::view_registry::{Permutation, ViewKey, ViewRegistry, Window};
use core::cell::{Ref, RefCell, RefMut};
use core::cmp::Ordering;
use core::hash::{BuildHasher, Hash};
use core::ops::Range;
use hashbrown::{HashMap, HashTable};
use rand_core::RngCore;
use std::collections::hash_map::RandomState;
use std::rc::Rc;

struct Shared<T, S> {
    store: BackingStore<Slot<T>>,
    len: usize,
    index: PositionIndex<S>,
    views: ViewRegistry,
    stamp: ModificationStamp,
    initial_capacity: usize,
}

/// Shared state plus the keys of views dropped while it was borrowed.
struct SharedCell<T, S> {
    state: RefCell<Shared<T, S>>,
    orphans: RefCell<Vec<ViewKey>>,
}

/// Where a probed item lives relative to a window.
enum Placement {
    Inside(usize),
    Outside,
    Absent,
}

/// Counted bag of argument items for bulk set algebra.
struct Multiset<T, S> {
    counts: HashMap<T, usize, S>,
}

impl<T: Eq + Hash, S: BuildHasher> Multiset<T, S> {
    fn from_items<I: IntoIterator<Item = T>>(items: I, hasher: S) -> Self {
        let mut counts = HashMap::with_hasher(hasher);
        for item in items {
            *counts.entry(item).or_insert(0) += 1;
        }
        Self { counts }
    }

    fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Consume one copy of `item`; false if none is left.
    fn take(&mut self, item: &T) -> bool {
        match self.counts.get_mut(item) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }
}

impl<T, S> Shared<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    fn new(capacity: usize, hasher: S) -> Self {
        Self {
            store: BackingStore::with_capacity(capacity),
            len: 0,
            index: PositionIndex::with_hasher(hasher),
            views: ViewRegistry::new(),
            stamp: ModificationStamp::new(),
            initial_capacity: capacity,
        }
    }

    fn window(&self, view: Option<ViewKey>) -> Result<Window, CollectionError> {
        match view {
            None => Ok(Window::new(0, self.len)),
            Some(key) => self.views.window(key),
        }
    }

    fn position<Q>(&self, q: &Q) -> Option<usize>
    where
        T: core::borrow::Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.index.make_hash(q);
        self.index.find(&self.store, hash, q)
    }

    fn place(&self, window: Window, item: T) -> (Slot<T>, Placement) {
        let hash = self.index.make_hash(&item);
        let placement = match self.index.find(&self.store, hash, &item) {
            Some(p) if window.contains(p) => Placement::Inside(p),
            Some(_) => Placement::Outside,
            None => Placement::Absent,
        };
        (Slot { item, hash }, placement)
    }

    /// Hash `items`, dropping (or, when `strict`, rejecting) any already in
    /// the list or repeated within the batch.
    fn fresh_slots<I>(&self, items: I, strict: bool) -> Result<Vec<Slot<T>>, CollectionError>
    where
        I: IntoIterator<Item = T>,
    {
        let mut slots: Vec<Slot<T>> = Vec::new();
        let mut seen: HashTable<usize> = HashTable::new();
        for item in items {
            let hash = self.index.make_hash(&item);
            let duplicate = self.index.find(&self.store, hash, &item).is_some()
                || seen
                    .find(hash, |&i| slots[i].hash == hash && slots[i].item == item)
                    .is_some();
            if duplicate {
                if strict {
                    return Err(CollectionError::DuplicateNotAllowed);
                }
                continue;
            }
            seen.insert_unique(hash, slots.len(), |&i| slots[i].hash);
            slots.push(Slot { item, hash });
        }
        Ok(slots)
    }

    fn resize_view(&mut self, view: Option<ViewKey>, f: impl FnOnce(&mut Window)) {
        if let Some(window) = view.and_then(|key| self.views.window_mut(key).ok()) {
            f(window);
        }
    }

    fn reserve(&mut self, additional: usize) {
        let needed = self.len + additional;
        if needed > self.store.capacity() {
            self.store.grow(needed, 0..self.len);
        }
    }

    /// Insert a run of fresh slots at absolute position `at`.
    fn insert_slots(&mut self, view: Option<ViewKey>, at: usize, slots: Vec<Slot<T>>) {
        let added = slots.len();
        if added == 0 {
            return;
        }
        self.reserve(added);
        self.index.unindex(&self.store, at..self.len);
        self.store.shift_right(at..self.len, added);
        for (pos, slot) in (at..).zip(slots) {
            self.store.put(pos, slot);
        }
        self.len += added;
        self.index.reindex(&self.store, at..self.len);
        self.views.fix_after_insert(view, at, added);
        self.resize_view(view, |w| w.size += added);
        self.stamp.bump();
    }

    /// Remove `count` items starting at absolute position `start`.
    fn remove_span(&mut self, view: Option<ViewKey>, start: usize, count: usize) -> Vec<T> {
        if count == 0 {
            return Vec::new();
        }
        self.views.fix_before_remove(view, start, count);
        self.resize_view(view, |w| w.size -= count);
        self.index.unindex(&self.store, start..self.len);
        let removed: Vec<T> = (start..start + count)
            .filter_map(|p| self.store.take(p))
            .map(|slot| slot.item)
            .collect();
        self.store.shift_left(start + count..self.len, count);
        self.len -= count;
        self.index.reindex(&self.store, start..self.len);
        self.stamp.bump();
        removed
    }

    /// Remove every item of `window` flagged in `doomed` in one pass.
    fn compact(&mut self, view: Option<ViewKey>, window: Window, doomed: &[bool]) -> usize {
        let mut runs = Vec::new();
        let mut p = 0;
        while p < doomed.len() {
            if doomed[p] {
                let start = p;
                while p < doomed.len() && doomed[p] {
                    p += 1;
                }
                runs.push((window.offset + start, p - start));
            } else {
                p += 1;
            }
        }
        let removed: usize = runs.iter().map(|&(_, count)| count).sum();
        if removed == 0 {
            return 0;
        }
        self.views.fix_before_remove_runs(view, &runs);
        self.resize_view(view, |w| w.size -= removed);
        self.index.unindex(&self.store, window.offset..self.len);
        let mut write = window.offset;
        for (read, &gone) in (window.offset..).zip(doomed) {
            if gone {
                self.store.take(read);
            } else {
                if write != read {
                    self.store.swap(write, read);
                }
                write += 1;
            }
        }
        self.store.shift_left(window.end()..self.len, removed);
        self.len -= removed;
        self.index.reindex(&self.store, window.offset..self.len);
        self.stamp.bump();
        removed
    }

    /// Reorder `window` in place with `f` and settle the other views.
    fn permute<F>(&mut self, view: Option<ViewKey>, window: Window, kind: Permutation, f: F)
    where
        F: FnOnce(&mut BackingStore<Slot<T>>, Range<usize>),
    {
        if window.size == 0 {
            return;
        }
        let range = window.offset..window.end();
        self.index.unindex(&self.store, range.clone());
        f(&mut self.store, range.clone());
        self.index.reindex(&self.store, range);
        self.views.fix_after_permutation(view, window, kind);
        self.stamp.bump();
    }

    /// Replace the item at `pos`, moving its index entry.
    fn replace(&mut self, pos: usize, item: T) -> Result<T, CollectionError> {
        let hash = self.index.make_hash(&item);
        match self.index.find(&self.store, hash, &item) {
            Some(p) if p != pos => return Err(CollectionError::DuplicateNotAllowed),
            _ => {}
        }
        let old_hash = self.store.occupied(pos).hash;
        self.index.remove(old_hash, pos);
        let old = self
            .store
            .put(pos, Slot { item, hash })
            .expect("replaced slot must be occupied");
        self.index.insert(&self.store, pos);
        self.stamp.bump();
        Ok(old.item)
    }

    /// Swap in an equal representative; the cached hash stays valid.
    fn overwrite(&mut self, pos: usize, slot: Slot<T>) -> T {
        let old = self
            .store
            .put(pos, slot)
            .expect("overwritten slot must be occupied");
        self.stamp.bump();
        old.item
    }

    fn clear_all(&mut self) {
        let disposed = self.views.dispose_all();
        if disposed > 0 {
            tracing::debug!(disposed, "disposed all views of cleared list");
        }
        self.index.clear();
        self.store.reset(self.initial_capacity);
        self.len = 0;
        self.stamp.bump();
    }

    fn is_consistent(&self) -> bool {
        let mut ok = true;
        let capacity = self.store.capacity();
        if self.len > capacity {
            tracing::warn!(len = self.len, capacity, "length exceeds store capacity");
            return false;
        }
        if !capacity.is_power_of_two() {
            tracing::warn!(capacity, "store capacity is not a power of two");
            ok = false;
        }
        for pos in 0..self.len {
            let Some(slot) = self.store.get(pos) else {
                tracing::warn!(pos, "vacant slot inside the list");
                ok = false;
                continue;
            };
            if self.index.make_hash(&slot.item) != slot.hash {
                tracing::warn!(pos, "cached hash is stale");
                ok = false;
            }
            match self.index.find(&self.store, slot.hash, &slot.item) {
                Some(p) if p == pos => {}
                found => {
                    tracing::warn!(pos, ?found, "index does not map item to its position");
                    ok = false;
                }
            }
        }
        if !self.store.is_vacant(self.len..capacity) {
            tracing::warn!(len = self.len, "occupied slot past the end of the list");
            ok = false;
        }
        if self.index.len() != self.len {
            tracing::warn!(
                indexed = self.index.len(),
                len = self.len,
                "index size differs from list length"
            );
            ok = false;
        }
        if let Some(pos) = self.index.positions().find(|&p| p >= self.len) {
            tracing::warn!(pos, "index entry past the end of the list");
            ok = false;
        }
        for (_, window) in self.views.iter() {
            if window.end() > self.len {
                tracing::warn!(
                    offset = window.offset,
                    size = window.size,
                    len = self.len,
                    "view exceeds the underlying list"
                );
                ok = false;
            }
        }
        ok
    }
}

/// An ordered list without duplicates, or a live view into one.
///
/// Membership, `index_of` and removal by value resolve through a hash index
/// in O(1). Structural mutations through any handle keep every other live
/// view positioned over the same items.
///
/// Borrowing an item with [`get`](Self::get), [`first`](Self::first) or
/// [`last`](Self::last) keeps the shared state borrowed: mutating any alias
/// while the returned `Ref` is alive panics, as does re-entering the list
/// from `Hash`, `Eq` or a user callback.
pub struct HashIndexedList<T, S = RandomState> {
    shared: Rc<SharedCell<T, S>>,
    view: Option<ViewKey>,
}

impl<T: Eq + Hash> HashIndexedList<T> {
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<T: Eq + Hash> Default for HashIndexedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> HashIndexedList<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Clone,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(DEFAULT_CAPACITY, hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            shared: Rc::new(SharedCell {
                state: RefCell::new(Shared::new(capacity, hasher)),
                orphans: RefCell::new(Vec::new()),
            }),
            view: None,
        }
    }

    fn shared(&self) -> Ref<'_, Shared<T, S>> {
        self.shared.state.borrow()
    }

    fn shared_mut(&self) -> RefMut<'_, Shared<T, S>> {
        let mut shared = self.shared.state.borrow_mut();
        for key in self.shared.orphans.borrow_mut().drain(..) {
            shared.views.dispose(key);
        }
        shared
    }

    fn alias(&self, key: ViewKey) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            view: Some(key),
        }
    }

    fn same_list(&self, other: &Self) -> Result<(), CollectionError> {
        if Rc::ptr_eq(&self.shared, &other.shared) {
            Ok(())
        } else {
            Err(CollectionError::IncompatibleView)
        }
    }

    // ---- state -------------------------------------------------------------

    pub fn len(&self) -> Result<usize, CollectionError> {
        Ok(self.shared().window(self.view)?.size)
    }

    pub fn is_empty(&self) -> Result<bool, CollectionError> {
        Ok(self.len()? == 0)
    }

    /// Slot count of the shared store.
    pub fn capacity(&self) -> usize {
        self.shared().store.capacity()
    }

    pub fn generation(&self) -> Generation {
        self.shared().stamp.generation()
    }

    pub fn is_view(&self) -> bool {
        self.view.is_some()
    }

    /// False once this view has been disposed; the list itself is always valid.
    pub fn is_valid(&self) -> bool {
        match self.view {
            None => true,
            Some(key) => self.shared().views.contains(key),
        }
    }

    /// Absolute offset of this window in the underlying list (0 for the list).
    pub fn offset(&self) -> Result<usize, CollectionError> {
        Ok(self.shared().window(self.view)?.offset)
    }

    /// Check the index bijection, slot hygiene and view bounds of the whole
    /// underlying list. Violations are reported through `tracing`.
    pub fn is_consistent(&self) -> bool {
        self.shared().is_consistent()
    }

    // ---- lookup ------------------------------------------------------------

    pub fn contains<Q>(&self, q: &Q) -> Result<bool, CollectionError>
    where
        T: core::borrow::Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        Ok(self.index_of(q)?.is_some())
    }

    /// Position of `q` within this window.
    pub fn index_of<Q>(&self, q: &Q) -> Result<Option<usize>, CollectionError>
    where
        T: core::borrow::Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let shared = self.shared();
        let w = shared.window(self.view)?;
        Ok(shared
            .position(q)
            .filter(|&p| w.contains(p))
            .map(|p| p - w.offset))
    }

    /// Whether every item of `items` is in this window.
    pub fn contains_all<'a, I>(&self, items: I) -> Result<bool, CollectionError>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let shared = self.shared();
        let w = shared.window(self.view)?;
        Ok(items
            .into_iter()
            .all(|item| shared.position(item).is_some_and(|p| w.contains(p))))
    }

    pub fn get(&self, index: usize) -> Result<Ref<'_, T>, CollectionError> {
        let shared = self.shared();
        let w = shared.window(self.view)?;
        if index >= w.size {
            return Err(CollectionError::index(index, w.size));
        }
        Ok(Ref::map(shared, |s| &s.store.occupied(w.offset + index).item))
    }

    pub fn first(&self) -> Result<Ref<'_, T>, CollectionError> {
        match self.len()? {
            0 => Err(CollectionError::EmptyCollection),
            _ => self.get(0),
        }
    }

    pub fn last(&self) -> Result<Ref<'_, T>, CollectionError> {
        match self.len()? {
            0 => Err(CollectionError::EmptyCollection),
            n => self.get(n - 1),
        }
    }

    pub fn is_sorted_by<F>(&self, mut compare: F) -> Result<bool, CollectionError>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let shared = self.shared();
        let w = shared.window(self.view)?;
        let mut items = shared.store.iter_range(w.offset..w.end()).map(|s| &s.item);
        let Some(mut prev) = items.next() else {
            return Ok(true);
        };
        for item in items {
            if compare(prev, item) == Ordering::Greater {
                return Ok(false);
            }
            prev = item;
        }
        Ok(true)
    }

    // ---- insertion ---------------------------------------------------------

    /// Append `item` at the end of this window unless it is already in the
    /// underlying list.
    pub fn add(&mut self, item: T) -> Result<bool, CollectionError> {
        let view = self.view;
        let mut shared = self.shared_mut();
        let w = shared.window(view)?;
        let (slot, placement) = shared.place(w, item);
        match placement {
            Placement::Absent => {
                shared.insert_slots(view, w.end(), vec![slot]);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Append the items not yet present, in order; returns how many were added.
    pub fn add_all<I>(&mut self, items: I) -> Result<usize, CollectionError>
    where
        I: IntoIterator<Item = T>,
    {
        let view = self.view;
        let mut shared = self.shared_mut();
        let w = shared.window(view)?;
        let slots = shared.fresh_slots(items, false)?;
        let added = slots.len();
        shared.insert_slots(view, w.end(), slots);
        Ok(added)
    }

    pub fn insert(&mut self, index: usize, item: T) -> Result<(), CollectionError> {
        let view = self.view;
        let mut shared = self.shared_mut();
        let w = shared.window(view)?;
        if index > w.size {
            return Err(CollectionError::index(index, w.size));
        }
        let (slot, placement) = shared.place(w, item);
        match placement {
            Placement::Absent => {
                shared.insert_slots(view, w.offset + index, vec![slot]);
                Ok(())
            }
            _ => Err(CollectionError::DuplicateNotAllowed),
        }
    }

    pub fn insert_first(&mut self, item: T) -> Result<(), CollectionError> {
        self.insert(0, item)
    }

    pub fn insert_last(&mut self, item: T) -> Result<(), CollectionError> {
        let len = self.len()?;
        self.insert(len, item)
    }

    /// Insert `items` at `index` as one run. Nothing is inserted if any item
    /// is already present or repeated.
    pub fn insert_all<I>(&mut self, index: usize, items: I) -> Result<(), CollectionError>
    where
        I: IntoIterator<Item = T>,
    {
        let view = self.view;
        let mut shared = self.shared_mut();
        let w = shared.window(view)?;
        if index > w.size {
            return Err(CollectionError::index(index, w.size));
        }
        let slots = shared.fresh_slots(items, true)?;
        shared.insert_slots(view, w.offset + index, slots);
        Ok(())
    }

    /// Insert `item` at the end of `pointer`, a view on the same list whose
    /// end falls inside this window.
    pub fn insert_after(&mut self, pointer: &Self, item: T) -> Result<(), CollectionError> {
        self.same_list(pointer)?;
        let (end, w) = {
            let shared = self.shared();
            (shared.window(pointer.view)?.end(), shared.window(self.view)?)
        };
        match end.checked_sub(w.offset).filter(|&i| i <= w.size) {
            Some(index) => self.insert(index, item),
            None => Err(CollectionError::OutOfRange {
                offset: end as isize - w.offset as isize,
                size: 0,
                len: w.size,
            }),
        }
    }

    /// Overwrite position `index`, returning the previous item.
    pub fn set(&mut self, index: usize, item: T) -> Result<T, CollectionError> {
        let mut shared = self.shared_mut();
        let w = shared.window(self.view)?;
        if index >= w.size {
            return Err(CollectionError::index(index, w.size));
        }
        shared.replace(w.offset + index, item)
    }

    /// Replace the stored item equal to `item`; returns the old one.
    pub fn update(&mut self, item: T) -> Result<Option<T>, CollectionError> {
        let mut shared = self.shared_mut();
        let w = shared.window(self.view)?;
        match shared.place(w, item) {
            (slot, Placement::Inside(pos)) => Ok(Some(shared.overwrite(pos, slot))),
            _ => Ok(None),
        }
    }

    /// True if an equal item was already in this window, false if `item`
    /// was appended. Fails if it sits in the list outside this window.
    pub fn find_or_add(&mut self, item: T) -> Result<bool, CollectionError> {
        let view = self.view;
        let mut shared = self.shared_mut();
        let w = shared.window(view)?;
        match shared.place(w, item) {
            (_, Placement::Inside(_)) => Ok(true),
            (_, Placement::Outside) => Err(CollectionError::DuplicateNotAllowed),
            (slot, Placement::Absent) => {
                shared.insert_slots(view, w.end(), vec![slot]);
                Ok(false)
            }
        }
    }

    /// Update the equal item in this window, or append `item`.
    pub fn update_or_add(&mut self, item: T) -> Result<Option<T>, CollectionError> {
        let view = self.view;
        let mut shared = self.shared_mut();
        let w = shared.window(view)?;
        match shared.place(w, item) {
            (slot, Placement::Inside(pos)) => Ok(Some(shared.overwrite(pos, slot))),
            (_, Placement::Outside) => Err(CollectionError::DuplicateNotAllowed),
            (slot, Placement::Absent) => {
                shared.insert_slots(view, w.end(), vec![slot]);
                Ok(None)
            }
        }
    }

    // ---- removal -----------------------------------------------------------

    /// Remove `q` from this window; `None` if it is not there.
    pub fn remove<Q>(&mut self, q: &Q) -> Result<Option<T>, CollectionError>
    where
        T: core::borrow::Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let view = self.view;
        let mut shared = self.shared_mut();
        let w = shared.window(view)?;
        let Some(pos) = shared.position(q).filter(|&p| w.contains(p)) else {
            return Ok(None);
        };
        Ok(shared.remove_span(view, pos, 1).pop())
    }

    pub fn remove_at(&mut self, index: usize) -> Result<T, CollectionError> {
        let view = self.view;
        let mut shared = self.shared_mut();
        let w = shared.window(view)?;
        if index >= w.size {
            return Err(CollectionError::index(index, w.size));
        }
        shared
            .remove_span(view, w.offset + index, 1)
            .pop()
            .ok_or(CollectionError::index(index, w.size))
    }

    pub fn remove_first(&mut self) -> Result<T, CollectionError> {
        match self.len()? {
            0 => Err(CollectionError::EmptyCollection),
            _ => self.remove_at(0),
        }
    }

    pub fn remove_last(&mut self) -> Result<T, CollectionError> {
        match self.len()? {
            0 => Err(CollectionError::EmptyCollection),
            n => self.remove_at(n - 1),
        }
    }

    /// Remove `count` items starting at `start`, returning them in order.
    pub fn remove_interval(
        &mut self,
        start: usize,
        count: usize,
    ) -> Result<Vec<T>, CollectionError> {
        let view = self.view;
        let mut shared = self.shared_mut();
        let w = shared.window(view)?;
        if start.checked_add(count).map_or(true, |end| end > w.size) {
            return Err(CollectionError::OutOfRange {
                offset: start as isize,
                size: count,
                len: w.size,
            });
        }
        Ok(shared.remove_span(view, w.offset + start, count))
    }

    /// Keep only the items matching `keep`; returns how many were removed.
    pub fn retain<F>(&mut self, mut keep: F) -> Result<usize, CollectionError>
    where
        F: FnMut(&T) -> bool,
    {
        let view = self.view;
        let mut shared = self.shared_mut();
        let w = shared.window(view)?;
        let doomed: Vec<bool> = shared
            .store
            .iter_range(w.offset..w.end())
            .map(|s| !keep(&s.item))
            .collect();
        Ok(shared.compact(view, w, &doomed))
    }

    /// Remove every item that occurs in `items`.
    pub fn remove_all<I>(&mut self, items: I) -> Result<usize, CollectionError>
    where
        I: IntoIterator<Item = T>,
    {
        let view = self.view;
        let mut shared = self.shared_mut();
        let w = shared.window(view)?;
        let mut bag = Multiset::from_items(items, shared.index.hasher().clone());
        if bag.is_empty() {
            return Ok(0);
        }
        let doomed: Vec<bool> = shared
            .store
            .iter_range(w.offset..w.end())
            .map(|s| bag.take(&s.item))
            .collect();
        Ok(shared.compact(view, w, &doomed))
    }

    /// Remove every item that does not occur in `items`.
    pub fn retain_all<I>(&mut self, items: I) -> Result<usize, CollectionError>
    where
        I: IntoIterator<Item = T>,
    {
        let view = self.view;
        let mut shared = self.shared_mut();
        let w = shared.window(view)?;
        let mut bag = Multiset::from_items(items, shared.index.hasher().clone());
        let doomed: Vec<bool> = shared
            .store
            .iter_range(w.offset..w.end())
            .map(|s| !bag.take(&s.item))
            .collect();
        Ok(shared.compact(view, w, &doomed))
    }

    /// Remove everything in this window. Clearing the list itself disposes
    /// every view and shrinks the store back to its initial capacity.
    pub fn clear(&mut self) -> Result<(), CollectionError> {
        let view = self.view;
        let mut shared = self.shared_mut();
        match view {
            None => shared.clear_all(),
            Some(_) => {
                let w = shared.window(view)?;
                shared.remove_span(view, w.offset, w.size);
            }
        }
        Ok(())
    }

    /// Invalidate this view, or, on the list itself, dispose every view and
    /// clear the list.
    pub fn dispose(&mut self) {
        let mut shared = self.shared_mut();
        match self.view {
            None => shared.clear_all(),
            Some(key) => {
                if shared.views.dispose(key) {
                    tracing::trace!(views = shared.views.len(), "view disposed");
                }
            }
        }
    }

    // ---- views -------------------------------------------------------------

    /// A live view of `size` items starting at `offset` within this window.
    pub fn view(&self, offset: usize, size: usize) -> Result<Self, CollectionError> {
        let mut shared = self.shared_mut();
        let w = shared.window(self.view)?;
        if offset.checked_add(size).map_or(true, |end| end > w.size) {
            return Err(CollectionError::OutOfRange {
                offset: offset as isize,
                size,
                len: w.size,
            });
        }
        let key = shared.views.register(Window::new(w.offset + offset, size));
        tracing::trace!(offset = w.offset + offset, size, "view registered");
        drop(shared);
        Ok(self.alias(key))
    }

    /// A one-item view on `q`, if it is in this window.
    pub fn view_of<Q>(&self, q: &Q) -> Result<Option<Self>, CollectionError>
    where
        T: core::borrow::Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.index_of(q)? {
            Some(index) => self.view(index, 1).map(Some),
            None => Ok(None),
        }
    }

    /// A view from the start of this window to the end of `other`; `None` if
    /// `other` ends before this window starts.
    pub fn span(&self, other: &Self) -> Result<Option<Self>, CollectionError> {
        self.same_list(other)?;
        let mut shared = self.shared_mut();
        let start = shared.window(self.view)?.offset;
        let end = shared.window(other.view)?.end();
        if end < start {
            return Ok(None);
        }
        let key = shared.views.register(Window::new(start, end - start));
        drop(shared);
        Ok(Some(self.alias(key)))
    }

    /// Move this view by `delta` positions, keeping its size.
    pub fn slide(&mut self, delta: isize) -> Result<(), CollectionError> {
        let size = self.len()?;
        self.slide_resize(delta, size)
    }

    /// Move this view by `delta` positions and give it `size` items.
    pub fn slide_resize(&mut self, delta: isize, size: usize) -> Result<(), CollectionError> {
        if self.try_slide(delta, size)? {
            return Ok(());
        }
        let shared = self.shared();
        let w = shared.window(self.view)?;
        Err(CollectionError::OutOfRange {
            offset: w.offset as isize + delta,
            size,
            len: shared.len,
        })
    }

    /// Like [`slide_resize`](Self::slide_resize), but reports an out-of-range
    /// placement as `Ok(false)` and leaves the view unchanged.
    pub fn try_slide(&mut self, delta: isize, size: usize) -> Result<bool, CollectionError> {
        let key = self.view.ok_or(CollectionError::NotAView)?;
        let mut shared = self.shared_mut();
        let w = shared.views.window(key)?;
        let len = shared.len;
        let target = w
            .offset
            .checked_add_signed(delta)
            .filter(|&offset| offset.checked_add(size).is_some_and(|end| end <= len));
        let Some(offset) = target else {
            return Ok(false);
        };
        *shared.views.window_mut(key)? = Window::new(offset, size);
        Ok(true)
    }

    // ---- permutations ------------------------------------------------------

    pub fn reverse(&mut self) -> Result<(), CollectionError> {
        let view = self.view;
        let mut shared = self.shared_mut();
        let w = shared.window(view)?;
        shared.permute(view, w, Permutation::Reverse, |store, range| {
            store.reverse_range(range)
        });
        Ok(())
    }

    pub fn sort(&mut self) -> Result<(), CollectionError>
    where
        T: Ord,
    {
        self.sort_by(T::cmp)
    }

    /// Stable sort of this window.
    pub fn sort_by<F>(&mut self, mut compare: F) -> Result<(), CollectionError>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let view = self.view;
        let mut shared = self.shared_mut();
        let w = shared.window(view)?;
        shared.permute(view, w, Permutation::Arbitrary, |store, range| {
            store.sort_range_by(range, |a, b| compare(&a.item, &b.item))
        });
        Ok(())
    }

    /// Uniform Fisher–Yates shuffle of this window.
    pub fn shuffle<R>(&mut self, rng: &mut R) -> Result<(), CollectionError>
    where
        R: RngCore + ?Sized,
    {
        let view = self.view;
        let mut shared = self.shared_mut();
        let w = shared.window(view)?;
        shared.permute(view, w, Permutation::Arbitrary, |store, range| {
            for i in (1..range.len()).rev() {
                let j = (rng.next_u64() % (i as u64 + 1)) as usize;
                store.swap(range.start + i, range.start + j);
            }
        });
        Ok(())
    }

    // ---- traversal ---------------------------------------------------------

    /// Detached fail-fast traversal of this window; advance it with
    /// [`step`](Self::step).
    pub fn cursor(&self, direction: Direction) -> Result<Cursor, CollectionError> {
        let shared = self.shared();
        let w = shared.window(self.view)?;
        Ok(Cursor::new(
            shared.stamp.generation(),
            direction,
            w.offset,
            w.size,
        ))
    }

    /// Next item of `cursor`. Fails with `ConcurrentModification` once the
    /// list was mutated through any alias since the cursor was created, or
    /// when this handle's window no longer matches the one the cursor walks.
    pub fn step(&self, cursor: &mut Cursor) -> Result<Option<T>, CollectionError>
    where
        T: Clone,
    {
        let shared = self.shared();
        let w = shared.window(self.view)?;
        shared.stamp.check(cursor.generation())?;
        cursor.check_window(w.offset, w.size)?;
        Ok(cursor
            .advance()
            .map(|i| shared.store.occupied(w.offset + i).item.clone()))
    }

    /// Fail-fast iterator over clones of this window's items. It yields a
    /// single `Err` and then stops if the list is mutated underneath it.
    pub fn iter(&self) -> Iter<'_, T, S> {
        Iter {
            list: self,
            cursor: self.cursor(Direction::Forwards).map_err(Some),
        }
    }

    pub fn to_vec(&self) -> Result<Vec<T>, CollectionError>
    where
        T: Clone,
    {
        let shared = self.shared();
        let w = shared.window(self.view)?;
        Ok(shared
            .store
            .iter_range(w.offset..w.end())
            .map(|s| s.item.clone())
            .collect())
    }

    /// A new list of the items of this window matching `pred`, in order.
    pub fn find_all<F>(&self, mut pred: F) -> Result<HashIndexedList<T, S>, CollectionError>
    where
        T: Clone,
        F: FnMut(&T) -> bool,
    {
        let (items, hasher) = {
            let shared = self.shared();
            let w = shared.window(self.view)?;
            let items: Vec<T> = shared
                .store
                .iter_range(w.offset..w.end())
                .map(|s| &s.item)
                .filter(|item| pred(item))
                .cloned()
                .collect();
            (items, shared.index.hasher().clone())
        };
        let mut found = HashIndexedList::with_capacity_and_hasher(items.len(), hasher);
        found.add_all(items)?;
        Ok(found)
    }
}

impl<T, S> Drop for HashIndexedList<T, S> {
    fn drop(&mut self) {
        if let Some(key) = self.view {
            match self.shared.state.try_borrow_mut() {
                Ok(mut shared) => {
                    shared.views.dispose(key);
                }
                // disposed by the next mutable borrow
                Err(_) => self.shared.orphans.borrow_mut().push(key),
            }
        }
    }
}

impl<T, S> core::fmt::Debug for HashIndexedList<T, S>
where
    T: Eq + Hash + core::fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let shared = self.shared.state.borrow();
        match shared.window(self.view) {
            Ok(w) => f
                .debug_list()
                .entries(shared.store.iter_range(w.offset..w.end()).map(|s| &s.item))
                .finish(),
            Err(_) => f.write_str("<disposed view>"),
        }
    }
}

impl<T: Eq + Hash> FromIterator<T> for HashIndexedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = HashIndexedList::new();
        list.extend(iter);
        list
    }
}

impl<T, S> Extend<T> for HashIndexedList<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Clone,
{
    /// Appends the items not yet present.
    ///
    /// # Panics
    /// If this is a disposed view.
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.add_all(iter).expect("extend on a disposed view");
    }
}

/// Fail-fast iterator returned by [`HashIndexedList::iter`].
pub struct Iter<'a, T, S> {
    list: &'a HashIndexedList<T, S>,
    cursor: Result<Cursor, Option<CollectionError>>,
}

impl<'a, T, S> Iterator for Iter<'a, T, S>
where
    T: Eq + Hash + Clone,
    S: BuildHasher + Clone,
{
    type Item = Result<T, CollectionError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.cursor {
            Ok(cursor) => match self.list.step(cursor) {
                Ok(item) => item.map(Ok),
                Err(e) => {
                    self.cursor = Err(None);
                    Some(Err(e))
                }
            },
            Err(e) => e.take().map(Err),
        }
    }
}
