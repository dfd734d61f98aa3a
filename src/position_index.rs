//! PositionIndex: element → position map for HashIndexedList.
//!
//! The table stores bare positions. Equality probes and rehashing go through
//! the backing store, where every slot caches the hash of its item, so user
//! `Hash` runs once per insertion and never during table growth.

use crate::backing_store::BackingStore;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::ops::Range;
use hashbrown::HashTable;

/// An item together with its cached hash.
#[derive(Debug, Clone)]
pub(crate) struct Slot<T> {
    pub(crate) item: T,
    pub(crate) hash: u64,
}

pub(crate) struct PositionIndex<S> {
    hasher: S,
    table: HashTable<usize>,
}

impl<S: BuildHasher> PositionIndex<S> {
    pub(crate) fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            table: HashTable::new(),
        }
    }

    pub(crate) fn hasher(&self) -> &S {
        &self.hasher
    }

    #[inline]
    pub(crate) fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    pub(crate) fn len(&self) -> usize {
        self.table.len()
    }

    /// Position of the item equal to `q`.
    pub(crate) fn find<T, Q>(
        &self,
        store: &BackingStore<Slot<T>>,
        hash: u64,
        q: &Q,
    ) -> Option<usize>
    where
        T: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.table
            .find(hash, |&p| {
                store
                    .get(p)
                    .map(|s| s.hash == hash && s.item.borrow() == q)
                    .unwrap_or(false)
            })
            .copied()
    }

    /// Index the item stored at `pos`. Every position already in the table
    /// must hold its indexed item.
    pub(crate) fn insert<T>(&mut self, store: &BackingStore<Slot<T>>, pos: usize) {
        let hash = store.occupied(pos).hash;
        self.table.insert_unique(hash, pos, |&p| store.occupied(p).hash);
    }

    /// Drop the entry for `pos`, whose item has hash `hash`.
    pub(crate) fn remove(&mut self, hash: u64, pos: usize) -> bool {
        match self.table.find_entry(hash, |&p| p == pos) {
            Ok(entry) => {
                entry.remove();
                true
            }
            Err(_) => false,
        }
    }

    pub(crate) fn unindex<T>(&mut self, store: &BackingStore<Slot<T>>, positions: Range<usize>) {
        for pos in positions {
            let hash = store.occupied(pos).hash;
            self.remove(hash, pos);
        }
    }

    pub(crate) fn reindex<T>(&mut self, store: &BackingStore<Slot<T>>, positions: Range<usize>) {
        for pos in positions {
            self.insert(store, pos);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.table.clear();
    }

    /// All indexed positions, in table order.
    pub(crate) fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.table.iter().copied()
    }
}
