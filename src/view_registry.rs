//! ViewRegistry: live windows over one underlying list.
//!
//! A window is an `(offset, size)` pair in absolute store positions, held in
//! a generational arena. A view is valid exactly as long as its key is live,
//! so disposing a view is removing its key and a stale key can never alias a
//! window registered later.
//!
//! Every structural mutation of the underlying list is reported here with the
//! key of the view it was made through (`None` for the list itself). That
//! view's own window is adjusted by the caller; all other windows follow the
//! fix-up rules below.

use crate::error::CollectionError;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Generational key of a registered view.
    pub struct ViewKey;
}

/// Absolute placement of a view in its underlying list.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Window {
    pub offset: usize,
    pub size: usize,
}

impl Window {
    pub const fn new(offset: usize, size: usize) -> Self {
        Self { offset, size }
    }

    #[inline]
    pub const fn end(&self) -> usize {
        self.offset + self.size
    }

    #[inline]
    pub const fn contains(&self, pos: usize) -> bool {
        self.offset <= pos && pos < self.end()
    }

    /// Where `other` lies relative to `self`.
    pub fn relation(&self, other: &Window) -> Relation {
        let (end, other_end) = (self.end(), other.end());
        if other.offset >= end || other_end <= self.offset {
            Relation::Disjoint
        } else if self.size == 0 || (other.offset <= self.offset && end <= other_end) {
            Relation::Contains
        } else if other.size == 0 || (self.offset <= other.offset && other_end <= end) {
            Relation::ContainedIn
        } else {
            Relation::Overlapping
        }
    }
}

/// Position of another window relative to a mutated range.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Relation {
    Disjoint,
    /// The other window covers the whole range.
    Contains,
    /// The other window lies inside the range.
    ContainedIn,
    Overlapping,
}

/// What a permutation of a range does to the windows inside it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Permutation {
    /// Arbitrary reordering (sort, shuffle): contained windows are disposed.
    Arbitrary,
    /// Reversal: contained windows are mirrored.
    Reverse,
}

#[derive(Debug, Default)]
pub struct ViewRegistry {
    windows: SlotMap<ViewKey, Window>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self {
            windows: SlotMap::with_key(),
        }
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn register(&mut self, window: Window) -> ViewKey {
        self.windows.insert(window)
    }

    pub fn contains(&self, key: ViewKey) -> bool {
        self.windows.contains_key(key)
    }

    pub fn window(&self, key: ViewKey) -> Result<Window, CollectionError> {
        self.windows
            .get(key)
            .copied()
            .ok_or(CollectionError::ViewDisposed)
    }

    pub fn window_mut(&mut self, key: ViewKey) -> Result<&mut Window, CollectionError> {
        self.windows
            .get_mut(key)
            .ok_or(CollectionError::ViewDisposed)
    }

    /// Returns whether the view was still live.
    pub fn dispose(&mut self, key: ViewKey) -> bool {
        self.windows.remove(key).is_some()
    }

    /// Dispose every view; returns how many were live.
    pub fn dispose_all(&mut self) -> usize {
        let n = self.windows.len();
        self.windows.clear();
        n
    }

    pub fn iter(&self) -> impl Iterator<Item = (ViewKey, Window)> + '_ {
        self.windows.iter().map(|(k, w)| (k, *w))
    }

    fn others(&mut self, origin: Option<ViewKey>) -> impl Iterator<Item = &mut Window> + '_ {
        self.windows
            .iter_mut()
            .filter(move |(k, _)| Some(*k) != origin)
            .map(|(_, w)| w)
    }

    /// `added` items were inserted at absolute position `at`.
    ///
    /// A window strictly around `at` grows; a window starting after `at`, or
    /// starting at `at` and non-empty, moves right. A window ending at `at`
    /// is unaffected.
    pub fn fix_after_insert(&mut self, origin: Option<ViewKey>, at: usize, added: usize) {
        if added == 0 {
            return;
        }
        for w in self.others(origin) {
            if w.offset < at && w.end() > at {
                w.size += added;
            } else if w.offset > at || (w.offset == at && w.size > 0) {
                w.offset += added;
            }
        }
    }

    /// `count` items starting at absolute position `start` are about to be
    /// removed. Windows after the interval move left; windows overlapping it
    /// lose the overlapping part and are clipped to start no later than it.
    pub fn fix_before_remove(&mut self, origin: Option<ViewKey>, start: usize, count: usize) {
        if count == 0 {
            return;
        }
        let stop = start + count;
        for w in self.others(origin) {
            let end = w.end();
            if start < w.offset {
                if stop <= w.offset {
                    w.offset -= count;
                } else {
                    w.size = end.saturating_sub(stop);
                    w.offset = start;
                }
            } else if start < end {
                w.size -= stop.min(end) - start;
            }
        }
    }

    /// Apply [`fix_before_remove`](Self::fix_before_remove) for several
    /// disjoint runs given in ascending order, highest run first so that the
    /// coordinates of lower runs remain valid.
    pub fn fix_before_remove_runs(&mut self, origin: Option<ViewKey>, runs: &[(usize, usize)]) {
        for &(start, count) in runs.iter().rev() {
            self.fix_before_remove(origin, start, count);
        }
    }

    /// The items of `range` were permuted in place. Windows partially
    /// overlapping it are disposed; windows inside it are disposed or, for a
    /// reversal, mirrored. Returns the number of windows disposed.
    pub fn fix_after_permutation(
        &mut self,
        origin: Option<ViewKey>,
        range: Window,
        permutation: Permutation,
    ) -> usize {
        let mut doomed = Vec::new();
        for (key, w) in self.windows.iter_mut() {
            if Some(key) == origin {
                continue;
            }
            match range.relation(w) {
                Relation::Disjoint | Relation::Contains => {}
                Relation::ContainedIn if permutation == Permutation::Reverse => {
                    w.offset = 2 * range.offset + range.size - w.size - w.offset;
                }
                Relation::ContainedIn | Relation::Overlapping => doomed.push(key),
            }
        }
        for key in &doomed {
            self.windows.remove(*key);
        }
        if !doomed.is_empty() {
            tracing::debug!(
                disposed = doomed.len(),
                offset = range.offset,
                size = range.size,
                "disposed views invalidated by permutation"
            );
        }
        doomed.len()
    }
}
