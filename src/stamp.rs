//! Modification stamps and detached, fail-fast cursors.
//!
//! Every container owns a [`ModificationStamp`] that is bumped on each
//! structural mutation. A [`Cursor`] records the [`Generation`] current when
//! it was created, together with the window it walks, and does not borrow the
//! container. The container compares both on every `step` call and refuses to
//! continue once either differs.

use crate::error::CollectionError;

/// Snapshot of a [`ModificationStamp`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Generation(u64);

/// Monotonic counter of structural mutations.
#[derive(Debug, Default, Clone)]
pub struct ModificationStamp {
    current: u64,
}

impl ModificationStamp {
    pub const fn new() -> Self {
        Self { current: 0 }
    }

    #[inline]
    pub fn generation(&self) -> Generation {
        Generation(self.current)
    }

    /// Record one structural mutation.
    #[inline]
    pub fn bump(&mut self) {
        self.current = self.current.wrapping_add(1);
    }

    /// Fails with `ConcurrentModification` unless `seen` is still current.
    #[inline]
    pub fn check(&self, seen: Generation) -> Result<(), CollectionError> {
        if self.current == seen.0 {
            Ok(())
        } else {
            Err(CollectionError::ConcurrentModification)
        }
    }
}

/// Traversal order of a [`Cursor`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Forwards,
    Backwards,
}

/// Detached traversal state over the `len` positions starting at `offset`.
///
/// A cursor is not restartable; ask the container for a fresh one instead.
#[derive(Clone, Debug)]
pub struct Cursor {
    generation: Generation,
    direction: Direction,
    offset: usize,
    len: usize,
    front: usize,
    back: usize,
}

impl Cursor {
    pub(crate) fn new(
        generation: Generation,
        direction: Direction,
        offset: usize,
        len: usize,
    ) -> Self {
        Self {
            generation,
            direction,
            offset,
            len,
            front: 0,
            back: len,
        }
    }

    /// Fails with `ConcurrentModification` unless the cursor was created over
    /// exactly this window. Positions handed out by [`advance`](Self::advance)
    /// are only valid inside it.
    #[inline]
    pub(crate) fn check_window(&self, offset: usize, len: usize) -> Result<(), CollectionError> {
        if self.offset == offset && self.len == len {
            Ok(())
        } else {
            Err(CollectionError::ConcurrentModification)
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Positions not yet yielded.
    pub fn remaining(&self) -> usize {
        self.back - self.front
    }

    /// Next logical position, or `None` when exhausted.
    pub(crate) fn advance(&mut self) -> Option<usize> {
        if self.front == self.back {
            return None;
        }
        match self.direction {
            Direction::Forwards => {
                self.front += 1;
                Some(self.front - 1)
            }
            Direction::Backwards => {
                self.back -= 1;
                Some(self.back)
            }
        }
    }
}
