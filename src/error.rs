//! Error kinds shared by every container in the crate.

use thiserror::Error;

/// Failure returned by a container operation.
///
/// All kinds are local and recoverable by the caller. Membership outcomes
/// (an item already present, an item not found) are not errors; they are
/// reported through `bool`/`Option` return values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// Pop, dequeue, min or max on an empty container.
    #[error("collection is empty")]
    EmptyCollection,

    /// Index outside `[0, len)` (or `[0, len]` for insertion points).
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Insert or indexed write of an item that is already present.
    #[error("item already present in collection")]
    DuplicateNotAllowed,

    /// Bulk merge input is not in ascending order.
    #[error("input sequence is not sorted")]
    UnsortedInput,

    /// The container was structurally modified after the traversal started.
    #[error("collection was modified during traversal")]
    ConcurrentModification,

    /// Operation on a view that has been disposed or invalidated.
    #[error("view has been disposed")]
    ViewDisposed,

    /// View-only operation on a top-level list.
    #[error("operation requires a view")]
    NotAView,

    /// The other view does not alias the same underlying list.
    #[error("view belongs to a different underlying list")]
    IncompatibleView,

    /// No element satisfies a predecessor/successor query.
    #[error("no such item")]
    NoSuchItem,

    /// Window placement would leave the bounds of the underlying list.
    #[error("window at offset {offset} with size {size} exceeds length {len}")]
    OutOfRange {
        offset: isize,
        size: usize,
        len: usize,
    },
}

impl CollectionError {
    pub(crate) fn index(index: usize, len: usize) -> Self {
        CollectionError::IndexOutOfRange { index, len }
    }
}
