//! array-collections: array-backed containers sharing one growable store,
//! with fail-fast traversal and live sub-range views.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: three containers over one power-of-two slot array, each built
//!   from small layers whose invariants can be checked in isolation.
//! - Layers:
//!   - BackingStore<T>: `Option<T>` slots with power-of-two capacity;
//!     doubles on overflow, shrinks only on clear, and vacates every slot
//!     it gives up.
//!   - ModificationStamp + Cursor: a per-structure generation counter and a
//!     detached traversal state that the container re-checks on each step.
//!   - RingBuffer<T>: circular deque over the store (queue and stack).
//!   - SortedSequence<T, C>: strictly ascending prefix of the store under a
//!     `Comparator`; every query is a binary search.
//!   - ViewRegistry: generational arena of `(offset, size)` windows and the
//!     rules that move them when the underlying list changes.
//!   - PositionIndex<S>: hash table of store positions with hashes cached
//!     in the slots.
//!   - HashIndexedList<T, S>: ordered set-semantics list combining the
//!     store, the index and the registry behind `Rc<RefCell<_>>`, so the
//!     list and all its views alias one state.
//!
//! Constraints
//! - Single-threaded: HashIndexedList handles are `!Send`/`!Sync`.
//! - Concurrent modification is detected, never prevented: every
//!   structural mutation bumps the stamp, and a stale cursor fails with
//!   `ConcurrentModification` on its next step.
//! - No stale ownership: vacated slots are always `None`.
//! - Set semantics: RingBuffer allows duplicates; SortedSequence and
//!   HashIndexedList never hold two equal items.
//!
//! Views
//! - A view is a registered window plus a clone of the list's `Rc`. It is
//!   valid exactly while its registry key is live. Disposal, dropping the
//!   handle, clearing the list, or a permutation that scrambles its items
//!   removes the key.
//! - Each mutation reports the absolute position and count it touched,
//!   and the view it went through. That view is resized directly and all
//!   others follow the registry's fix-up rules. Bulk removals apply the
//!   interval rule once per removed run, highest run first.
//!
//! Hasher and rehashing invariants
//! - Each slot stores the `u64` hash of its item; the index never calls
//!   `T: Hash` after insertion, including while the table grows.
//! - Index maintenance is range based: unindex the affected positions,
//!   mutate the store, reindex the same positions.
//!
//! Reentrancy
//! - HashIndexedList calls user code (`Hash`, `Eq`, predicates,
//!   comparators, `Drop` of removed items) while its shared state is
//!   mutably borrowed. Re-entering the same list from there panics through
//!   the `RefCell` borrow check instead of observing a half-updated state.
//!
//! Logging
//! - `tracing` events only, no subscriber: store growth and reset at
//!   `trace`, views disposed by permutations or clearing at `debug`, and
//!   every invariant violation found by `HashIndexedList::is_consistent` at
//!   `warn`.

pub mod backing_store;
mod error;
pub mod hash_indexed_list;
mod hash_indexed_list_proptest;
mod position_index;
pub mod ring_buffer;
pub mod sorted_sequence;
pub mod stamp;
mod view_registry;

// Public surface
pub use error::CollectionError;
pub use hash_indexed_list::HashIndexedList;
pub use ring_buffer::RingBuffer;
pub use sorted_sequence::{Comparator, Cut, NaturalOrder, SortedSequence};
pub use stamp::{Cursor, Direction, Generation};
