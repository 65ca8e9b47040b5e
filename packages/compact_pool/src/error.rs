use thiserror::Error;

use crate::ElementId;

/// Errors that can occur when operating on a [`CompactPool`][crate::CompactPool].
///
/// A failed operation leaves the pool in the same state it was in before the call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An item could not be allocated because the pool already holds as many items as its
    /// configured maximum size allows.
    #[error("pool is full: it already holds the maximum of {max_size} items")]
    CapacityExceeded {
        /// The maximum number of items the pool was configured to hold.
        max_size: usize,
    },

    /// The item was released earlier or was never allocated by this pool.
    #[error("item {id} is not in the pool: it was already released or never allocated")]
    AccessViolation {
        /// The identifier that did not resolve to an item.
        id: ElementId,
    },

    /// Unused storage cannot be released while there are holes in the pool.
    /// Call [`CompactPool::defrag()`][crate::CompactPool::defrag] first.
    #[error("cannot release unused storage while {holes} holes remain; defragment the pool first")]
    HolesPresent {
        /// The number of free list entries that have not been processed by defragmentation.
        holes: usize,
    },

    /// An entry was requested from an empty free list. This indicates corrupted internal state.
    #[error("free list is empty; pool bookkeeping is corrupted")]
    EmptyFreeList,

    /// The item currently being visited by an iteration callback cannot be released from
    /// inside that same callback.
    #[error("item {id} cannot be released while it is being visited")]
    CurrentlyVisited {
        /// The identifier of the visited item.
        id: ElementId,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
