use std::any::type_name;
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;

use crate::ElementId;

/// A stable reference to an item in a [`CompactPool`][crate::CompactPool].
///
/// The pool moves items around when it closes holes, so a handle does not point at a fixed
/// position. Instead, it stores the [`ElementId`] of the item and is resolved through the pool
/// via [`CompactPool::get()`][1] and [`CompactPool::get_mut()`][2].
///
/// Each handle remembers where it last found its item, together with the defragmentation
/// generation of the pool at that time. As long as the pool has not been defragmented since,
/// resolving the handle skips the id lookup entirely.
///
/// Handles can be cloned freely. Once the item is released, resolving any of its handles
/// returns [`Error::AccessViolation`][3]. The same error is returned when a handle is used with
/// a pool other than the one that created it.
///
/// # Example
///
/// ```rust
/// use compact_pool::CompactPool;
///
/// let mut pool = CompactPool::<String>::new();
///
/// let first = pool.insert("first".to_string()).unwrap();
/// let second = pool.insert("second".to_string()).unwrap();
///
/// // Releasing the first item leaves a hole that defragmentation fills with the second item.
/// pool.release(&first).unwrap();
/// pool.defrag();
///
/// // The handle still resolves to the same item, even though the item has moved.
/// assert_eq!(pool.get(&second).unwrap(), "second");
/// assert!(pool.get(&first).is_err());
/// ```
///
/// [1]: crate::CompactPool::get
/// [2]: crate::CompactPool::get_mut
/// [3]: crate::Error::AccessViolation
pub struct Handle<T> {
    id: ElementId,

    /// Where the item was last seen. This is a cache, not the ground truth - the pool verifies
    /// it before trusting it and replaces it whenever it is found to be outdated.
    cached: Cell<Option<CachedPosition>>,

    _item: PhantomData<fn() -> T>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct CachedPosition {
    pub(crate) index: usize,
    pub(crate) generation: u64,
}

impl<T> Handle<T> {
    #[must_use]
    pub(crate) fn new(id: ElementId, index: usize, generation: u64) -> Self {
        Self {
            id,
            cached: Cell::new(Some(CachedPosition { index, generation })),
            _item: PhantomData,
        }
    }

    /// The identifier of the item this handle refers to.
    ///
    /// The identifier can be used with the id-based pool methods such as
    /// [`CompactPool::get_by_id()`][crate::CompactPool::get_by_id] and is what gets passed to
    /// iteration callbacks.
    #[must_use]
    pub fn id(&self) -> ElementId {
        self.id
    }

    #[must_use]
    pub(crate) fn cached(&self) -> Option<CachedPosition> {
        self.cached.get()
    }

    pub(crate) fn remember(&self, index: usize, generation: u64) {
        self.cached.set(Some(CachedPosition { index, generation }));
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            cached: self.cached.clone(),
            _item: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("id", &self.id)
            .field("cached", &self.cached.get())
            .finish()
    }
}

impl<T> From<&Handle<T>> for ElementId {
    fn from(handle: &Handle<T>) -> Self {
        handle.id
    }
}

impl<T> From<Handle<T>> for ElementId {
    fn from(handle: Handle<T>) -> Self {
        handle.id
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    // The resolution cache is a `Cell`, so a handle may move between threads but not be shared.
    assert_impl_all!(Handle<String>: Send, Clone, fmt::Debug);
    assert_not_impl_any!(Handle<String>: Sync, Copy);

    // No `Debug` requirement on the item type.
    struct NotDebug;
    assert_impl_all!(Handle<NotDebug>: fmt::Debug);

    #[test]
    fn new_handle_is_pre_cached() {
        let handle = Handle::<u32>::new(ElementId::new(1, 3), 7, 2);

        assert_eq!(handle.id(), ElementId::new(1, 3));
        assert_eq!(
            handle.cached(),
            Some(CachedPosition {
                index: 7,
                generation: 2
            })
        );
    }

    #[test]
    fn clone_copies_cache_independently() {
        let handle = Handle::<u32>::new(ElementId::new(1, 3), 7, 2);
        let clone = handle.clone();

        clone.remember(1, 5);

        assert_eq!(handle.cached().unwrap().index, 7);
        assert_eq!(clone.cached().unwrap().index, 1);
        assert_eq!(clone.cached().unwrap().generation, 5);
        assert_eq!(clone.id(), handle.id());
    }

    #[test]
    fn converts_into_element_id() {
        let handle = Handle::<u32>::new(ElementId::new(1, 11), 0, 0);

        assert_eq!(ElementId::from(&handle), ElementId::new(1, 11));
        assert_eq!(ElementId::from(handle), ElementId::new(1, 11));
    }
}
