use crate::{CompactPool, ElementId, Error, Result};

/// Signals whether [`CompactPool::iterate_with_control()`][1] should continue with the next item.
///
/// [1]: crate::CompactPool::iterate_with_control
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum IterationControl {
    /// Continue with the next item.
    Continue,

    /// Stop iterating. No further items are visited.
    Break,
}

/// The item currently being visited by [`CompactPool::iterate_with_control()`][1].
///
/// Besides access to the item itself, a visit grants read access to the whole pool and allows
/// releasing other items while the iteration is in progress.
///
/// # Example
///
/// ```rust
/// use compact_pool::{CompactPool, IterationControl};
///
/// let mut pool = CompactPool::<u32>::new();
///
/// let ids: Vec<_> = (0..4).map(|n| pool.insert(n).unwrap().id()).collect();
///
/// // Each even item releases the item that follows it.
/// pool.iterate_with_control(|visit| {
///     if *visit.item() % 2 == 0 {
///         let next = ids[*visit.item() as usize + 1];
///         visit.release(next).unwrap();
///     }
///
///     IterationControl::Continue
/// });
///
/// assert_eq!(pool.len(), 2);
/// ```
///
/// [1]: crate::CompactPool::iterate_with_control
#[derive(Debug)]
pub struct Visit<'p, T> {
    pool: &'p mut CompactPool<T>,
    index: usize,
    id: ElementId,
}

impl<'p, T> Visit<'p, T> {
    #[must_use]
    pub(crate) fn new(pool: &'p mut CompactPool<T>, index: usize, id: ElementId) -> Self {
        Self { pool, index, id }
    }

    /// The identifier of the visited item.
    #[must_use]
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// A shared reference to the visited item.
    #[must_use]
    pub fn item(&self) -> &T {
        self.pool.value_at(self.index)
    }

    /// An exclusive reference to the visited item.
    #[must_use]
    pub fn item_mut(&mut self) -> &mut T {
        self.pool.value_at_mut(self.index)
    }

    /// Read access to the pool being iterated.
    #[must_use]
    pub fn pool(&self) -> &CompactPool<T> {
        self.pool
    }

    /// Releases another item of the pool.
    ///
    /// The released item is not visited later in this iteration. No items are moved until the
    /// iteration is over.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CurrentlyVisited`] if `item` is the visited item itself, or
    /// [`Error::AccessViolation`] if the item is not in the pool.
    pub fn release(&mut self, item: impl Into<ElementId>) -> Result<()> {
        let id = item.into();

        if id == self.id {
            return Err(Error::CurrentlyVisited { id });
        }

        self.pool.release_without_defrag(id)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(IterationControl: Copy, Send, Sync, Debug);

    #[test]
    fn visit_exposes_item_and_pool() {
        let mut pool = CompactPool::<u32>::new();
        let first = pool.insert(10).unwrap();
        let second = pool.insert(20).unwrap();

        pool.iterate_with_control(|visit| {
            *visit.item_mut() += 1;

            if visit.id() == first.id() {
                assert_eq!(visit.pool().len(), 2);
                IterationControl::Break
            } else {
                IterationControl::Continue
            }
        });

        assert_eq!(*pool.get(&first).unwrap(), 11);
        assert_eq!(*pool.get(&second).unwrap(), 20);
    }

    #[test]
    fn visit_cannot_release_foreign_item() {
        let mut other = CompactPool::<u32>::new();
        let foreign = other.insert(1).unwrap();

        let mut pool = CompactPool::<u32>::new();
        _ = pool.insert(1).unwrap();

        pool.iterate_with_control(|visit| {
            assert!(matches!(
                visit.release(&foreign),
                Err(Error::AccessViolation { .. })
            ));
            IterationControl::Continue
        });

        assert_eq!(pool.len(), 1);
        assert_eq!(other.len(), 1);
    }
}
