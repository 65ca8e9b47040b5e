use std::fmt;

/// Identifies an item in a [`CompactPool`][crate::CompactPool] for the whole lifetime of the pool.
///
/// Identifiers are assigned from a counter owned by the pool and are never handed out twice by
/// the same pool, not even after [`clear()`][crate::CompactPool::clear]. Unlike the position of
/// an item in the pool storage, the identifier does not change when the pool is defragmented.
///
/// An identifier also records which pool issued it. Any other pool treats it as unknown.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ElementId {
    pool_id: u64,
    serial: u64,
}

impl ElementId {
    #[must_use]
    pub(crate) const fn new(pool_id: u64, serial: u64) -> Self {
        Self { pool_id, serial }
    }

    /// The numeric value of the identifier within the pool that issued it.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_pool::CompactPool;
    ///
    /// let mut pool = CompactPool::<u32>::new();
    ///
    /// let first = pool.insert(1).unwrap();
    /// let second = pool.insert(2).unwrap();
    ///
    /// assert_eq!(first.id().as_u64(), 0);
    /// assert_eq!(second.id().as_u64(), 1);
    /// ```
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.serial
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.serial)
    }
}

/// One storage cell of the pool.
///
/// A vacant slot doubles as a free list node: `next_free_index` links to the slot that was
/// freed before it, or is `None` if there is no such slot (or the slot is not in the free list
/// at all, which is the case for vacant slots above the high-water mark).
#[derive(Debug)]
pub(crate) enum Slot<T> {
    Occupied { value: T, id: ElementId },

    Vacant { next_free_index: Option<usize> },
}

impl<T> Slot<T> {
    #[must_use]
    pub(crate) const fn vacant() -> Self {
        Self::Vacant {
            next_free_index: None,
        }
    }

    #[must_use]
    pub(crate) const fn is_occupied(&self) -> bool {
        matches!(self, Self::Occupied { .. })
    }

    #[must_use]
    pub(crate) const fn id(&self) -> Option<ElementId> {
        match self {
            Self::Occupied { id, .. } => Some(*id),
            Self::Vacant { .. } => None,
        }
    }

    #[must_use]
    pub(crate) const fn value(&self) -> Option<&T> {
        match self {
            Self::Occupied { value, .. } => Some(value),
            Self::Vacant { .. } => None,
        }
    }

    #[must_use]
    pub(crate) fn value_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Occupied { value, .. } => Some(value),
            Self::Vacant { .. } => None,
        }
    }
}
