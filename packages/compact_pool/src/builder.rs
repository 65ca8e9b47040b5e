use std::marker::PhantomData;
use std::num::NonZero;

use crate::{CompactPool, DefragPolicy};

/// Storage trimming happens after defragmentation once more than this many slots are unused.
pub(crate) const DEFAULT_SHRINK_THRESHOLD: usize = 1024;

/// Builder for creating an instance of [`CompactPool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// The default configuration used by [`CompactPool::new()`][1] is an unbounded pool that
/// defragments right before iteration.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use compact_pool::{CompactPool, DefragPolicy};
///
/// let pool = CompactPool::<u32>::builder()
///     .max_size(NonZero::new(1000).unwrap())
///     .reserve(100)
///     .shrink_threshold(256)
///     .defrag_policy(DefragPolicy::Manual)
///     .build();
///
/// assert!(pool.capacity() >= 100);
/// ```
///
/// [1]: CompactPool::new
#[must_use]
pub struct CompactPoolBuilder<T> {
    max_size: Option<NonZero<usize>>,
    reserve: usize,
    shrink_threshold: usize,
    defrag_policy: DefragPolicy,

    _item: PhantomData<T>,
}

impl<T> std::fmt::Debug for CompactPoolBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompactPoolBuilder")
            .field(
                "item_type",
                &std::format_args!("{}", std::any::type_name::<T>()),
            )
            .field("max_size", &self.max_size)
            .field("reserve", &self.reserve)
            .field("shrink_threshold", &self.shrink_threshold)
            .field("defrag_policy", &self.defrag_policy)
            .finish()
    }
}

impl<T> CompactPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            max_size: None,
            reserve: 0,
            shrink_threshold: DEFAULT_SHRINK_THRESHOLD,
            defrag_policy: DefragPolicy::default(),
            _item: PhantomData,
        }
    }

    /// Limits the number of items the pool may hold at the same time.
    ///
    /// Allocating beyond the limit fails with [`Error::CapacityExceeded`][1]. By default,
    /// the pool is unbounded.
    ///
    /// [1]: crate::Error::CapacityExceeded
    pub fn max_size(mut self, max_size: NonZero<usize>) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Reserves storage for at least this many items when the pool is created.
    ///
    /// This is purely a capacity hint and does not affect behavior.
    pub fn reserve(mut self, reserve: usize) -> Self {
        self.reserve = reserve;
        self
    }

    /// Sets how far the storage length may exceed the high-water mark after defragmentation
    /// before the pool releases the unused slots back to the allocator.
    ///
    /// The default is 1024.
    pub fn shrink_threshold(mut self, shrink_threshold: usize) -> Self {
        self.shrink_threshold = shrink_threshold;
        self
    }

    /// Sets the [defragmentation policy][DefragPolicy] of the pool, which governs when
    /// holes left by released items are closed.
    ///
    /// # Examples
    ///
    /// ```
    /// use compact_pool::{CompactPool, DefragPolicy};
    ///
    /// let pool = CompactPool::<u32>::builder()
    ///     .defrag_policy(DefragPolicy::Immediate)
    ///     .build();
    /// ```
    pub fn defrag_policy(mut self, policy: DefragPolicy) -> Self {
        self.defrag_policy = policy;
        self
    }

    /// Builds the pool with the specified configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use compact_pool::CompactPool;
    ///
    /// let pool = CompactPool::<u32>::builder().build();
    /// assert!(pool.is_empty());
    /// ```
    #[must_use]
    pub fn build(self) -> CompactPool<T> {
        CompactPool::new_inner(
            self.max_size,
            self.reserve,
            self.shrink_threshold,
            self.defrag_policy,
        )
    }
}
