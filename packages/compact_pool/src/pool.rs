use std::any::type_name;
use std::fmt;
use std::mem;
use std::num::NonZero;
use std::sync::atomic::{AtomicU64, Ordering};

use foldhash::{HashMap, HashMapExt};
use tracing::{debug, trace};

use crate::{
    CompactPoolBuilder, DefragPolicy, ElementId, Error, FreeList, Handle, IterationControl, Iter,
    IterMut, Result, Slot, Visit,
};

static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

fn generate_pool_id() -> u64 {
    POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// An object pool that keeps its items packed at the start of a single contiguous storage
/// region while handing out [handles][Handle] that stay valid when items move.
///
/// The pool is designed for update-loop workloads: many short-lived items that are all
/// processed every tick. Iterating over a densely packed `Vec` is cache-friendly, while
/// allocation and release are O(1) thanks to a free list of holes that is stored inside the
/// vacant slots themselves.
///
/// There are multiple ways to put items into the pool:
///
/// * [`alloc()`][1] - stores `T::default()` and returns a handle. Callers typically initialize
///   the item through the handle right away.
/// * [`insert()`][2] - stores the given value and returns a handle.
///
/// # Holes and defragmentation
///
/// Releasing an item from the middle of the storage leaves a hole. Holes are reused by the next
/// allocations and are closed by [`defrag()`][3], which moves items from the end of the storage
/// into them. Because items move, their position is not part of the contract - access goes
/// through [`Handle`] or [`ElementId`], which the pool resolves to the current position.
///
/// When defragmentation happens automatically is governed by the [`DefragPolicy`].
///
/// # Thread safety
///
/// The pool performs no synchronization. Wrap it in a `Mutex` or similar if you need to share it
/// between threads.
///
/// # Example
///
/// ```rust
/// use compact_pool::CompactPool;
///
/// #[derive(Default)]
/// struct Particle {
///     ttl: u32,
/// }
///
/// let mut pool = CompactPool::<Particle>::new();
///
/// let handle = pool.alloc().unwrap();
/// pool.get_mut(&handle).unwrap().ttl = 3;
///
/// let mut expired = Vec::new();
///
/// pool.iterate(|particle, id| {
///     particle.ttl -= 1;
///
///     if particle.ttl == 0 {
///         expired.push(id);
///     }
/// });
///
/// for id in expired {
///     pool.release(id).unwrap();
/// }
/// ```
///
/// [1]: Self::alloc
/// [2]: Self::insert
/// [3]: Self::defrag
pub struct CompactPool<T> {
    slots: Vec<Slot<T>>,

    /// One past the high-water mark. Slots at or above this index are vacant and excluded from
    /// iteration. Whenever this is non-zero, the slot right below it is occupied.
    occupied_end: usize,

    /// Vacant slots below `occupied_end`, plus stale entries that the high-water mark has
    /// since dropped below. Every vacant slot below `occupied_end` is in here.
    free_list: FreeList,

    /// Where each live item currently is. Contains exactly the ids of occupied slots.
    id_index: HashMap<ElementId, usize>,

    len: usize,

    /// Stamped into every id this pool issues, so ids from other pools never match.
    pool_id: u64,

    /// Never reset, not even by `clear()`, so ids are unique for the lifetime of the pool.
    next_id: u64,

    /// Incremented by every defragmentation pass that has holes to process. Handles use this
    /// to detect that their cached position may be outdated.
    defrag_generation: u64,

    max_size: Option<NonZero<usize>>,
    shrink_threshold: usize,
    defrag_policy: DefragPolicy,
}

impl<T> CompactPool<T> {
    #[must_use]
    pub(crate) fn new_inner(
        max_size: Option<NonZero<usize>>,
        reserve: usize,
        shrink_threshold: usize,
        defrag_policy: DefragPolicy,
    ) -> Self {
        Self {
            slots: Vec::with_capacity(reserve),
            occupied_end: 0,
            free_list: FreeList::default(),
            id_index: HashMap::with_capacity(reserve),
            len: 0,
            pool_id: generate_pool_id(),
            next_id: 0,
            defrag_generation: 0,
            max_size,
            shrink_threshold,
            defrag_policy,
        }
    }

    /// Creates a new [`CompactPool`] with the default configuration.
    ///
    /// The pool is unbounded, starts without any storage and defragments right before
    /// iteration ([`DefragPolicy::Deferred`]).
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_pool::CompactPool;
    ///
    /// let mut pool = CompactPool::<String>::new();
    ///
    /// assert_eq!(pool.len(), 0);
    /// assert!(pool.is_empty());
    ///
    /// let handle = pool.insert("Hello".to_string()).unwrap();
    /// assert_eq!(pool.len(), 1);
    /// assert_eq!(pool.get(&handle).unwrap(), "Hello");
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a new [`CompactPool`].
    ///
    /// Use this when you want to customize the pool configuration beyond the defaults.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_pool::{CompactPool, DefragPolicy};
    ///
    /// let pool = CompactPool::<u32>::builder()
    ///     .defrag_policy(DefragPolicy::Manual)
    ///     .build();
    ///
    /// assert!(pool.is_empty());
    /// ```
    pub fn builder() -> CompactPoolBuilder<T> {
        CompactPoolBuilder::new()
    }

    /// The number of items in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the pool is empty.
    ///
    /// An empty pool may still be holding storage.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of slots the pool can hold without reallocating its storage.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// The number of slots that have been initialized in storage, occupied or not.
    ///
    /// Slots at the end of the storage that are no longer occupied are kept around for reuse
    /// until [`clear_unused_memory()`][1] is called, either by you or automatically when
    /// defragmentation leaves more than the shrink threshold of them.
    ///
    /// [1]: Self::clear_unused_memory
    #[must_use]
    pub fn storage_len(&self) -> usize {
        self.slots.len()
    }

    /// The highest storage index that holds an item, or `None` if the pool is empty.
    ///
    /// Iteration covers the slots from index 0 up to and including this index.
    #[must_use]
    pub fn high_water(&self) -> Option<usize> {
        self.occupied_end.checked_sub(1)
    }

    /// The number of entries in the free list that the next defragmentation pass will process.
    ///
    /// This counts holes below the high-water mark, as well as earlier holes that the
    /// high-water mark has since dropped below and that are simply discarded when processed.
    #[must_use]
    pub fn holes(&self) -> usize {
        self.free_list.len()
    }

    /// How many defragmentation passes have moved or discarded holes in this pool.
    ///
    /// The value increases by one with every pass that finds holes to process.
    #[must_use]
    pub fn defrag_generation(&self) -> u64 {
        self.defrag_generation
    }

    /// The maximum number of items the pool may hold at once, if limited.
    #[must_use]
    pub fn max_size(&self) -> Option<NonZero<usize>> {
        self.max_size
    }

    /// How far the storage length may exceed the high-water mark after defragmentation before
    /// the pool releases the unused slots.
    #[must_use]
    pub fn shrink_threshold(&self) -> usize {
        self.shrink_threshold
    }

    /// The [`DefragPolicy`] the pool was built with.
    #[must_use]
    pub fn defrag_policy(&self) -> DefragPolicy {
        self.defrag_policy
    }

    /// Allocates a new item initialized to `T::default()` and returns a handle to it.
    ///
    /// The pool performs no initialization beyond default construction; callers typically
    /// initialize the item via the returned handle right away, which is cheap because the
    /// handle already knows where the item is.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_pool::CompactPool;
    ///
    /// let mut pool = CompactPool::<Vec<u8>>::new();
    ///
    /// let handle = pool.alloc().unwrap();
    /// pool.get_mut(&handle).unwrap().push(1);
    ///
    /// assert_eq!(pool.get(&handle).unwrap(), &[1]);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] if the pool already holds its maximum number of items.
    pub fn alloc(&mut self) -> Result<Handle<T>>
    where
        T: Default,
    {
        self.ensure_room_for_one()?;
        self.insert_unchecked(T::default())
    }

    /// Inserts an item into the pool and returns a handle to it.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_pool::CompactPool;
    ///
    /// let mut pool = CompactPool::<i32>::new();
    ///
    /// let handle = pool.insert(42).unwrap();
    /// assert_eq!(*pool.get(&handle).unwrap(), 42);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] if the pool already holds its maximum number of items.
    /// The value is dropped in that case.
    pub fn insert(&mut self, value: T) -> Result<Handle<T>> {
        self.ensure_room_for_one()?;
        self.insert_unchecked(value)
    }

    fn ensure_room_for_one(&self) -> Result<()> {
        match self.max_size {
            Some(max_size) if self.len >= max_size.get() => Err(Error::CapacityExceeded {
                max_size: max_size.get(),
            }),
            _ => Ok(()),
        }
    }

    fn insert_unchecked(&mut self, value: T) -> Result<Handle<T>> {
        let index = self.take_vacant_index()?;

        let id = ElementId::new(self.pool_id, self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .expect("a pool cannot perform more than u64::MAX allocations in any realistic lifetime");

        *self
            .slots
            .get_mut(index)
            .expect("vacant index always refers to an initialized slot") =
            Slot::Occupied { value, id };

        self.id_index.insert(id, index);

        let end = index
            .checked_add(1)
            .expect("an initialized slot index is always less than usize::MAX");
        self.occupied_end = self.occupied_end.max(end);

        self.len = self
            .len
            .checked_add(1)
            .expect("item count cannot exceed the number of slots in memory");

        Ok(Handle::new(id, index, self.defrag_generation))
    }

    /// Finds the slot for the next item: a hole if there is one, otherwise the first unused slot
    /// above the high-water mark, otherwise a newly initialized slot at the end of the storage.
    fn take_vacant_index(&mut self) -> Result<usize> {
        while !self.free_list.is_empty() {
            let index = self.free_list.pop(&self.slots)?;

            if index < self.occupied_end {
                return Ok(index);
            }

            trace!(index, "discarding free list entry above the high-water mark");
        }

        if self.occupied_end < self.slots.len() {
            return Ok(self.occupied_end);
        }

        let index = self.slots.len();
        self.slots.push(Slot::vacant());
        Ok(index)
    }

    /// Removes an item from the pool, dropping it.
    ///
    /// Accepts a [`Handle`] (by reference or by value) or an [`ElementId`]. Any other handles to
    /// the same item become invalid and resolving them returns [`Error::AccessViolation`].
    ///
    /// If the item was not the last one in storage, a hole is left behind. With
    /// [`DefragPolicy::Immediate`], the hole is closed before this method returns.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_pool::CompactPool;
    ///
    /// let mut pool = CompactPool::<String>::new();
    /// let handle = pool.insert("Hello".to_string()).unwrap();
    ///
    /// pool.release(&handle).unwrap();
    ///
    /// assert!(pool.is_empty());
    /// assert!(pool.release(&handle).is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessViolation`] if the item was already released or was never
    /// allocated by this pool.
    pub fn release(&mut self, item: impl Into<ElementId>) -> Result<()> {
        self.release_without_defrag(item.into())?;

        if self.defrag_policy == DefragPolicy::Immediate {
            self.defrag();
        }

        Ok(())
    }

    pub(crate) fn release_without_defrag(&mut self, id: ElementId) -> Result<()> {
        let index = self
            .id_index
            .remove(&id)
            .ok_or(Error::AccessViolation { id })?;

        debug_assert_eq!(
            self.slots.get(index).and_then(Slot::id),
            Some(id),
            "id index of pool of {} is out of sync with storage",
            type_name::<T>()
        );

        self.len = self
            .len
            .checked_sub(1)
            .expect("the id was in the index, so there was at least one item");

        let last = self
            .occupied_end
            .checked_sub(1)
            .expect("the id was in the index, so at least one slot is occupied");

        if index == last {
            // No hole - the storage just gets shorter. Any holes that end up above the new
            // high-water mark become stale free list entries that are skipped when popped.
            *self
                .slots
                .get_mut(index)
                .expect("index came from the id index, so it refers to an initialized slot") =
                Slot::vacant();

            self.occupied_end = index;
            self.retreat_occupied_end();
        } else {
            self.free_list.push(&mut self.slots, index);
        }

        Ok(())
    }

    /// Moves `occupied_end` down past any vacant slots so the slot below it is occupied again.
    fn retreat_occupied_end(&mut self) {
        while let Some(last) = self.occupied_end.checked_sub(1) {
            if self.slots.get(last).is_some_and(Slot::is_occupied) {
                break;
            }

            self.occupied_end = last;
        }
    }

    /// Closes all holes by moving items from the end of the storage into them.
    ///
    /// This is a no-op if there are no holes. Otherwise, it increments the
    /// [defragmentation generation][1] and takes time proportional to the number of holes,
    /// regardless of the size of the pool. Afterwards, all items are packed into the slots
    /// `0..len()`.
    ///
    /// If the storage length minus the high-water mark then exceeds
    /// [`shrink_threshold()`][2], the unused slots at the end of the storage are released as if
    /// by [`clear_unused_memory()`][3]. For an empty pool the whole storage length is compared.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_pool::{CompactPool, DefragPolicy};
    ///
    /// let mut pool = CompactPool::<u32>::builder()
    ///     .defrag_policy(DefragPolicy::Manual)
    ///     .build();
    ///
    /// let a = pool.insert(1).unwrap();
    /// let b = pool.insert(2).unwrap();
    /// let c = pool.insert(3).unwrap();
    ///
    /// pool.release(&a).unwrap();
    /// assert_eq!(pool.high_water(), Some(2));
    ///
    /// pool.defrag();
    /// assert_eq!(pool.high_water(), Some(1));
    /// assert_eq!(*pool.get(&c).unwrap(), 3);
    /// # _ = b;
    /// ```
    ///
    /// [1]: Self::defrag_generation
    /// [2]: Self::shrink_threshold
    /// [3]: Self::clear_unused_memory
    pub fn defrag(&mut self) {
        if self.free_list.is_empty() {
            return;
        }

        self.defrag_generation = self
            .defrag_generation
            .checked_add(1)
            .expect("a pool cannot be defragmented more than u64::MAX times in any realistic lifetime");

        let mut moved: usize = 0;
        let mut discarded: usize = 0;

        while !self.free_list.is_empty() {
            let hole = self
                .free_list
                .pop(&self.slots)
                .expect("loop condition guarantees a non-empty free list");

            if hole >= self.occupied_end {
                // The high-water mark already dropped below this hole, so there is nothing to fill.
                discarded = discarded.wrapping_add(1);
                continue;
            }

            let last = self
                .occupied_end
                .checked_sub(1)
                .expect("a hole below the high-water mark implies a non-empty storage region");

            let item = mem::replace(
                self.slots
                    .get_mut(last)
                    .expect("occupied end never exceeds the storage length"),
                Slot::vacant(),
            );

            let id = item
                .id()
                .expect("the slot right below the occupied end is always occupied");

            *self
                .slots
                .get_mut(hole)
                .expect("hole is below the occupied end, so it is an initialized slot") = item;

            self.id_index.insert(id, hole);

            trace!(%id, from = last, to = hole, "moved item into hole");
            moved = moved.wrapping_add(1);

            self.occupied_end = last;
            self.retreat_occupied_end();
        }

        debug!(
            generation = self.defrag_generation,
            moved,
            discarded,
            len = self.len,
            "defragmented pool of {}",
            type_name::<T>()
        );

        if self.storage_beyond_high_water() > self.shrink_threshold {
            self.clear_unused_memory()
                .expect("the free list was just drained, so there cannot be holes");
        }
    }

    /// The storage length minus the high-water mark. An empty pool has no high-water mark, so
    /// all of its storage counts.
    fn storage_beyond_high_water(&self) -> usize {
        match self.high_water() {
            Some(high_water) => self
                .slots
                .len()
                .checked_sub(high_water)
                .expect("the high-water mark is always an index into the storage"),
            None => self.slots.len(),
        }
    }

    fn defrag_before_iteration(&mut self) {
        if self.defrag_policy == DefragPolicy::Deferred {
            self.defrag();
        }
    }

    /// Ensures the storage can hold at least `capacity` slots without reallocating.
    ///
    /// This is purely a capacity hint and does not affect behavior.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_pool::CompactPool;
    ///
    /// let mut pool = CompactPool::<u32>::new();
    ///
    /// pool.reserve(100);
    /// assert!(pool.capacity() >= 100);
    /// ```
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use.
    pub fn reserve(&mut self, capacity: usize) {
        let additional = capacity.saturating_sub(self.slots.len());
        self.slots.reserve(additional);
    }

    /// Releases the storage of all slots above the high-water mark.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_pool::{CompactPool, DefragPolicy};
    ///
    /// let mut pool = CompactPool::<u32>::builder()
    ///     .defrag_policy(DefragPolicy::Manual)
    ///     .build();
    ///
    /// let a = pool.insert(1).unwrap();
    /// let b = pool.insert(2).unwrap();
    ///
    /// // Releasing the first item leaves a hole that must be closed first.
    /// pool.release(&a).unwrap();
    /// assert!(pool.clear_unused_memory().is_err());
    ///
    /// pool.defrag();
    /// pool.clear_unused_memory().unwrap();
    /// assert_eq!(pool.storage_len(), 1);
    /// # _ = b;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::HolesPresent`] if the free list is not empty. Call [`defrag()`][1] first.
    ///
    /// [1]: Self::defrag
    pub fn clear_unused_memory(&mut self) -> Result<()> {
        if !self.free_list.is_empty() {
            return Err(Error::HolesPresent {
                holes: self.free_list.len(),
            });
        }

        let before = self.slots.len();

        self.slots.truncate(self.occupied_end);
        self.slots.shrink_to_fit();

        debug!(
            before,
            after = self.slots.len(),
            "released unused storage of pool of {}",
            type_name::<T>()
        );

        Ok(())
    }

    /// Removes and drops all items.
    ///
    /// Identifiers are not reused after clearing: items allocated afterwards continue the
    /// sequence, so handles from before the clear never resolve to new items.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_pool::CompactPool;
    ///
    /// let mut pool = CompactPool::<u32>::new();
    /// let before = pool.insert(1).unwrap();
    ///
    /// pool.clear();
    /// assert!(pool.is_empty());
    /// assert!(pool.get(&before).is_err());
    ///
    /// let after = pool.insert(2).unwrap();
    /// assert_ne!(before.id(), after.id());
    /// ```
    pub fn clear(&mut self) {
        self.slots.clear();
        self.id_index.clear();
        self.free_list.clear();
        self.len = 0;
        self.occupied_end = 0;
    }

    /// Whether the item with the given identifier is in the pool.
    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.id_index.contains_key(&id)
    }

    /// Gets a shared reference to the item the handle refers to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessViolation`] if the item has been released.
    pub fn get(&self, handle: &Handle<T>) -> Result<&T> {
        let index = self.resolve(handle)?;
        Ok(self.value_at(index))
    }

    /// Gets an exclusive reference to the item the handle refers to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessViolation`] if the item has been released.
    pub fn get_mut(&mut self, handle: &Handle<T>) -> Result<&mut T> {
        let index = self.resolve(handle)?;
        Ok(self.value_at_mut(index))
    }

    /// Gets a shared reference to the item with the given identifier.
    ///
    /// Unlike [`get()`][1], this always consults the id index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessViolation`] if there is no such item in the pool.
    ///
    /// [1]: Self::get
    pub fn get_by_id(&self, id: ElementId) -> Result<&T> {
        let index = self.index_of(id)?;
        Ok(self.value_at(index))
    }

    /// Gets an exclusive reference to the item with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessViolation`] if there is no such item in the pool.
    pub fn get_mut_by_id(&mut self, id: ElementId) -> Result<&mut T> {
        let index = self.index_of(id)?;
        Ok(self.value_at_mut(index))
    }

    /// Finds the current storage index of the handle's item, trusting the position cached in the
    /// handle if the pool has not been defragmented since and the slot still holds the item.
    pub(crate) fn resolve(&self, handle: &Handle<T>) -> Result<usize> {
        if let Some(cached) = handle.cached().filter(|cached| {
            cached.generation == self.defrag_generation
                && self.slots.get(cached.index).and_then(Slot::id) == Some(handle.id())
        }) {
            return Ok(cached.index);
        }

        let index = self.index_of(handle.id())?;
        handle.remember(index, self.defrag_generation);

        Ok(index)
    }

    fn index_of(&self, id: ElementId) -> Result<usize> {
        self.id_index
            .get(&id)
            .copied()
            .ok_or(Error::AccessViolation { id })
    }

    pub(crate) fn value_at(&self, index: usize) -> &T {
        self.slots
            .get(index)
            .and_then(Slot::value)
            .expect("only indexes of occupied slots are resolved")
    }

    pub(crate) fn value_at_mut(&mut self, index: usize) -> &mut T {
        self.slots
            .get_mut(index)
            .and_then(Slot::value_mut)
            .expect("only indexes of occupied slots are resolved")
    }

    /// Calls `visitor` for every item in the pool, together with the item's identifier.
    ///
    /// With [`DefragPolicy::Deferred`], the pool is defragmented first. With
    /// [`DefragPolicy::Manual`], any holes are simply skipped.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_pool::CompactPool;
    ///
    /// let mut pool = CompactPool::<u32>::new();
    ///
    /// for value in 1..=3 {
    ///     pool.insert(value).unwrap();
    /// }
    ///
    /// let mut sum = 0;
    /// pool.iterate(|value, _id| sum += *value);
    ///
    /// assert_eq!(sum, 6);
    /// ```
    pub fn iterate<F>(&mut self, mut visitor: F)
    where
        F: FnMut(&mut T, ElementId),
    {
        self.defrag_before_iteration();

        let end = self.occupied_end;

        for slot in self.slots.iter_mut().take(end) {
            if let Slot::Occupied { value, id } = slot {
                visitor(value, *id);
            }
        }
    }

    /// Calls `visitor` for every item in the pool until it returns [`IterationControl::Break`].
    ///
    /// The visitor receives a [`Visit`] that gives access to the current item and its
    /// identifier, read access to the pool and the ability to release other items. Items
    /// released during the iteration are not visited afterwards. Releases never move items
    /// mid-iteration; with [`DefragPolicy::Immediate`], holes are closed once the iteration ends.
    ///
    /// With [`DefragPolicy::Deferred`], the pool is defragmented before the iteration starts.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_pool::{CompactPool, IterationControl};
    ///
    /// let mut pool = CompactPool::<u32>::new();
    ///
    /// for value in 0..10 {
    ///     pool.insert(value).unwrap();
    /// }
    ///
    /// let mut seen = 0;
    ///
    /// pool.iterate_with_control(|visit| {
    ///     seen += 1;
    ///
    ///     if *visit.item() == 4 {
    ///         IterationControl::Break
    ///     } else {
    ///         IterationControl::Continue
    ///     }
    /// });
    ///
    /// assert_eq!(seen, 5);
    /// ```
    pub fn iterate_with_control<F>(&mut self, mut visitor: F)
    where
        F: FnMut(&mut Visit<'_, T>) -> IterationControl,
    {
        self.defrag_before_iteration();

        let mut index: usize = 0;

        // Visits may release items, which can lower the occupied end, so we re-read it every time.
        while index < self.occupied_end {
            if let Some(id) = self.slots.get(index).and_then(Slot::id) {
                let mut visit = Visit::new(self, index, id);

                if visitor(&mut visit) == IterationControl::Break {
                    break;
                }
            }

            index = index
                .checked_add(1)
                .expect("guarded by loop condition, so cannot reach usize::MAX");
        }

        if self.defrag_policy == DefragPolicy::Immediate {
            self.defrag();
        }
    }

    /// Iterates over the identifiers and shared references of all items in the pool.
    ///
    /// This never defragments the pool, regardless of the policy, so holes are skipped.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_pool::CompactPool;
    ///
    /// let mut pool = CompactPool::<u32>::new();
    /// let handle = pool.insert(7).unwrap();
    ///
    /// let items: Vec<_> = pool.iter().collect();
    /// assert_eq!(items, vec![(handle.id(), &7)]);
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(
            self.slots
                .get(..self.occupied_end)
                .expect("occupied end never exceeds the storage length"),
        )
    }

    /// Iterates over the identifiers and exclusive references of all items in the pool.
    ///
    /// With [`DefragPolicy::Deferred`], the pool is defragmented first.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        self.defrag_before_iteration();

        let end = self.occupied_end;

        IterMut::new(
            self.slots
                .get_mut(..end)
                .expect("occupied end never exceeds the storage length"),
        )
    }

    #[cfg(test)]
    pub(crate) fn integrity_check(&self) {
        let mut occupied: usize = 0;

        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(id) = slot.id() {
                occupied = occupied.checked_add(1).unwrap();

                assert!(
                    index < self.occupied_end,
                    "occupied slot {index} is above the occupied end {}",
                    self.occupied_end
                );
                assert_eq!(
                    self.id_index.get(&id),
                    Some(&index),
                    "id index entry of {id} does not point at slot {index}"
                );
            }
        }

        assert_eq!(occupied, self.len);
        assert_eq!(self.id_index.len(), self.len);

        if let Some(last) = self.occupied_end.checked_sub(1) {
            assert!(
                self.slots.get(last).is_some_and(Slot::is_occupied),
                "slot below the occupied end is vacant"
            );
        }

        let free_entries = self.free_list.entries(&self.slots);
        assert_eq!(free_entries.len(), self.free_list.len());

        for index in 0..self.occupied_end {
            let is_vacant = !self.slots.get(index).unwrap().is_occupied();
            assert_eq!(
                is_vacant,
                free_entries.contains(&index),
                "slot {index} below the occupied end is vacant but not in the free list (or vice versa)"
            );
        }
    }
}

impl<T> Default for CompactPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CompactPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("len", &self.len)
            .field("storage_len", &self.slots.len())
            .field("high_water", &self.high_water())
            .field("holes", &self.free_list.len())
            .field("pool_id", &self.pool_id)
            .field("next_id", &self.next_id)
            .field("defrag_generation", &self.defrag_generation)
            .field("max_size", &self.max_size)
            .field("shrink_threshold", &self.shrink_threshold)
            .field("defrag_policy", &self.defrag_policy)
            .finish_non_exhaustive()
    }
}

impl<'a, T> IntoIterator for &'a CompactPool<T> {
    type Item = (ElementId, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut CompactPool<T> {
    type Item = (ElementId, &'a mut T);
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
