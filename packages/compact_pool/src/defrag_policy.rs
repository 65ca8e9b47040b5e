/// Determines when the pool closes the holes left behind by released items.
///
/// A hole is a vacant slot below the last occupied slot. Holes make iteration skip over
/// vacant storage, so the pool moves trailing items into them to restore a contiguous layout.
/// The policy decides when that happens.
///
/// # Examples
///
/// ```
/// use compact_pool::{CompactPool, DefragPolicy};
///
/// let pool = CompactPool::<u32>::builder()
///     .defrag_policy(DefragPolicy::Immediate)
///     .build();
///
/// assert_eq!(pool.defrag_policy(), DefragPolicy::Immediate);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DefragPolicy {
    /// Holes are closed as soon as they are created, during the release that created them.
    ///
    /// Every release that leaves a hole pays for moving one item, so the cost is predictable
    /// and iteration never has to skip anything.
    Immediate,

    /// Holes are closed right before the pool is iterated. This is the default.
    ///
    /// A release followed by an allocation simply reuses the hole without moving anything, so
    /// this avoids pointless moves in churn-heavy workloads at the price of variable
    /// iteration latency.
    #[default]
    Deferred,

    /// Holes are only closed when you call [`CompactPool::defrag()`][1] yourself.
    ///
    /// Iteration skips over any holes that are still present.
    ///
    /// [1]: crate::CompactPool::defrag
    Manual,
}
