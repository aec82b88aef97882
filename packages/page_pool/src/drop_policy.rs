/// Determines how a pool treats outstanding allocations when it is dropped.
///
/// By default the pool reclaims all of its pages on drop, regardless of whether any slots are
/// still allocated.
///
/// # Examples
///
/// ```
/// use page_pool::{DropPolicy, PagePool};
///
/// // The drop policy is set at pool creation time.
/// let pool = PagePool::builder()
///     .layout_of::<u32>()
///     .drop_policy(DropPolicy::MustNotReclaimAllocations)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool reclaims its pages even if some slots are still allocated. This is the default.
    ///
    /// Any address the caller still holds becomes dangling; it is the caller's responsibility
    /// not to use it afterwards.
    #[default]
    MayReclaimAllocations,

    /// The pool panics if any allocation is still outstanding when it is dropped.
    ///
    /// This may be valuable when callers hold raw slot addresses whose lifetimes cannot be
    /// tracked by the compiler: a drop with live allocations is then always a bug worth
    /// surfacing immediately.
    MustNotReclaimAllocations,
}
