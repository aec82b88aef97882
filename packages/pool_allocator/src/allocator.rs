use std::marker::PhantomData;
use std::num::NonZero;
use std::ptr::NonNull;

use page_pool::{Error, PAGE_SIZE, PagePool};

/// A typed allocator of single objects, backed by one embedded [`PagePool`] sized for `T`.
///
/// `MAX_PAGES` is the page budget of the embedded pool: `0` (the default) means unlimited lazy
/// growth, any other value is acquired eagerly at construction and fixes the allocator's
/// capacity for its lifetime.
///
/// The allocator hands out uninitialized memory for exactly one `T` per request. It never
/// constructs or drops `T` values itself; object lifecycle is entirely the caller's business,
/// which is what lets the allocator back containers that construct objects in place.
///
/// # Element size limit
///
/// A pool slot is carved from a single page, so `size_of::<T>()` must not exceed
/// [`PAGE_SIZE`]. This is a hard limitation of the design, checked when the allocator type is
/// instantiated (at monomorphization time), not a configurable policy.
///
/// # Example
///
/// ```rust
/// use pool_allocator::PoolAllocator;
///
/// // A bounded allocator: one page, acquired up front.
/// let mut allocator = PoolAllocator::<u64, 1>::new().unwrap();
///
/// assert_eq!(allocator.capacity(), 512);
///
/// let slot = allocator.allocate(1).unwrap();
///
/// // SAFETY: The slot is valid for u64 writes and exclusively ours.
/// unsafe { slot.write(7) };
///
/// // SAFETY: The pointer was obtained from this allocator and not yet returned.
/// unsafe { allocator.deallocate(slot, 1) }.unwrap();
/// ```
#[derive(Debug)]
pub struct PoolAllocator<T, const MAX_PAGES: usize = 0> {
    /// The embedded pool that does all the real work, sized for `T` at construction.
    pool: PagePool,

    /// The allocator hands out memory for `T` but never owns `T` values, so the marker must
    /// not affect auto traits or drop checking.
    _element: PhantomData<fn() -> T>,
}

impl<T, const MAX_PAGES: usize> PoolAllocator<T, MAX_PAGES> {
    /// Creates a new allocator with an empty pool (unbounded mode) or a fully pre-allocated
    /// pool (bounded mode).
    ///
    /// # Errors
    ///
    /// Returns an error if `MAX_PAGES` is non-zero and the page source cannot supply the
    /// budget.
    ///
    /// # Panics
    ///
    /// Fails at compile (monomorphization) time if `T` is zero-sized or larger than one page.
    pub fn new() -> std::result::Result<Self, Error> {
        const {
            assert!(
                size_of::<T>() > 0,
                "PoolAllocator elements must not be zero-sized"
            );
            assert!(
                size_of::<T>() <= PAGE_SIZE,
                "PoolAllocator elements must fit within a single page"
            );
        }

        let mut builder = PagePool::builder().layout_of::<T>();

        if let Some(budget) = NonZero::new(MAX_PAGES) {
            builder = builder.max_pages(budget);
        }

        Ok(Self {
            pool: builder.build()?,
            _element: PhantomData,
        })
    }

    /// Allocates memory for `count` objects of type `T` and returns the address.
    ///
    /// This is not a bulk allocator: `count` must be exactly 1. The parameter exists so the
    /// signature matches what allocator-aware containers expect to call.
    ///
    /// The returned memory is uninitialized; constructing a `T` in it is up to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BudgetExhausted`] when a bounded allocator's capacity is fully
    /// allocated, or [`Error::PagesExhausted`] when the page source fails.
    ///
    /// # Panics
    ///
    /// Panics if `count` is not 1.
    pub fn allocate(&mut self, count: usize) -> std::result::Result<NonNull<T>, Error> {
        assert!(
            count == 1,
            "PoolAllocator services exactly one object per request"
        );

        Ok(self.pool.allocate()?.cast::<T>())
    }

    /// Returns memory for `count` objects of type `T` to the pool.
    ///
    /// As with [`allocate()`](Self::allocate), `count` must be exactly 1.
    ///
    /// Any `T` residing in the memory is *not* dropped; run its destructor first if it has
    /// one. The pool performs no validation that `ptr` came from this allocator - see the
    /// safety contract.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NothingToDeallocate`] if no allocations are outstanding.
    ///
    /// # Panics
    ///
    /// Panics if `count` is not 1.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `ptr` was obtained from [`allocate()`](Self::allocate) on
    /// this same allocator and has not been returned since.
    pub unsafe fn deallocate(
        &mut self,
        ptr: NonNull<T>,
        count: usize,
    ) -> std::result::Result<(), Error> {
        assert!(
            count == 1,
            "PoolAllocator services exactly one object per request"
        );

        // SAFETY: Forwarding the caller's guarantee that the address came from this
        // allocator's pool and is not currently free.
        unsafe { self.pool.deallocate(ptr.cast::<u8>()) }
    }

    /// Creates an independent allocator for a sibling element type `U` under the same page
    /// budget.
    ///
    /// This is how a container allocates its internal node type (which embeds `T` plus
    /// overhead) rather than `T` itself. The rebound allocator is freshly constructed and
    /// empty; it shares no state with this one.
    ///
    /// # Errors
    ///
    /// Returns an error if `MAX_PAGES` is non-zero and the page source cannot supply the
    /// budget for the new allocator.
    #[expect(
        clippy::unused_self,
        reason = "rebinding derives a sibling allocator from an existing one; the receiver supplies the configuration, not state"
    )]
    pub fn rebind<U>(&self) -> std::result::Result<PoolAllocator<U, MAX_PAGES>, Error> {
        PoolAllocator::new()
    }

    /// Creates an independent, empty allocator with the same configuration as this one.
    ///
    /// This is the explicit replacement for a state-sharing copy, which deliberately does not
    /// exist: two allocators never refer to the same memory. Contrast with a Rust move, which
    /// transfers the embedded pool and all of its pages to the destination.
    ///
    /// # Errors
    ///
    /// Returns an error if `MAX_PAGES` is non-zero and the page source cannot supply the
    /// budget for the new allocator.
    #[expect(
        clippy::unused_self,
        reason = "the receiver supplies the configuration to reproduce, not state"
    )]
    pub fn fresh(&self) -> std::result::Result<Self, Error> {
        Self::new()
    }

    /// The page budget the allocator was instantiated with; `0` means unlimited.
    #[must_use]
    #[inline]
    pub const fn max_pages(&self) -> usize {
        MAX_PAGES
    }

    /// The number of pages the embedded pool has acquired.
    #[must_use]
    pub fn pages(&self) -> usize {
        self.pool.pages()
    }

    /// The total number of object slots carved so far.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// The number of slots currently available without pool growth.
    #[must_use]
    pub fn free_slots(&self) -> usize {
        self.pool.free_slots()
    }

    /// The number of objects currently allocated.
    #[must_use]
    pub fn used_slots(&self) -> usize {
        self.pool.used_slots()
    }

    /// Whether the allocator has no outstanding allocations.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pool.is_idle()
    }
}

impl<T, const MAX_PAGES: usize> PartialEq for PoolAllocator<T, MAX_PAGES> {
    /// Compares allocator *identity*, not configuration.
    ///
    /// Each allocator owns disjoint memory, so two distinct instances never compare equal,
    /// even when built with identical parameters. Only an allocator compares equal to itself.
    fn eq(&self, other: &Self) -> bool {
        self.pool.id() == other.pool.id()
    }
}

impl<T, const MAX_PAGES: usize> Eq for PoolAllocator<T, MAX_PAGES> {}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::items_after_statements,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(PoolAllocator<u64>: Send, Debug);
    assert_not_impl_any!(PoolAllocator<u64>: Sync, Clone);

    #[test]
    fn smoke_test() {
        let mut allocator = PoolAllocator::<u64>::new().unwrap();

        let a = allocator.allocate(1).unwrap();
        let b = allocator.allocate(1).unwrap();

        unsafe {
            a.write(100);
            b.write(200);

            assert_eq!(a.read(), 100);
            assert_eq!(b.read(), 200);
        }

        assert_eq!(allocator.used_slots(), 2);

        unsafe {
            allocator.deallocate(a, 1).unwrap();
            allocator.deallocate(b, 1).unwrap();
        }

        assert!(allocator.is_idle());
    }

    #[test]
    fn bounded_allocator_preallocates_and_exhausts() {
        let mut allocator = PoolAllocator::<u64, 1>::new().unwrap();

        assert_eq!(allocator.pages(), 1);
        assert_eq!(allocator.capacity(), 512);

        let mut slots = Vec::new();
        for _ in 0..512 {
            slots.push(allocator.allocate(1).unwrap());
        }

        assert!(matches!(
            allocator.allocate(1),
            Err(Error::BudgetExhausted { budget: 1 })
        ));

        for slot in slots {
            unsafe { allocator.deallocate(slot, 1).unwrap() };
        }
    }

    #[test]
    #[should_panic]
    fn bulk_allocation_is_rejected() {
        let mut allocator = PoolAllocator::<u64>::new().unwrap();

        _ = allocator.allocate(2);
    }

    #[test]
    #[should_panic]
    fn bulk_deallocation_is_rejected() {
        let mut allocator = PoolAllocator::<u64>::new().unwrap();

        let slot = allocator.allocate(1).unwrap();

        _ = unsafe { allocator.deallocate(slot, 2) };
    }

    #[test]
    fn distinct_instances_never_compare_equal() {
        let first = PoolAllocator::<u64>::new().unwrap();
        let second = PoolAllocator::<u64>::new().unwrap();

        assert_ne!(first, second);
        assert_eq!(first, first);
        assert_eq!(second, second);
    }

    #[test]
    fn fresh_produces_an_independent_empty_allocator() {
        let mut allocator = PoolAllocator::<u64>::new().unwrap();

        _ = allocator.allocate(1).unwrap();

        let fresh = allocator.fresh().unwrap();

        assert_eq!(fresh.used_slots(), 0);
        assert_eq!(fresh.pages(), 0);
        assert_ne!(allocator, fresh);

        // The original is untouched by the operation.
        assert_eq!(allocator.used_slots(), 1);
    }

    #[test]
    fn rebind_carries_the_page_budget() {
        let allocator = PoolAllocator::<u32, 2>::new().unwrap();

        let rebound = allocator.rebind::<[u8; 128]>().unwrap();

        assert_eq!(rebound.max_pages(), 2);
        assert_eq!(rebound.pages(), 2);
        assert_eq!(rebound.capacity(), 2 * (4096 / 128));
        assert!(rebound.is_idle());
    }

    #[test]
    fn moving_transfers_the_embedded_pool() {
        let mut allocator = PoolAllocator::<u64>::new().unwrap();

        let slot = allocator.allocate(1).unwrap();

        let mut moved = allocator;

        assert_eq!(moved.used_slots(), 1);
        assert_eq!(moved.pages(), 1);

        unsafe {
            slot.write(5);
            assert_eq!(slot.read(), 5);

            moved.deallocate(slot, 1).unwrap();
        }
    }

    #[test]
    fn addresses_are_aligned_for_the_element_type() {
        #[repr(C, align(32))]
        struct Aligned {
            data: [u8; 32],
        }

        let mut allocator = PoolAllocator::<Aligned>::new().unwrap();

        for _ in 0..8 {
            let slot = allocator.allocate(1).unwrap();
            assert_eq!(slot.as_ptr() as usize % align_of::<Aligned>(), 0);
        }
    }
}
