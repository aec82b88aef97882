use std::alloc::Layout;
use std::num::NonZero;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use tracing::{debug, trace};

use crate::{
    ChunkedArena, DropPolicy, Error, PAGE_SIZE, PagePoolBuilder, PageRecord, PageSource, Result,
    SlotDescriptor, SystemPageSource,
};

/// Global counter for generating unique pool IDs.
static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates a unique pool ID.
fn generate_pool_id() -> u64 {
    POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A pool of fixed-size memory slots carved from page-granular backing storage.
///
/// The pool acquires memory one [`PAGE_SIZE`] block at a time from its [`PageSource`], slices
/// each page into as many same-sized slots as fit, and hands slots out with O(1)
/// [`allocate()`](Self::allocate) and [`deallocate()`](Self::deallocate) operations.
///
/// # Growth policies
///
/// With [`max_pages()`](PagePoolBuilder::max_pages) set, the pool acquires its entire capacity
/// during construction and never calls into the page source again; allocation beyond that
/// capacity fails with [`Error::BudgetExhausted`]. Without a budget the pool starts empty and
/// grows by exactly one page whenever a slot is requested and none is free.
///
/// Backing memory is never released before the pool itself is dropped, so slot addresses stay
/// valid for the pool's whole lifetime.
///
/// # Bookkeeping is decoupled from addresses
///
/// Slot availability is tracked by fungible descriptors, not by per-address records: returning
/// an address recycles whichever descriptor is cheapest to reach and relabels it with that
/// address. As a consequence the pool does not (and cannot cheaply) verify that a returned
/// address really came from it - see [`deallocate()`](Self::deallocate) for the exact contract.
///
/// # Example
///
/// ```rust
/// use page_pool::PagePool;
///
/// let mut pool = PagePool::builder().layout_of::<u64>().build().unwrap();
///
/// let slot = pool.allocate().unwrap();
///
/// // SAFETY: The slot is at least as large and aligned as u64 and is exclusively ours.
/// unsafe { slot.cast::<u64>().write(0xFEED) };
///
/// // SAFETY: The address was obtained from this pool and not yet returned.
/// unsafe { pool.deallocate(slot) }.unwrap();
/// ```
///
/// # Thread safety
///
/// The pool is thread-mobile ([`Send`] when its page source is) and can be moved between
/// threads, but it is not thread-safe ([`Sync`]) and cannot be shared between threads without
/// external synchronization. The pool itself never locks.
#[derive(Debug)]
pub struct PagePool<S: PageSource = SystemPageSource> {
    /// We need to uniquely identify each pool so that owners of pool-backed memory can tell
    /// whether two pool handles refer to the same instance. Identity survives moves.
    pool_id: u64,

    /// The memory layout of the objects the slots are sized for.
    object_layout: Layout,

    /// Distance in bytes between consecutive slots carved from the same page. This is the
    /// padded size of the object layout; any remainder bytes at the end of a page are inert
    /// internal fragmentation.
    slot_stride: usize,

    /// The page budget. `Some` means bounded mode: the whole budget was acquired at
    /// construction and the page source is never consulted again. `None` means unlimited lazy
    /// growth.
    max_pages: Option<NonZero<usize>>,

    /// One record per page acquired from the page source, in acquisition order.
    page_records: ChunkedArena<PageRecord>,

    /// Every slot descriptor ever created. Descriptors are created when a page is sliced and
    /// reused indefinitely afterwards; they are only destroyed at pool teardown.
    descriptors: ChunkedArena<SlotDescriptor>,

    /// Head of the free stack: descriptors whose addresses are available for allocation.
    free_head: Option<usize>,

    /// Head of the used stack: descriptors whose addresses have been handed out.
    used_head: Option<usize>,

    /// Drop policy that determines how the pool treats outstanding allocations when dropped.
    drop_policy: DropPolicy,

    /// The supplier of backing pages. The pool is its sole caller.
    page_source: S,
}

impl PagePool {
    /// Creates a builder for configuring and constructing a [`PagePool`].
    ///
    /// You must specify an object memory layout using either `.layout()` or `.layout_of::<T>()`
    /// before calling `.build()`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use page_pool::PagePool;
    ///
    /// let pool = PagePool::builder().layout_of::<u32>().build().unwrap();
    ///
    /// assert_eq!(pool.pages(), 0);
    /// assert_eq!(pool.free_slots(), 0);
    /// ```
    #[inline]
    pub fn builder() -> PagePoolBuilder {
        PagePoolBuilder::new()
    }
}

impl<S: PageSource> PagePool<S> {
    /// Creates a new [`PagePool`] with the specified configuration.
    ///
    /// This method is used internally by the builder to construct the actual pool.
    pub(crate) fn new_inner(
        object_layout: Layout,
        max_pages: Option<NonZero<usize>>,
        drop_policy: DropPolicy,
        page_source: S,
    ) -> Result<Self> {
        assert!(
            object_layout.size() > 0,
            "PagePool must have non-zero object size"
        );

        let slot_stride = object_layout.pad_to_align().size();

        assert!(
            slot_stride <= PAGE_SIZE,
            "PagePool objects must fit within a single page"
        );

        let mut pool = Self {
            pool_id: generate_pool_id(),
            object_layout,
            slot_stride,
            max_pages,
            page_records: ChunkedArena::new(),
            descriptors: ChunkedArena::new(),
            free_head: None,
            used_head: None,
            drop_policy,
            page_source,
        };

        // Bounded mode pre-allocates its entire capacity up front. From here on, a bounded
        // pool never calls into the page source again until teardown; if the source cannot
        // supply the budget, dropping the partially built pool returns what was acquired.
        if let Some(budget) = max_pages {
            for _ in 0..budget.get() {
                pool.grow()?;
            }
        }

        Ok(pool)
    }

    /// The memory layout the pool's slots are sized for.
    #[must_use]
    #[inline]
    pub fn object_layout(&self) -> Layout {
        self.object_layout
    }

    /// The process-unique identity of this pool instance.
    ///
    /// Two pools never share an ID, even when built with identical parameters, because they
    /// never share memory. The ID survives moves of the pool value.
    #[must_use]
    #[inline]
    pub fn id(&self) -> u64 {
        self.pool_id
    }

    /// The number of slots each acquired page is sliced into.
    #[must_use]
    #[inline]
    #[expect(
        clippy::integer_division,
        reason = "remainder bytes are deliberate internal fragmentation"
    )]
    pub fn slots_per_page(&self) -> usize {
        PAGE_SIZE / self.slot_stride
    }

    /// The number of pages acquired from the page source so far.
    ///
    /// In bounded mode this equals the budget from construction onwards.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::num::NonZero;
    ///
    /// use page_pool::PagePool;
    ///
    /// let pool = PagePool::builder()
    ///     .layout_of::<u64>()
    ///     .max_pages(NonZero::new(3).unwrap())
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(pool.pages(), 3);
    /// ```
    #[must_use]
    pub fn pages(&self) -> usize {
        self.page_records.len()
    }

    /// The total number of slots carved from all acquired pages.
    ///
    /// This equals [`free_slots()`](Self::free_slots) plus [`used_slots()`](Self::used_slots)
    /// at all times, and only grows (the pool never releases pages while alive).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.descriptors.len()
    }

    /// The number of slots currently available for allocation.
    ///
    /// This walks the free stack; it is intended for introspection and tests, not for the
    /// allocation hot path.
    #[must_use]
    pub fn free_slots(&self) -> usize {
        Self::stack_len(&self.descriptors, self.free_head)
    }

    /// The number of slots currently handed out.
    ///
    /// This walks the used stack; it is intended for introspection and tests, not for the
    /// allocation hot path.
    #[must_use]
    pub fn used_slots(&self) -> usize {
        Self::stack_len(&self.descriptors, self.used_head)
    }

    /// Whether the pool has no outstanding allocations.
    ///
    /// An idle pool may still be holding backing pages; those are only released at teardown.
    #[must_use]
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.used_head.is_none()
    }

    /// The number of fixed-capacity chunks backing the slot descriptor storage.
    #[must_use]
    pub fn descriptor_chunks(&self) -> usize {
        self.descriptors.chunk_count()
    }

    /// The number of fixed-capacity chunks backing the page record storage.
    #[must_use]
    pub fn page_record_chunks(&self) -> usize {
        self.page_records.chunk_count()
    }

    /// Allocates one slot and returns its address.
    ///
    /// The returned address points to uninitialized memory of at least the pool's object
    /// layout in size and alignment. The pool never reads or writes slot memory; initializing
    /// it and keeping track of its contents is entirely up to the caller.
    ///
    /// Excluding the amortized cost of acquiring a page when the free stack is empty, this is
    /// O(1): no searching, merging or splitting takes place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BudgetExhausted`] if the pool is bounded and its entire capacity is
    /// allocated, or [`Error::PagesExhausted`] if the page source cannot supply the page needed
    /// to grow an unbounded pool.
    ///
    /// # Example
    ///
    /// ```rust
    /// use page_pool::PagePool;
    ///
    /// let mut pool = PagePool::builder().layout_of::<u32>().build().unwrap();
    ///
    /// let slot = pool.allocate().unwrap();
    ///
    /// assert_eq!(pool.used_slots(), 1);
    /// assert_eq!(slot.as_ptr() as usize % align_of::<u32>(), 0);
    /// # // SAFETY: The address was obtained from this pool and not yet returned.
    /// # unsafe { pool.deallocate(slot) }.unwrap();
    /// ```
    pub fn allocate(&mut self) -> Result<NonNull<u8>> {
        if self.free_head.is_none() {
            self.grow()?;
        }

        let index = self
            .pop_free()
            .expect("grow() succeeded, so the free stack cannot be empty");

        let address = self.descriptors.get(index).address;
        self.push_used(index);

        Ok(address)
    }

    /// Returns an address to the pool, making its slot available for allocation again.
    ///
    /// The pool recycles the top descriptor of the used stack - **not** necessarily the
    /// descriptor that originally produced `address` - and relabels it with `address`.
    /// Descriptors are fungible bookkeeping tokens rather than per-address identities, which is
    /// what keeps this operation O(1): no lookup ties an address back to "its" descriptor, and
    /// no pairing discipline between allocate and deallocate order is required.
    ///
    /// The flip side is that the pool performs no validation of `address` whatsoever. An
    /// address that was never produced by [`allocate()`](Self::allocate) on this pool, or that
    /// was already returned, is accepted silently and will eventually be handed out as if it
    /// were a valid slot. Guarding against that would require per-address bookkeeping and is
    /// deliberately out of scope; the contract is instead expressed as a safety requirement
    /// below. Debug builds assert that the address lies within one of the pool's pages, as a
    /// development aid only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NothingToDeallocate`] if the pool has no outstanding allocations, which
    /// means the caller is returning more than it took.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `address` was obtained from [`allocate()`](Self::allocate)
    /// on this same pool and has not been returned since. The pool trusts this completely.
    ///
    /// # Example
    ///
    /// ```rust
    /// use page_pool::PagePool;
    ///
    /// let mut pool = PagePool::builder().layout_of::<u32>().build().unwrap();
    ///
    /// let slot = pool.allocate().unwrap();
    ///
    /// // SAFETY: The address was obtained from this pool and not yet returned.
    /// unsafe { pool.deallocate(slot) }.unwrap();
    ///
    /// assert_eq!(pool.free_slots(), pool.capacity());
    /// ```
    pub unsafe fn deallocate(&mut self, address: NonNull<u8>) -> Result<()> {
        let index = self.pop_used().ok_or(Error::NothingToDeallocate)?;

        #[cfg(debug_assertions)]
        self.debug_assert_pool_address(address);

        let descriptor = self.descriptors.get_mut(index);
        descriptor.address = address;
        self.push_free(index);

        Ok(())
    }

    /// Acquires one page from the page source and carves it into free slots.
    fn grow(&mut self) -> Result<()> {
        if let Some(budget) = self.max_pages {
            if self.page_records.len() >= budget.get() {
                return Err(Error::BudgetExhausted {
                    budget: budget.get(),
                });
            }
        }

        let base = self.page_source.allocate_page()?;

        let slots_per_page = self.slots_per_page();
        let page_index = self.page_records.push(PageRecord {
            base,
            slots_carved: 0,
        });

        for slot in 0..slots_per_page {
            // Cannot overflow: the offset stays within one page.
            let offset = slot.wrapping_mul(self.slot_stride);

            // SAFETY: The offset is within the PAGE_SIZE block we just obtained.
            let address = unsafe { base.add(offset) };

            let index = self.descriptors.push(SlotDescriptor {
                address,
                next: None,
            });
            self.push_free(index);
        }

        self.page_records.get_mut(page_index).slots_carved = slots_per_page;

        trace!(
            pool_id = self.pool_id,
            page_index,
            slots_per_page,
            "acquired and sliced a page"
        );

        #[cfg(debug_assertions)]
        self.integrity_check();

        Ok(())
    }

    fn pop_free(&mut self) -> Option<usize> {
        let index = self.free_head?;
        self.free_head = self.descriptors.get(index).next;
        Some(index)
    }

    fn pop_used(&mut self) -> Option<usize> {
        let index = self.used_head?;
        self.used_head = self.descriptors.get(index).next;
        Some(index)
    }

    fn push_free(&mut self, index: usize) {
        let head = self.free_head;
        self.descriptors.get_mut(index).next = head;
        self.free_head = Some(index);
    }

    fn push_used(&mut self, index: usize) {
        let head = self.used_head;
        self.descriptors.get_mut(index).next = head;
        self.used_head = Some(index);
    }

    fn stack_len(descriptors: &ChunkedArena<SlotDescriptor>, head: Option<usize>) -> usize {
        let mut count = 0_usize;
        let mut cursor = head;

        while let Some(index) = cursor {
            // Cannot overflow: the count is bounded by the number of descriptors.
            count = count.wrapping_add(1);
            cursor = descriptors.get(index).next;
        }

        count
    }

    #[cfg(debug_assertions)]
    fn debug_assert_pool_address(&self, address: NonNull<u8>) {
        let address = address.as_ptr() as usize;

        let owned = self.page_records.iter().any(|page| {
            let start = page.base.as_ptr() as usize;

            // Cannot overflow: the page allocation itself proves the range fits in memory.
            let end = start.wrapping_add(PAGE_SIZE);

            (start..end).contains(&address)
        });

        assert!(
            owned,
            "deallocate() was given an address that lies in none of the pool's pages"
        );
    }

    /// Verifies that the stacks and arenas are consistent with each other.
    ///
    /// This method is only available in debug builds and is used for testing and validation.
    #[cfg(debug_assertions)]
    #[allow(
        clippy::arithmetic_side_effects,
        reason = "integrity check arithmetic is bounded by the arena sizes"
    )]
    pub(crate) fn integrity_check(&self) {
        let free = Self::stack_len(&self.descriptors, self.free_head);
        let used = Self::stack_len(&self.descriptors, self.used_head);

        assert!(
            free + used == self.descriptors.len(),
            "free stack ({free}) and used stack ({used}) together must account for every one of the {} descriptors",
            self.descriptors.len()
        );

        let carved: usize = self.page_records.iter().map(|page| page.slots_carved).sum();

        assert!(
            carved == self.descriptors.len(),
            "pages report {carved} carved slots but {} descriptors exist",
            self.descriptors.len()
        );
    }
}

impl<S: PageSource> Drop for PagePool<S> {
    fn drop(&mut self) {
        let outstanding = self.used_slots();

        debug!(
            pool_id = self.pool_id,
            pages = self.page_records.len(),
            outstanding,
            "tearing down pool"
        );

        for page in self.page_records.iter() {
            // SAFETY: Every recorded base address came from allocate_page() on this same
            // source, and teardown is the only place that releases pages, exactly once each.
            unsafe { self.page_source.release_page(page.base) };
        }

        // We release the memory first and only then evaluate the policy. If we are already
        // panicking, we do not panic again because that would simply obscure whatever the
        // original panic was, leading to debug difficulties.
        if !thread::panicking()
            && matches!(self.drop_policy, DropPolicy::MustNotReclaimAllocations)
        {
            assert!(
                outstanding == 0,
                "dropped a PagePool with {outstanding} outstanding allocation(s) - this is forbidden by DropPolicy::MustNotReclaimAllocations"
            );
        }
    }
}

// SAFETY: The raw pointers inside the pool all target memory exclusively owned by the pool
// (pages obtained from its own page source and bookkeeping arenas); nothing is shared with
// other threads and no thread-local state is involved. All mutation goes through &mut self.
unsafe impl<S: PageSource + Send> Send for PagePool<S> {}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::items_after_statements,
    clippy::indexing_slicing,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::fmt::Debug;
    use std::num::NonZero;
    use std::rc::Rc;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::PagesExhausted;

    assert_impl_all!(PagePool: Send, Debug);
    assert_not_impl_any!(PagePool: Sync);

    /// A page source that delegates to the system source while tracking every page it has
    /// supplied and not yet had returned. Clones share the same tracking state, so one fake
    /// can serve several pools.
    #[derive(Clone, Debug, Default)]
    struct FakePageSource {
        state: Rc<RefCell<FakeSourceState>>,
    }

    #[derive(Debug, Default)]
    struct FakeSourceState {
        limit: Option<usize>,
        total_supplied: usize,
        outstanding: HashSet<usize>,
    }

    impl FakePageSource {
        fn new() -> Self {
            Self::default()
        }

        /// A source that fails after supplying `limit` pages in total.
        fn with_limit(limit: usize) -> Self {
            Self {
                state: Rc::new(RefCell::new(FakeSourceState {
                    limit: Some(limit),
                    ..FakeSourceState::default()
                })),
            }
        }

        fn outstanding(&self) -> usize {
            self.state.borrow().outstanding.len()
        }

        fn total_supplied(&self) -> usize {
            self.state.borrow().total_supplied
        }
    }

    impl PageSource for FakePageSource {
        fn allocate_page(&mut self) -> std::result::Result<NonNull<u8>, PagesExhausted> {
            let mut state = self.state.borrow_mut();

            if state
                .limit
                .is_some_and(|limit| state.total_supplied >= limit)
            {
                return Err(PagesExhausted);
            }

            let page = SystemPageSource.allocate_page()?;

            state.total_supplied += 1;
            state.outstanding.insert(page.as_ptr() as usize);

            Ok(page)
        }

        unsafe fn release_page(&mut self, page: NonNull<u8>) {
            let was_outstanding = self
                .state
                .borrow_mut()
                .outstanding
                .remove(&(page.as_ptr() as usize));

            assert!(
                was_outstanding,
                "released a page this source never supplied"
            );

            unsafe { SystemPageSource.release_page(page) };
        }
    }

    fn u64_pool() -> PagePool {
        PagePool::builder().layout_of::<u64>().build().unwrap()
    }

    #[test]
    fn smoke_test() {
        let mut pool = u64_pool();

        assert_eq!(pool.pages(), 0);
        assert!(pool.is_idle());

        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();

        assert_ne!(a, b);
        assert_eq!(pool.pages(), 1);
        assert_eq!(pool.used_slots(), 2);
        assert_eq!(pool.free_slots(), pool.slots_per_page() - 2);

        unsafe {
            a.cast::<u64>().write(11);
            b.cast::<u64>().write(22);

            assert_eq!(a.cast::<u64>().read(), 11);
            assert_eq!(b.cast::<u64>().read(), 22);

            pool.deallocate(a).unwrap();
            pool.deallocate(b).unwrap();
        }

        assert!(pool.is_idle());
        assert_eq!(pool.free_slots(), pool.slots_per_page());
    }

    #[test]
    fn bounded_pool_preallocates_entire_budget() {
        let pool = PagePool::builder()
            .layout_of::<u64>()
            .max_pages(NonZero::new(1).unwrap())
            .build()
            .unwrap();

        assert_eq!(pool.pages(), 1);
        assert_eq!(pool.free_slots(), 512);
        assert_eq!(pool.used_slots(), 0);
    }

    #[test]
    fn allocation_moves_one_slot_to_used() {
        let mut pool = PagePool::builder()
            .layout_of::<u64>()
            .max_pages(NonZero::new(1).unwrap())
            .build()
            .unwrap();

        let slot = pool.allocate().unwrap();

        assert_eq!(pool.free_slots(), 511);
        assert_eq!(pool.used_slots(), 1);

        unsafe { pool.deallocate(slot) }.unwrap();
    }

    #[test]
    fn unbounded_pool_grows_one_page_at_a_time() {
        let mut pool = u64_pool();

        let total = 512 * 4;

        for _ in 0..total {
            _ = pool.allocate().unwrap();
        }

        assert_eq!(pool.pages(), 4);
        assert_eq!(pool.used_slots(), total);
        assert_eq!(pool.free_slots(), 0);
    }

    #[test]
    fn bounded_pool_fails_when_budget_is_exhausted() {
        let mut pool = PagePool::builder()
            .layout_of::<u64>()
            .max_pages(NonZero::new(1).unwrap())
            .build()
            .unwrap();

        for _ in 0..512 {
            _ = pool.allocate().unwrap();
        }

        let result = pool.allocate();

        assert!(matches!(result, Err(Error::BudgetExhausted { budget: 1 })));

        // The failure is recoverable: the pool keeps serving once a slot is returned.
        // (Any outstanding address would do; we fabricate none and instead verify counts.)
        assert_eq!(pool.used_slots(), 512);
    }

    #[test]
    fn deallocate_without_outstanding_allocations_fails() {
        let mut pool = PagePool::builder()
            .layout_of::<u64>()
            .max_pages(NonZero::new(1).unwrap())
            .build()
            .unwrap();

        let result = unsafe { pool.deallocate(NonNull::dangling()) };

        assert!(matches!(result, Err(Error::NothingToDeallocate)));
    }

    #[test]
    fn round_trip_reuses_capacity_without_growth() {
        let mut pool = u64_pool();

        let total = 512 * 4;

        let mut slots = Vec::with_capacity(total);
        for _ in 0..total {
            slots.push(pool.allocate().unwrap());
        }

        let pages_before = pool.pages();

        // Return everything in an order unrelated to allocation order.
        let (evens, odds): (Vec<_>, Vec<_>) =
            slots.iter().enumerate().partition(|(index, _)| index % 2 == 0);
        for (_, slot) in evens.iter().rev().chain(&odds) {
            unsafe { pool.deallocate(**slot) }.unwrap();
        }

        assert_eq!(pool.free_slots(), total);
        assert_eq!(pool.used_slots(), 0);
        assert_eq!(pool.pages(), pages_before);

        // The freed capacity is reused; no new pages are acquired.
        for _ in 0..total {
            _ = pool.allocate().unwrap();
        }

        assert_eq!(pool.pages(), pages_before);
        assert_eq!(pool.used_slots(), total);
    }

    #[test]
    fn free_and_used_always_account_for_every_slot() {
        let mut pool = u64_pool();

        let mut slots = Vec::new();

        for round in 0..6 {
            for _ in 0..200 {
                slots.push(pool.allocate().unwrap());
            }

            if round % 2 == 0 {
                for slot in slots.drain(..100) {
                    unsafe { pool.deallocate(slot) }.unwrap();
                }
            }

            assert_eq!(pool.free_slots() + pool.used_slots(), pool.capacity());
            assert_eq!(pool.capacity(), pool.pages() * pool.slots_per_page());
        }

        for slot in slots.drain(..) {
            unsafe { pool.deallocate(slot) }.unwrap();
        }

        assert_eq!(pool.free_slots() + pool.used_slots(), pool.capacity());
    }

    #[test]
    fn deallocate_recycles_an_arbitrary_descriptor() {
        let mut pool = u64_pool();

        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();

        // Returning `a` recycles the descriptor that produced `b` (the top of the used
        // stack), relabelling it with `a`. The next allocation must therefore hand `a` out
        // again, while `b` stays outstanding.
        unsafe { pool.deallocate(a) }.unwrap();

        let reused = pool.allocate().unwrap();

        assert_eq!(reused, a);
        assert_eq!(pool.used_slots(), 2);

        unsafe {
            pool.deallocate(b).unwrap();
            pool.deallocate(reused).unwrap();
        }
    }

    #[test]
    fn bookkeeping_grows_in_fixed_chunks() {
        let pool = PagePool::builder()
            .layout_of::<u64>()
            .max_pages(NonZero::new(1).unwrap())
            .build()
            .unwrap();

        // 512 descriptors at 255 per chunk need three chunks; one page record needs one.
        assert_eq!(pool.descriptor_chunks(), 3);
        assert_eq!(pool.page_record_chunks(), 1);
    }

    #[test]
    fn moving_the_pool_transfers_its_state() {
        let mut pool = u64_pool();

        let slot = pool.allocate().unwrap();

        let mut moved = pool;

        assert_eq!(moved.pages(), 1);
        assert_eq!(moved.used_slots(), 1);
        assert_eq!(moved.free_slots(), moved.slots_per_page() - 1);

        // Addresses handed out before the move remain valid afterwards.
        unsafe {
            slot.cast::<u64>().write(77);
            assert_eq!(slot.cast::<u64>().read(), 77);

            moved.deallocate(slot).unwrap();
        }
    }

    #[test]
    fn bounded_pool_never_calls_source_after_construction() {
        let source = FakePageSource::new();

        let mut pool = PagePool::builder()
            .layout_of::<u64>()
            .max_pages(NonZero::new(2).unwrap())
            .page_source(source.clone())
            .build()
            .unwrap();

        assert_eq!(source.total_supplied(), 2);

        let mut slots = Vec::new();
        for _ in 0..1024 {
            slots.push(pool.allocate().unwrap());
        }

        assert!(matches!(
            pool.allocate(),
            Err(Error::BudgetExhausted { budget: 2 })
        ));

        for slot in slots {
            unsafe { pool.deallocate(slot) }.unwrap();
        }

        assert_eq!(source.total_supplied(), 2);
    }

    #[test]
    fn failed_eager_acquisition_releases_partial_progress() {
        let source = FakePageSource::with_limit(2);

        let result = PagePool::builder()
            .layout_of::<u64>()
            .max_pages(NonZero::new(4).unwrap())
            .page_source(source.clone())
            .build();

        assert!(matches!(result, Err(Error::PagesExhausted(_))));
        assert_eq!(source.total_supplied(), 2);
        assert_eq!(source.outstanding(), 0);
    }

    #[test]
    fn unbounded_pool_surfaces_source_failure() {
        let source = FakePageSource::with_limit(1);

        let mut pool = PagePool::builder()
            .layout_of::<u64>()
            .page_source(source)
            .build()
            .unwrap();

        for _ in 0..512 {
            _ = pool.allocate().unwrap();
        }

        assert!(matches!(pool.allocate(), Err(Error::PagesExhausted(_))));
    }

    #[test]
    fn teardown_releases_exactly_the_pools_own_pages() {
        let source = FakePageSource::new();

        let mut first = PagePool::builder()
            .layout_of::<u64>()
            .page_source(source.clone())
            .build()
            .unwrap();

        let mut second = PagePool::builder()
            .layout_of::<u64>()
            .page_source(source.clone())
            .build()
            .unwrap();

        _ = first.allocate().unwrap();
        for _ in 0..1024 {
            _ = second.allocate().unwrap();
        }

        assert_eq!(source.outstanding(), 3);

        drop(first);

        // Only the first pool's page came back; the second pool's two are untouched.
        assert_eq!(source.outstanding(), 2);

        drop(second);

        assert_eq!(source.outstanding(), 0);
    }

    #[test]
    fn slot_addresses_honor_layout_alignment() {
        #[repr(C, align(64))]
        struct CacheAligned {
            data: [u8; 48],
        }

        let mut pool = PagePool::builder()
            .layout_of::<CacheAligned>()
            .build()
            .unwrap();

        for _ in 0..10 {
            let slot = pool.allocate().unwrap();
            assert_eq!(slot.as_ptr() as usize % align_of::<CacheAligned>(), 0);
        }
    }

    #[test]
    fn page_sized_objects_get_one_slot_per_page() {
        let mut pool = PagePool::builder().layout_of::<[u8; 4096]>().build().unwrap();

        _ = pool.allocate().unwrap();
        _ = pool.allocate().unwrap();

        assert_eq!(pool.pages(), 2);
        assert_eq!(pool.slots_per_page(), 1);
    }

    #[test]
    fn default_drop_policy_tolerates_outstanding_allocations() {
        let mut pool = u64_pool();

        _ = pool.allocate().unwrap();

        drop(pool);
    }

    #[test]
    #[should_panic]
    fn strict_drop_policy_panics_on_outstanding_allocations() {
        let mut pool = PagePool::builder()
            .layout_of::<u64>()
            .drop_policy(DropPolicy::MustNotReclaimAllocations)
            .build()
            .unwrap();

        _ = pool.allocate().unwrap();

        drop(pool);
    }

    #[test]
    fn strict_drop_policy_accepts_an_idle_pool() {
        let mut pool = PagePool::builder()
            .layout_of::<u64>()
            .drop_policy(DropPolicy::MustNotReclaimAllocations)
            .build()
            .unwrap();

        let slot = pool.allocate().unwrap();
        unsafe { pool.deallocate(slot) }.unwrap();

        drop(pool);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn integrity_holds_across_mixed_operations() {
        let mut pool = u64_pool();

        let mut slots = Vec::new();
        for _ in 0..600 {
            slots.push(pool.allocate().unwrap());
        }
        for slot in slots.drain(300..) {
            unsafe { pool.deallocate(slot) }.unwrap();
        }

        pool.integrity_check();
    }

    #[test]
    fn pool_ids_are_unique() {
        let first = u64_pool();
        let second = u64_pool();

        assert_ne!(first.id(), second.id());
    }
}
