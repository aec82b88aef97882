use std::ptr::NonNull;

/// Bookkeeping token for one allocatable slot.
///
/// A descriptor is not permanently tied to the address it was created with. Returning memory to
/// the pool recycles whichever descriptor is cheapest to reach and relabels it with the address
/// being returned, so a descriptor's identity is its arena index, while its `address` field is
/// merely the payload it currently carries.
///
/// At any moment a descriptor is a member of exactly one of the pool's two stacks: the free
/// stack (its address is available for allocation) or the used stack (its address has been
/// handed out).
#[derive(Debug)]
pub(crate) struct SlotDescriptor {
    /// Address of the slot this descriptor currently represents.
    pub(crate) address: NonNull<u8>,

    /// Arena index of the next descriptor on whichever stack this one is linked into.
    pub(crate) next: Option<usize>,
}

/// Accounting record for one page obtained from the page source.
///
/// Created when the pool grows; the backing page is only released when the pool is torn down.
#[derive(Debug)]
pub(crate) struct PageRecord {
    /// Base address of the page.
    pub(crate) base: NonNull<u8>,

    /// Number of slots carved from this page. Accounting only; the allocation path never
    /// consults this.
    #[cfg_attr(
        not(debug_assertions),
        expect(dead_code, reason = "read by the debug-build integrity check")
    )]
    pub(crate) slots_carved: usize,
}
