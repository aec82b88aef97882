use std::alloc::{Layout, alloc, dealloc};
use std::ptr::NonNull;

use crate::PagesExhausted;

/// Size in bytes of every block supplied by a [`PageSource`].
///
/// This is also the unit of pool growth: a pool acquires backing memory one page at a time and
/// never in any other granularity.
pub const PAGE_SIZE: usize = 4096;

/// The layout of one page: [`PAGE_SIZE`] bytes, aligned to a page boundary.
pub(crate) fn page_layout() -> Layout {
    Layout::from_size_align(PAGE_SIZE, PAGE_SIZE)
        .expect("the page size is a nonzero power of two, which is always a valid layout")
}

/// A supplier of page-granular backing memory for a [`PagePool`][crate::PagePool].
///
/// Implementations hand out blocks of exactly [`PAGE_SIZE`] bytes, aligned to [`PAGE_SIZE`],
/// and reclaim them when the pool is torn down. The pool is the sole caller; it releases every
/// page it acquired exactly once, in its `Drop` implementation.
pub trait PageSource {
    /// Obtains one page-sized, page-aligned block of memory.
    ///
    /// # Errors
    ///
    /// Returns [`PagesExhausted`] if no page can be supplied.
    fn allocate_page(&mut self) -> std::result::Result<NonNull<u8>, PagesExhausted>;

    /// Returns a previously supplied page.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `page` was obtained from [`allocate_page()`] on this same
    /// instance and has not already been released.
    ///
    /// [`allocate_page()`]: Self::allocate_page
    unsafe fn release_page(&mut self, page: NonNull<u8>);
}

/// The default [`PageSource`], drawing pages from the global allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemPageSource;

impl PageSource for SystemPageSource {
    fn allocate_page(&mut self) -> std::result::Result<NonNull<u8>, PagesExhausted> {
        // SAFETY: The page layout has non-zero size.
        let ptr = unsafe { alloc(page_layout()) };

        NonNull::new(ptr).ok_or(PagesExhausted)
    }

    unsafe fn release_page(&mut self, page: NonNull<u8>) {
        // SAFETY: The caller guarantees the page came from allocate_page() above, which used
        // this same layout, and that it is released at most once.
        unsafe { dealloc(page.as_ptr(), page_layout()) };
    }
}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(SystemPageSource: Send, Sync, Debug);

    #[test]
    fn pages_are_page_aligned() {
        let mut source = SystemPageSource;

        let page = source.allocate_page().unwrap();

        assert_eq!(page.as_ptr() as usize % PAGE_SIZE, 0);

        unsafe { source.release_page(page) };
    }

    #[test]
    fn pages_are_writable_end_to_end() {
        let mut source = SystemPageSource;

        let page = source.allocate_page().unwrap();

        unsafe {
            page.write(0xAB);
            page.add(PAGE_SIZE - 1).write(0xCD);

            assert_eq!(page.read(), 0xAB);
            assert_eq!(page.add(PAGE_SIZE - 1).read(), 0xCD);

            source.release_page(page);
        }
    }
}
