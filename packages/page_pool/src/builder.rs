use std::alloc::Layout;
use std::cell::Cell;
use std::marker::PhantomData;
use std::num::NonZero;

use crate::{DropPolicy, Error, PAGE_SIZE, PagePool, PageSource, SystemPageSource};

/// Builder for creating an instance of [`PagePool`].
///
/// [`PagePool`] requires the object memory layout to be specified at construction time. Use
/// either `.layout()` to provide a specific layout or `.layout_of::<T>()` to generate a layout
/// based on the provided type.
///
/// The layout is mandatory, whereas other settings are optional: the pool defaults to unlimited
/// lazy growth, the [`SystemPageSource`], and the default [`DropPolicy`].
///
/// # Examples
///
/// Using a specific layout:
///
/// ```
/// use std::alloc::Layout;
///
/// use page_pool::PagePool;
///
/// let layout = Layout::new::<u32>();
/// let pool = PagePool::builder().layout(layout).build().unwrap();
/// ```
///
/// Using type-based layout and a fixed page budget:
///
/// ```
/// use std::num::NonZero;
///
/// use page_pool::PagePool;
///
/// let pool = PagePool::builder()
///     .layout_of::<u64>()
///     .max_pages(NonZero::new(2).unwrap())
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.pages(), 2);
/// ```
///
/// # Thread safety
///
/// The builder is thread-mobile ([`Send`] when its page source is) and can be safely
/// transferred between threads, allowing pool configuration to happen on different threads than
/// where the pool is used. However, it is not thread-safe ([`Sync`]) as it contains mutable
/// configuration state.
#[derive(Debug)]
#[must_use]
pub struct PagePoolBuilder<S: PageSource = SystemPageSource> {
    object_layout: Option<Layout>,
    max_pages: Option<NonZero<usize>>,
    drop_policy: DropPolicy,
    page_source: S,

    // Prevents Sync while allowing Send - builders are thread-mobile but not thread-safe
    _not_sync: PhantomData<Cell<()>>,
}

impl PagePoolBuilder {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            object_layout: None,
            max_pages: None,
            drop_policy: DropPolicy::default(),
            page_source: SystemPageSource,
            _not_sync: PhantomData,
        }
    }
}

impl<S: PageSource> PagePoolBuilder<S> {
    /// Sets the memory layout of the objects the pool will hold.
    ///
    /// Every slot the pool hands out is as large as the layout's padded size and at least as
    /// aligned as the layout requires.
    ///
    /// # Panics
    ///
    /// Panics if the layout has zero size or does not fit within one page.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::alloc::Layout;
    ///
    /// use page_pool::PagePool;
    ///
    /// let layout = Layout::new::<u32>();
    /// let pool = PagePool::builder().layout(layout).build().unwrap();
    /// ```
    #[inline]
    pub fn layout(mut self, layout: Layout) -> Self {
        assert!(layout.size() > 0, "PagePool must have non-zero object size");
        assert!(
            layout.pad_to_align().size() <= PAGE_SIZE,
            "PagePool objects must fit within a single page"
        );

        self.object_layout = Some(layout);
        self
    }

    /// Sets the memory layout of the objects the pool will hold based on a type.
    ///
    /// This is a convenience method that automatically creates the layout for the given type.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized or does not fit within one page.
    ///
    /// # Examples
    ///
    /// ```
    /// use page_pool::PagePool;
    ///
    /// let pool = PagePool::builder().layout_of::<u64>().build().unwrap();
    /// ```
    #[inline]
    pub fn layout_of<T>(self) -> Self {
        self.layout(Layout::new::<T>())
    }

    /// Sets a fixed page budget for the pool.
    ///
    /// A bounded pool acquires its entire budget from the page source during
    /// [`build()`](Self::build) and never calls into the source again: its capacity is fixed
    /// for its lifetime and the post-construction allocation path never allocates.
    ///
    /// Without a budget the pool starts empty and grows lazily, one page at a time.
    #[inline]
    pub fn max_pages(mut self, max_pages: NonZero<usize>) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how to treat outstanding
    /// allocations when the pool is dropped.
    #[inline]
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Sets the [`PageSource`] the pool acquires its backing memory from.
    ///
    /// The pool takes ownership of the source and is its only caller from then on.
    #[inline]
    pub fn page_source<S2: PageSource>(self, page_source: S2) -> PagePoolBuilder<S2> {
        PagePoolBuilder {
            object_layout: self.object_layout,
            max_pages: self.max_pages,
            drop_policy: self.drop_policy,
            page_source,
            _not_sync: PhantomData,
        }
    }

    /// Builds the pool with the specified configuration.
    ///
    /// In bounded mode this eagerly acquires the entire page budget and fully populates the
    /// free stack before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the page source cannot supply the configured budget. Any pages
    /// acquired before the failure are released back to the source.
    ///
    /// # Panics
    ///
    /// Panics if no layout has been set using either [`layout`](Self::layout) or
    /// [`layout_of`](Self::layout_of).
    #[inline]
    pub fn build(self) -> std::result::Result<PagePool<S>, Error> {
        let object_layout = self.object_layout.expect(
            "a layout must be set using .layout() or .layout_of::<T>() before calling .build()",
        );

        PagePool::new_inner(
            object_layout,
            self.max_pages,
            self.drop_policy,
            self.page_source,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::alloc::Layout;
    use std::fmt::Debug;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(PagePoolBuilder: Send, Debug);
    assert_not_impl_any!(PagePoolBuilder: Sync);

    #[test]
    fn new_creates_default_state() {
        let builder = PagePoolBuilder::new();

        assert!(builder.object_layout.is_none());
        assert!(builder.max_pages.is_none());
        assert_eq!(builder.drop_policy, DropPolicy::default());
    }

    #[test]
    fn layout_sets_layout_correctly() {
        let layout = Layout::new::<u64>();

        let builder = PagePoolBuilder::new().layout(layout);

        assert_eq!(builder.object_layout, Some(layout));
    }

    #[test]
    fn layout_of_sets_layout_correctly() {
        let builder = PagePoolBuilder::new().layout_of::<String>();

        assert_eq!(builder.object_layout, Some(Layout::new::<String>()));
    }

    #[test]
    #[should_panic]
    fn zero_sized_layout_panics() {
        _ = PagePoolBuilder::new().layout_of::<()>();
    }

    #[test]
    #[should_panic]
    fn layout_larger_than_page_panics() {
        _ = PagePoolBuilder::new().layout_of::<[u8; 4097]>();
    }

    #[test]
    fn page_sized_layout_is_accepted() {
        let builder = PagePoolBuilder::new().layout_of::<[u8; 4096]>();

        assert_eq!(builder.object_layout, Some(Layout::new::<[u8; 4096]>()));
    }

    #[test]
    fn later_settings_override_earlier_ones() {
        let builder = PagePoolBuilder::new()
            .layout_of::<u32>()
            .layout_of::<u64>()
            .drop_policy(DropPolicy::MustNotReclaimAllocations)
            .drop_policy(DropPolicy::MayReclaimAllocations);

        assert_eq!(builder.object_layout, Some(Layout::new::<u64>()));
        assert_eq!(builder.drop_policy, DropPolicy::MayReclaimAllocations);
    }

    #[test]
    #[should_panic]
    fn build_without_layout_panics() {
        _ = PagePoolBuilder::new().build();
    }

    #[test]
    fn build_with_layout_succeeds() {
        let layout = Layout::new::<u32>();

        let pool = PagePoolBuilder::new().layout(layout).build().unwrap();

        assert_eq!(pool.object_layout(), layout);
    }

    #[test]
    fn builder_can_cross_threads() {
        let builder = PagePoolBuilder::new().layout_of::<u64>();

        let handle = std::thread::spawn(move || builder.build().unwrap());

        let _pool = handle.join().expect("thread completed successfully");
    }
}
