use thiserror::Error;

/// The page source could not supply another page.
///
/// This is the only failure a [`PageSource`][crate::PageSource] can report; whether it is
/// permanent or transient is a property of the specific source.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("the page source has no pages available")]
pub struct PagesExhausted;

/// Errors that can occur when allocating from or returning slots to a pool.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The pool was built with a fixed page budget and every slot of that capacity is
    /// currently allocated.
    ///
    /// A bounded pool never grows past its budget, so this only clears when slots are returned.
    #[error("the pool's fixed budget of {budget} page(s) is fully allocated")]
    BudgetExhausted {
        /// The page budget the pool was built with.
        budget: usize,
    },

    /// The page source failed to supply the page needed to grow the pool.
    #[error(transparent)]
    PagesExhausted(#[from] PagesExhausted),

    /// `deallocate` was called while the pool had no outstanding allocations.
    ///
    /// This indicates caller misuse: more addresses were returned than were handed out.
    #[error("deallocate was called with no outstanding allocations to recycle")]
    NothingToDeallocate,
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);
    assert_impl_all!(PagesExhausted: Send, Sync, Debug);

    #[test]
    fn page_source_failure_converts_to_pool_error() {
        let error: Error = PagesExhausted.into();

        assert!(matches!(error, Error::PagesExhausted(_)));
    }

    #[test]
    fn errors_render_with_context() {
        let error = Error::BudgetExhausted { budget: 4 };

        assert!(error.to_string().contains('4'));
    }
}
