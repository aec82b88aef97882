//! A typed, allocator-shaped facade over a page-backed pool of fixed-size memory slots.
//!
//! This crate provides [`PoolAllocator<T, MAX_PAGES>`], which wraps one
//! [`page_pool::PagePool`] sized for `T` and presents it through the conventional allocator
//! surface expected by node-based data structures: single-object
//! [`allocate()`](PoolAllocator::allocate) / [`deallocate()`](PoolAllocator::deallocate),
//! [`rebind()`](PoolAllocator::rebind) to a sibling element type, and identity-based equality.
//!
//! # Design
//!
//! The allocator is a *stateful* allocator: every instance owns its pool and its backing pages
//! outright. This shapes the surface in three deliberate ways:
//!
//! - **Moving transfers the pool.** Rust move semantics carry the embedded pool, its pages and
//!   all outstanding bookkeeping to the destination; the source is statically unusable
//!   afterwards.
//! - **There is no state-sharing copy.** [`Clone`] is not implemented. The explicit
//!   [`fresh()`](PoolAllocator::fresh) operation produces an independent, empty allocator with
//!   the same configuration - never a second handle to the same memory.
//! - **Equality is identity.** Two distinct instances never compare equal, even when built with
//!   identical parameters, because "same allocator" can only mean "same memory".
//!
//! # Sizing the page budget
//!
//! `MAX_PAGES = 0` (the default) means unlimited lazy growth. A non-zero budget is acquired
//! eagerly at construction and fixes capacity for the allocator's lifetime. When an allocator
//! is rebound to a container's internal node type, the node is larger than `T` itself, so
//! budgets must be sized for the node overhead, not for `T` alone.
//!
//! # Example
//!
//! ```rust
//! use pool_allocator::PoolAllocator;
//!
//! let mut allocator = PoolAllocator::<u64>::new().unwrap();
//!
//! let slot = allocator.allocate(1).unwrap();
//!
//! // SAFETY: The slot is valid for u64 writes and exclusively ours.
//! unsafe { slot.write(42) };
//! // SAFETY: The slot was just initialized.
//! assert_eq!(unsafe { slot.read() }, 42);
//!
//! // SAFETY: The pointer was obtained from this allocator and not yet returned.
//! unsafe { allocator.deallocate(slot, 1) }.unwrap();
//! ```

mod allocator;

pub use allocator::PoolAllocator;
