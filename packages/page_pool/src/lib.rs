//! A pool of fixed-size memory slots carved from page-granular backing storage.
//!
//! This crate provides [`PagePool`], an object pool that hands out fixed-size memory slots with
//! O(1) allocation and deallocation. The pool obtains its backing memory one 4096-byte page at a
//! time from a [`PageSource`] and slices each page into as many same-sized slots as fit.
//!
//! # Key features
//!
//! - **O(1) allocation and recycling**: no searching, merging or splitting on the hot path
//! - **Two growth policies**: a fixed page budget acquired eagerly at construction, or unlimited
//!   lazy growth one page at a time
//! - **Pluggable backing storage**: any [`PageSource`] implementation; the default
//!   [`SystemPageSource`] draws from the global allocator
//! - **No per-address bookkeeping**: recycling relabels a fungible descriptor instead of looking
//!   up the one tied to the returned address (see [`PagePool::deallocate()`])
//! - **Stable slot addresses**: slots never move and pages are never released before the pool
//!   itself is torn down
//!
//! # Growth policies
//!
//! A pool built with [`max_pages()`](PagePoolBuilder::max_pages) acquires its entire capacity up
//! front and never touches the page source again; allocation beyond that capacity fails with
//! [`Error::BudgetExhausted`]. This makes the post-construction allocation path suitable for
//! latency-critical code that must not reach into a general-purpose allocator.
//!
//! A pool built without a budget starts empty and grows by exactly one page whenever a slot is
//! requested and none is free.
//!
//! # Examples
//!
//! Unlimited pool, growing on demand:
//!
//! ```rust
//! use page_pool::PagePool;
//!
//! let mut pool = PagePool::builder().layout_of::<u64>().build().unwrap();
//!
//! let slot = pool.allocate().unwrap();
//!
//! // The pool hands out raw memory; reading and writing it is up to the caller.
//! // SAFETY: The slot is at least as large and aligned as u64 and is exclusively ours.
//! unsafe { slot.cast::<u64>().write(42) };
//!
//! assert_eq!(pool.pages(), 1);
//! assert_eq!(pool.used_slots(), 1);
//!
//! // SAFETY: The address was obtained from this pool and not yet returned.
//! unsafe { pool.deallocate(slot).unwrap() };
//! ```
//!
//! Bounded pool with its whole capacity pre-allocated:
//!
//! ```rust
//! use std::num::NonZero;
//!
//! use page_pool::PagePool;
//!
//! let mut pool = PagePool::builder()
//!     .layout_of::<u64>()
//!     .max_pages(NonZero::new(1).unwrap())
//!     .build()
//!     .unwrap();
//!
//! // One 4096-byte page holds 512 8-byte slots, all free from the start.
//! assert_eq!(pool.free_slots(), 512);
//! assert_eq!(pool.capacity(), 512);
//! ```
//!
//! # Thread safety
//!
//! The pool is thread-mobile ([`Send`] when its page source is) but not thread-safe ([`Sync`]).
//! Concurrent use requires external mutual exclusion; the pool itself never locks.

mod builder;
mod chunks;
mod drop_policy;
mod error;
mod page_source;
mod pool;
mod records;

pub use builder::PagePoolBuilder;
pub(crate) use chunks::*;
pub use drop_policy::DropPolicy;
pub use error::{Error, PagesExhausted};
pub(crate) use error::Result;
pub use page_source::{PAGE_SIZE, PageSource, SystemPageSource};
pub use pool::PagePool;
pub(crate) use records::*;
