//! Basic usage of the `page_pool` crate:
//!
//! * Creating a pool.
//! * Allocating slots.
//! * Writing to and reading from slots.
//! * Returning slots to the pool.

use page_pool::PagePool;

fn main() {
    let mut pool = PagePool::builder()
        .layout_of::<u64>()
        .build()
        .expect("an unbounded pool acquires nothing at construction, so this cannot fail");

    // The pool starts empty and grows by one page on the first allocation.
    let first = pool.allocate().expect("the system page source has pages available");
    let second = pool.allocate().expect("the just-acquired page has free slots");

    println!(
        "Pool now holds {} page(s) sliced into {} slots, {} of which are in use",
        pool.pages(),
        pool.capacity(),
        pool.used_slots()
    );

    // The pool hands out raw memory; initializing it is up to us.
    // SAFETY: Each slot is at least as large and aligned as u64 and exclusively ours.
    unsafe {
        first.cast::<u64>().write(1);
        second.cast::<u64>().write(2);

        println!(
            "Slot contents: {} and {}",
            first.cast::<u64>().read(),
            second.cast::<u64>().read()
        );
    }

    // Returning slots makes their capacity available again; the backing page stays with
    // the pool until the pool itself is dropped.
    // SAFETY: Both addresses were obtained from this pool and not yet returned.
    unsafe {
        pool.deallocate(first).expect("the pool has outstanding allocations");
        pool.deallocate(second).expect("the pool has outstanding allocations");
    }

    println!(
        "After returning both slots: {} free of {} total",
        pool.free_slots(),
        pool.capacity()
    );
}
