//! A pool with a fixed page budget acquires its whole capacity up front and never touches
//! the page source again, making every later allocation O(1) and allocation-free.

use std::num::NonZero;

use page_pool::{Error, PagePool};

fn main() {
    let mut pool = PagePool::builder()
        .layout_of::<[u8; 64]>()
        .max_pages(NonZero::new(2).unwrap())
        .build()
        .expect("the system page source can supply two pages");

    println!(
        "Bounded pool pre-allocated {} page(s) = {} slots",
        pool.pages(),
        pool.capacity()
    );

    // Drain the entire capacity.
    let mut slots = Vec::with_capacity(pool.capacity());
    while let Ok(slot) = pool.allocate() {
        slots.push(slot);
    }

    println!("Allocated all {} slots", slots.len());

    // One more allocation fails with a recoverable out-of-memory error.
    match pool.allocate() {
        Err(Error::BudgetExhausted { budget }) => {
            println!("Further allocation refused: the budget of {budget} page(s) is spent");
        }
        other => panic!("expected budget exhaustion, got {other:?}"),
    }

    // Returning a slot immediately makes capacity available again.
    let recycled = slots.pop().expect("we allocated at least one slot");
    // SAFETY: The address was obtained from this pool and not yet returned.
    unsafe { pool.deallocate(recycled).expect("the pool has outstanding allocations") };

    assert!(pool.allocate().is_ok());

    println!("Recycling a slot restored capacity without touching the page source");
}
