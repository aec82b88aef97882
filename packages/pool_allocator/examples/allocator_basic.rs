//! Basic usage of the `pool_allocator` crate:
//!
//! * Creating a typed allocator.
//! * Allocating and initializing single objects.
//! * Rebinding to a sibling element type.
//! * Returning objects to the allocator.

use pool_allocator::PoolAllocator;

fn main() {
    let mut allocator =
        PoolAllocator::<u64>::new().expect("an unbounded allocator acquires nothing");

    // Each request is for exactly one object; the allocator is not a bulk allocator.
    let slot = allocator
        .allocate(1)
        .expect("the system page source has pages available");

    // The memory is uninitialized until we construct a value in it.
    // SAFETY: The slot is valid for u64 writes and exclusively ours.
    unsafe { slot.write(42) };

    // SAFETY: The slot was just initialized.
    println!("Allocated a u64 slot holding {}", unsafe { slot.read() });

    println!(
        "The allocator carved {} slots from {} page(s); {} in use",
        allocator.capacity(),
        allocator.pages(),
        allocator.used_slots()
    );

    // A container holding u64 values would not allocate u64 directly but its own node type,
    // which embeds the value plus link overhead. Rebinding produces an independent allocator
    // for that sibling type under the same page budget.
    struct ListNode {
        _value: u64,
        _next: Option<std::ptr::NonNull<ListNode>>,
    }

    let node_allocator = allocator
        .rebind::<ListNode>()
        .expect("an unbounded allocator acquires nothing");

    println!(
        "Rebound to a node allocator: {} node slots per page instead of {}",
        4096 / size_of::<ListNode>(),
        4096 / size_of::<u64>()
    );
    drop(node_allocator);

    // SAFETY: The pointer was obtained from this allocator and not yet returned.
    unsafe {
        allocator
            .deallocate(slot, 1)
            .expect("the allocator has outstanding allocations");
    }

    println!("Returned the slot; the allocator is idle: {}", allocator.is_idle());
}
