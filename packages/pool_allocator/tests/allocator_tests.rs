//! Integration tests exercising `PoolAllocator` the way a node-based container would use it.

#![allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::arithmetic_side_effects,
    missing_docs,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]

use std::ptr::NonNull;

use pool_allocator::PoolAllocator;

struct Node {
    value: u64,
    next: Option<NonNull<Node>>,
}

/// A minimal intrusive stack that draws every node from a [`PoolAllocator`], standing in for
/// the node-based containers the allocator is meant to back.
struct PooledStack {
    allocator: PoolAllocator<Node>,
    head: Option<NonNull<Node>>,
    len: usize,
}

impl PooledStack {
    fn new() -> Self {
        Self {
            allocator: PoolAllocator::new().expect("an unbounded allocator acquires nothing"),
            head: None,
            len: 0,
        }
    }

    fn push(&mut self, value: u64) {
        let node = self
            .allocator
            .allocate(1)
            .expect("the system page source has pages available");

        unsafe {
            node.write(Node {
                value,
                next: self.head,
            });
        }

        self.head = Some(node);
        self.len += 1;
    }

    fn pop(&mut self) -> Option<u64> {
        let node = self.head?;

        let Node { value, next } = unsafe { node.read() };

        unsafe {
            self.allocator
                .deallocate(node, 1)
                .expect("the node was allocated from this allocator");
        }

        self.head = next;
        self.len -= 1;

        Some(value)
    }
}

impl Drop for PooledStack {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}

#[test]
fn stack_round_trips_in_lifo_order() {
    let mut stack = PooledStack::new();

    for value in 0..1000 {
        stack.push(value);
    }

    assert_eq!(stack.len, 1000);
    assert_eq!(stack.allocator.used_slots(), 1000);

    for expected in (0..1000).rev() {
        assert_eq!(stack.pop(), Some(expected));
    }

    assert_eq!(stack.pop(), None);
    assert!(stack.allocator.is_idle());
}

#[test]
fn freed_capacity_is_reused_without_growth() {
    let mut stack = PooledStack::new();

    for value in 0..500 {
        stack.push(value);
    }

    let pages_before = stack.allocator.pages();

    while stack.pop().is_some() {}

    for value in 0..500 {
        stack.push(value);
    }

    assert_eq!(stack.allocator.pages(), pages_before);
}

#[test]
fn slot_contents_survive_unrelated_churn() {
    let mut allocator = PoolAllocator::<u64>::new().unwrap();

    let mut slots = Vec::new();
    for value in 0..2048_u64 {
        let slot = allocator.allocate(1).unwrap();
        unsafe { slot.write(value) };
        slots.push(slot);
    }

    // Return every other slot and allocate replacements, then verify the survivors.
    let mut replacements = Vec::new();
    for slot in slots.iter().step_by(2) {
        unsafe { allocator.deallocate(*slot, 1).unwrap() };
    }
    for value in 10_000..11_024_u64 {
        let slot = allocator.allocate(1).unwrap();
        unsafe { slot.write(value) };
        replacements.push(slot);
    }

    for (index, slot) in slots.iter().enumerate().skip(1).step_by(2) {
        assert_eq!(unsafe { slot.read() }, index as u64);
    }
    for (offset, slot) in replacements.iter().enumerate() {
        assert_eq!(unsafe { slot.read() }, 10_000 + offset as u64);
    }

    for slot in slots.iter().enumerate().skip(1).step_by(2) {
        unsafe { allocator.deallocate(*slot.1, 1).unwrap() };
    }
    for slot in replacements {
        unsafe { allocator.deallocate(slot, 1).unwrap() };
    }

    assert!(allocator.is_idle());
}

#[test]
fn rebinding_sizes_the_budget_for_node_overhead() {
    // A container asked to hold u64 values actually allocates nodes with link overhead.
    // The rebound allocator carves fewer, larger slots from the same per-page budget.
    let element_allocator = PoolAllocator::<u64, 1>::new().unwrap();
    let node_allocator = element_allocator.rebind::<Node>().unwrap();

    assert_eq!(element_allocator.capacity(), 512);
    assert!(node_allocator.capacity() < element_allocator.capacity());
    assert_eq!(node_allocator.pages(), 1);
}

#[test]
fn allocators_with_identical_parameters_are_still_distinct() {
    let first = PoolAllocator::<u64, 1>::new().unwrap();
    let second = PoolAllocator::<u64, 1>::new().unwrap();

    assert_ne!(first, second);
}
