use std::num::NonZero;

use new_zealand::nz;
use num_integer::Integer;

/// Capacity of each bookkeeping chunk.
///
/// Bookkeeping storage grows in fixed-size chunks so that appending a record never moves the
/// records already stored, and so that the cost of growing the bookkeeping itself is amortized
/// over many appends.
pub(crate) const CHUNK_CAPACITY: NonZero<usize> = nz!(255);

/// Append-only storage made of fixed-capacity chunks.
///
/// Records are addressed by a flat index that is stable for the lifetime of the arena. Chunks
/// are appended as needed and never freed before the arena itself is dropped; the arena never
/// shrinks.
#[derive(Debug)]
pub(crate) struct ChunkedArena<T> {
    chunks: Vec<Vec<T>>,
}

impl<T> ChunkedArena<T> {
    pub(crate) fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    /// The total number of records stored.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated into infinite growth of the arena.
    pub(crate) fn len(&self) -> usize {
        // Every chunk except the last is full.
        let full_chunks = self.chunks.len().saturating_sub(1);

        // Cannot overflow: the arena cannot hold more records than virtual memory can fit.
        full_chunks
            .wrapping_mul(CHUNK_CAPACITY.get())
            .wrapping_add(self.chunks.last().map_or(0, Vec::len))
    }

    /// The number of chunks backing the arena.
    #[must_use]
    pub(crate) fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Appends a record and returns its index.
    pub(crate) fn push(&mut self, value: T) -> usize {
        let index = self.len();

        if self
            .chunks
            .last()
            .is_none_or(|chunk| chunk.len() == CHUNK_CAPACITY.get())
        {
            self.chunks.push(Vec::with_capacity(CHUNK_CAPACITY.get()));
        }

        self.chunks
            .last_mut()
            .expect("we just ensured a chunk with spare capacity exists")
            .push(value);

        index
    }

    /// # Panics
    ///
    /// Panics if no record exists at the given index.
    #[must_use]
    pub(crate) fn get(&self, index: usize) -> &T {
        let (chunk_index, offset) = index.div_rem(&CHUNK_CAPACITY.get());

        self.chunks
            .get(chunk_index)
            .and_then(|chunk| chunk.get(offset))
            .expect("arena indices are only ever produced by push(), so they must be valid")
    }

    /// # Panics
    ///
    /// Panics if no record exists at the given index.
    #[must_use]
    pub(crate) fn get_mut(&mut self, index: usize) -> &mut T {
        let (chunk_index, offset) = index.div_rem(&CHUNK_CAPACITY.get());

        self.chunks
            .get_mut(chunk_index)
            .and_then(|chunk| chunk.get_mut(offset))
            .expect("arena indices are only ever produced by push(), so they must be valid")
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        self.chunks.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_returns_sequential_indexes() {
        let mut arena = ChunkedArena::new();

        for expected in 0..10 {
            assert_eq!(arena.push(expected), expected);
        }

        assert_eq!(arena.len(), 10);
        assert_eq!(arena.chunk_count(), 1);
    }

    #[test]
    fn records_are_readable_across_chunk_boundaries() {
        let mut arena = ChunkedArena::new();

        let count = CHUNK_CAPACITY.get() * 2 + 1;

        for value in 0..count {
            arena.push(value);
        }

        assert_eq!(arena.len(), count);
        assert_eq!(arena.chunk_count(), 3);

        for index in 0..count {
            assert_eq!(*arena.get(index), index);
        }
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut arena = ChunkedArena::new();

        let index = arena.push(1_u32);
        *arena.get_mut(index) = 2;

        assert_eq!(*arena.get(index), 2);
    }

    #[test]
    fn new_chunk_appended_only_when_current_is_full() {
        let mut arena = ChunkedArena::new();

        for value in 0..CHUNK_CAPACITY.get() {
            arena.push(value);
        }

        assert_eq!(arena.chunk_count(), 1);

        arena.push(usize::MAX);

        assert_eq!(arena.chunk_count(), 2);
    }

    #[test]
    fn iter_visits_all_records_in_order() {
        let mut arena = ChunkedArena::new();

        let count = CHUNK_CAPACITY.get() + 5;

        for value in 0..count {
            arena.push(value);
        }

        let collected: Vec<usize> = arena.iter().copied().collect();

        assert_eq!(collected, (0..count).collect::<Vec<_>>());
    }

    #[test]
    #[should_panic]
    fn get_out_of_bounds_panics() {
        let arena = ChunkedArena::<u32>::new();

        _ = arena.get(0);
    }
}
