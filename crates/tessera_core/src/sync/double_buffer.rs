//! # Double Buffer
//!
//! Two arenas and an index saying which one is being filled.
//!
//! ```text
//! Frame N:
//!   build  → writes Arena A (current)
//!   submit → swap, then drain Arena A (other) into the live stores
//!
//! Frame N+1:
//!   build  → writes Arena B (current)
//!   submit → swap, then drain Arena B
//! ```
//!
//! Anything written to the current arena stays invisible to readers of the
//! live stores until the swap that follows it.

/// Pair of buffers with an explicit swap.
#[derive(Debug, Default)]
pub struct DoubleBuffer<T> {
    buffers: [T; 2],
    current: usize,
    swap_count: usize,
}

impl<T> DoubleBuffer<T> {
    /// Creates a double buffer from its two arenas. `first` starts as current.
    #[must_use]
    pub fn new(first: T, second: T) -> Self {
        Self {
            buffers: [first, second],
            current: 0,
            swap_count: 0,
        }
    }

    /// The arena being written.
    #[inline]
    #[must_use]
    pub fn current(&self) -> &T {
        &self.buffers[self.current]
    }

    /// The arena being written, mutably.
    #[inline]
    pub fn current_mut(&mut self) -> &mut T {
        &mut self.buffers[self.current]
    }

    /// The arena not being written.
    #[inline]
    #[must_use]
    pub fn other(&self) -> &T {
        &self.buffers[self.current ^ 1]
    }

    /// The arena not being written, mutably.
    #[inline]
    pub fn other_mut(&mut self) -> &mut T {
        &mut self.buffers[self.current ^ 1]
    }

    /// Both arenas, current first.
    #[inline]
    pub fn both_mut(&mut self) -> (&mut T, &mut T) {
        let [first, second] = &mut self.buffers;
        if self.current == 0 {
            (first, second)
        } else {
            (second, first)
        }
    }

    /// Exchanges the roles of the two arenas.
    #[inline]
    pub fn swap(&mut self) {
        self.current ^= 1;
        self.swap_count += 1;
    }

    /// Number of swaps performed so far.
    #[inline]
    #[must_use]
    pub fn swap_count(&self) -> usize {
        self.swap_count
    }
}
