//! Sliding Buffer Implementation

use std::collections::VecDeque;

/// Default depth (4 frames of history)
pub const DEFAULT_DEPTH: usize = 4;

/// Fixed-depth buffer, newest entry at the front.
///
/// `len()` always equals the depth it was created with.
#[derive(Debug, Clone, PartialEq)]
pub struct SlidingBuffer<T> {
    /// Entries, index 0 is the most recent
    entries: VecDeque<T>,
    /// Fixed depth
    depth: usize,
}

impl<T: Default> SlidingBuffer<T> {
    /// Create a buffer of `depth` default entries
    pub fn new(depth: usize) -> Self {
        assert!(depth > 0, "Depth must be > 0");
        Self {
            entries: (0..depth).map(|_| T::default()).collect(),
            depth,
        }
    }

    /// Create a buffer with the default depth (4)
    pub fn with_default_depth() -> Self {
        Self::new(DEFAULT_DEPTH)
    }

    /// Refill with default entries
    pub fn clear(&mut self) {
        self.entries.iter_mut().for_each(|e| *e = T::default());
    }
}

impl<T> SlidingBuffer<T> {
    /// Insert at the front and return the evicted oldest entry
    pub fn push(&mut self, entry: T) -> Option<T> {
        self.entries.push_front(entry);
        debug_assert_eq!(self.entries.len(), self.depth + 1);
        self.entries.pop_back()
    }

    /// Number of entries (always the depth)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true; present for API symmetry with std collections
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Most recent entry
    pub fn newest(&self) -> &T {
        &self.entries[0]
    }

    /// Entry by age, 0 = newest
    pub fn get(&self, age: usize) -> Option<&T> {
        self.entries.get(age)
    }

    /// Iterate newest to oldest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

impl<T: Default> Default for SlidingBuffer<T> {
    fn default() -> Self {
        Self::with_default_depth()
    }
}
