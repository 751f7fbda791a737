use std::ops::{Index, IndexMut};

use super::ArenaError;

/// Fixed-capacity bump allocator for a single element type.
///
/// All `capacity` slots exist from `init` onward (default-constructed), so a
/// slot may be addressed before it is handed out by `alloc` and filled in
/// place later. Nothing is ever freed or moved.
#[derive(Debug)]
pub struct FixedArena<T> {
    slots: Vec<T>,
    next: usize,
    initialized: bool,
}

impl<T> Default for FixedArena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            next: 0,
            initialized: false,
        }
    }
}

impl<T: Default> FixedArena<T> {
    /// Reserve exactly `count` slots. May be called once.
    pub fn init(&mut self, count: usize) -> Result<(), ArenaError> {
        if self.initialized {
            return Err(ArenaError::AlreadyInitialized {
                capacity: self.slots.len(),
            });
        }
        self.slots.resize_with(count, T::default);
        self.initialized = true;
        Ok(())
    }
}

impl<T> FixedArena<T> {
    /// Hand out the next free slot index.
    ///
    /// Fails once `capacity` slots have been handed out, and always fails
    /// before `init`.
    pub fn alloc(&mut self) -> Result<usize, ArenaError> {
        if self.next >= self.slots.len() {
            return Err(ArenaError::Exhausted {
                capacity: self.slots.len(),
            });
        }
        let idx = self.next;
        self.next += 1;
        Ok(idx)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots handed out so far.
    pub fn allocated(&self) -> usize {
        self.next
    }
}

impl<T> Index<usize> for FixedArena<T> {
    type Output = T;

    fn index(&self, idx: usize) -> &T {
        &self.slots[idx]
    }
}

impl<T> IndexMut<usize> for FixedArena<T> {
    fn index_mut(&mut self, idx: usize) -> &mut T {
        &mut self.slots[idx]
    }
}
