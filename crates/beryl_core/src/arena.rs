//! Arena allocation for syntax trees.
//!
//! Every node produced by one parse is allocated from a bump arena and
//! freed in one shot when the parse result is dropped.

use bumpalo::Bump;

/// The compiler arena wraps a bump allocator for all tree allocations
/// belonging to a single parse.
pub struct CompilerArena {
    bump: Bump,
}

impl CompilerArena {
    /// Create a new compiler arena with default capacity.
    pub fn new() -> Self {
        Self { bump: Bump::new() }
    }

    /// Create a new compiler arena with the specified initial capacity in bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bump: Bump::with_capacity(capacity),
        }
    }

    /// Get a reference to the underlying bump allocator.
    #[inline]
    pub fn bump(&self) -> &Bump {
        &self.bump
    }

    /// Allocate a value in the arena and return a reference to it.
    #[inline]
    pub fn alloc<T>(&self, val: T) -> &T {
        self.bump.alloc(val)
    }

    /// Allocate a slice of `Copy` values in the arena.
    #[inline]
    pub fn alloc_slice_copy<T: Copy>(&self, src: &[T]) -> &[T] {
        self.bump.alloc_slice_copy(src)
    }

    /// Returns the total bytes allocated in this arena.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }
}

impl Default for CompilerArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_read_back() {
        let arena = CompilerArena::new();
        let v = arena.alloc(42u64);
        assert_eq!(*v, 42);
        let s = arena.alloc_slice_copy(&[1u32, 2, 3]);
        assert_eq!(s, &[1, 2, 3]);
        assert!(arena.allocated_bytes() > 0);
    }
}
