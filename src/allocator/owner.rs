//! Owner scoping - set a tag for a region of code and restore it after

use super::ScopedAllocator;
use crate::memory::LinearMemory;

/// RAII guard that switches the current owner and restores the previous
/// owner on drop.
///
/// Usage:
/// ```ignore
/// {
///     let _guard = OwnerGuard::enter(&allocator, request_id);
///     let buf = allocator.allocate(4096)?;
///     // ...
/// }
/// // previous owner restored here
/// allocator.release_owner(request_id);
/// ```
///
/// The guard does not make the owner thread-local; see the concurrency
/// notes on [`ScopedAllocator`].
#[must_use = "the previous owner is restored when the guard is dropped"]
pub struct OwnerGuard<'a, M: LinearMemory> {
    allocator: &'a ScopedAllocator<M>,
    previous: u32,
}

impl<'a, M: LinearMemory> OwnerGuard<'a, M> {
    #[inline]
    pub fn enter(allocator: &'a ScopedAllocator<M>, owner: u32) -> Self {
        let previous = allocator.set_current_owner(owner);
        Self { allocator, previous }
    }

    /// Owner that will be restored on drop.
    #[inline]
    pub fn previous(&self) -> u32 {
        self.previous
    }
}

impl<M: LinearMemory> Drop for OwnerGuard<'_, M> {
    #[inline]
    fn drop(&mut self) {
        self.allocator.set_current_owner(self.previous);
    }
}
