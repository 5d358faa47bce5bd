//! Memory allocators - owner-tagged arenas over linear memory
//!
//! Design: Two modes behind one contract ([`ArenaAllocator`]):
//! 1. Scoped (owner-tagged regions, bulk release per owner, gap reuse)
//! 2. Stack (strictly nested scopes, O(1) push/pop)
//!
//! Every allocation is returned zero-filled. Neither mode frees individual
//! allocations.

mod growth;
mod owner;
mod scoped;
mod stack;
mod stats;


pub use owner::OwnerGuard;
pub use scoped::{ScopedAllocator, DEFAULT_OWNER};
pub use stack::StackAllocator;
pub use stats::MemoryStats;

use crate::error::Result;

/// Common surface of both allocation modes.
///
/// Addresses are offsets into the driver's linear memory.
pub trait ArenaAllocator {
    /// Allocate `size` zero-filled bytes.
    fn allocate(&self, size: usize) -> Result<usize>;

    /// Allocate `new_size` bytes and copy `new_size` bytes from `addr`.
    fn reallocate(&self, addr: Option<usize>, new_size: usize) -> Result<usize>;

    /// Accepted for API compatibility; does nothing.
    fn deallocate(&self, addr: usize, size: usize);

    fn statistics(&self) -> MemoryStats;
}
