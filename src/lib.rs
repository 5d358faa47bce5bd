//! scopealloc - owner-tagged arena allocator for linear memory
//!
//! Built for managed runtimes on platforms that expose memory as one flat,
//! page-granular, grow-only address space (WebAssembly). Allocations are
//! tagged with a caller-chosen owner and reclaimed in bulk by releasing the
//! owner. There is no per-object free and no tracing collector.
//!
//! ```ignore
//! use scopealloc::{AllocatorConfig, ScopedAllocator, SimulatedMemory};
//!
//! let alloc = ScopedAllocator::new(SimulatedMemory::new(65536, 1), AllocatorConfig::default())?;
//! alloc.set_current_owner(7);
//! let buf = alloc.allocate(1 << 20)?;
//! alloc.set_current_owner(0);
//! alloc.release_owner(7);
//! ```

pub mod allocator;
pub mod config;
pub mod error;
pub mod ffi;
pub mod global;
pub mod logging;
pub mod memory;
pub mod registry;

// Re-export core types
pub use allocator::{
    ArenaAllocator, MemoryStats, OwnerGuard, ScopedAllocator, StackAllocator, DEFAULT_OWNER,
};
pub use config::{AllocatorConfig, GrowthPolicy};
pub use error::{AllocError, GrowError, Result};
pub use memory::{LinearMemory, SimulatedMemory};
pub use registry::Region;

/// Initialize logging from `SCOPEALLOC_LOG_*` environment variables.
pub fn init() {
    logging::init();
}
