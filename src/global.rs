//! Process-wide allocator instance
//!
//! The allocator types carry no global state. Runtimes that need one static
//! allocator (for example behind the C ABI in [`crate::ffi`]) install it
//! here once at startup.

use crate::allocator::ScopedAllocator;
use crate::error::{AllocError, Result};
use crate::logging::info;
use crate::memory::LinearMemory;
use once_cell::sync::OnceCell;

/// Scoped allocator over a type-erased driver.
pub type DynAllocator = ScopedAllocator<Box<dyn LinearMemory>>;

static GLOBAL: OnceCell<DynAllocator> = OnceCell::new();

/// Install the process-wide allocator. Fails if one is already installed.
pub fn install(allocator: DynAllocator) -> Result<&'static DynAllocator> {
    GLOBAL
        .set(allocator)
        .map_err(|_| AllocError::AlreadyInstalled)?;
    let installed = GLOBAL.get().ok_or(AllocError::AlreadyInstalled)?;
    info!(
        heap_start = installed.heap_start(),
        "Process-wide allocator installed"
    );
    Ok(installed)
}

/// The process-wide allocator, if installed.
#[inline]
pub fn get() -> Option<&'static DynAllocator> {
    GLOBAL.get()
}

/// Install an allocator over the module's own linear memory.
#[cfg(target_arch = "wasm32")]
pub fn install_wasm32() -> Result<&'static DynAllocator> {
    use crate::memory::Wasm32Memory;

    let config = Wasm32Memory::config();
    // Sole driver for memory 0 once installed.
    let memory: Box<dyn LinearMemory> = Box::new(unsafe { Wasm32Memory::new() });
    install(ScopedAllocator::new(memory, config)?)
}
