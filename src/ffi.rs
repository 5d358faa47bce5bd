//! C FFI - stable ABI for the managed runtime
//!
//! Design: Thin wrappers over the process-wide allocator in [`crate::global`]:
//! 1. Allocation (alloc, realloc, free)
//! 2. Owner control (set, get, release)
//! 3. Statistics
//!
//! Errors are reported as address 0. Calls made before an allocator is
//! installed fail the same way, or return zeroed statistics.

use crate::allocator::MemoryStats;
use crate::global;
use crate::logging::warn;

/// Allocate `size` zeroed bytes under the current owner. Returns 0 on failure.
#[no_mangle]
pub extern "C" fn scopealloc_alloc(size: usize) -> usize {
    let Some(allocator) = global::get() else {
        warn!("scopealloc_alloc called before install");
        return 0;
    };
    allocator.allocate(size).unwrap_or(0)
}

/// Reallocate; `addr == 0` behaves like [`scopealloc_alloc`].
#[no_mangle]
pub extern "C" fn scopealloc_realloc(addr: usize, size: usize) -> usize {
    let Some(allocator) = global::get() else {
        return 0;
    };
    let old = (addr != 0).then_some(addr);
    allocator.reallocate(old, size).unwrap_or(0)
}

/// Accepted and ignored.
#[no_mangle]
pub extern "C" fn scopealloc_free(addr: usize, size: usize) {
    if let Some(allocator) = global::get() {
        allocator.deallocate(addr, size);
    }
}

#[no_mangle]
pub extern "C" fn scopealloc_set_owner(owner: u32) {
    if let Some(allocator) = global::get() {
        allocator.set_current_owner(owner);
    }
}

#[no_mangle]
pub extern "C" fn scopealloc_get_owner() -> u32 {
    global::get().map_or(0, |a| a.current_owner())
}

/// Release every region of `owner`. Returns reclaimed bytes.
#[no_mangle]
pub extern "C" fn scopealloc_release_owner(owner: u32) -> usize {
    global::get().map_or(0, |a| a.release_owner(owner))
}

/// Write current statistics to `out`. A null `out` is ignored.
///
/// # Safety
///
/// `out` must be null or valid for writing one `MemoryStats`.
#[no_mangle]
pub unsafe extern "C" fn scopealloc_read_stats(out: *mut MemoryStats) {
    if out.is_null() {
        return;
    }
    let stats = global::get().map(|a| a.statistics()).unwrap_or_default();
    out.write(stats);
}

/// Install the allocator over this module's linear memory.
///
/// Returns 0 on success, -1 if already installed or misconfigured.
#[cfg(target_arch = "wasm32")]
#[no_mangle]
pub extern "C" fn scopealloc_init() -> i32 {
    match global::install_wasm32() {
        Ok(_) => 0,
        Err(err) => {
            warn!(error = %err, "scopealloc_init failed");
            -1
        }
    }
}
