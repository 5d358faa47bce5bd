//! Allocation statistics for monitoring and debugging.

use crate::registry::Released;
use serde::Serialize;

/// Snapshot of allocator usage.
///
/// `#[repr(C)]` so the managed runtime can read it through the C ABI.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    /// Managed address space not currently handed out.
    pub bytes_idle: u64,
    /// Handed-out bytes that have not been released.
    pub bytes_in_use: u64,
    /// Reserved bytes returned by releases, cumulative.
    pub bytes_reclaimed: u64,
    /// Size of the managed address space. Never decreases.
    pub address_space_bytes: u64,
    /// Memory spent on allocator bookkeeping.
    pub registry_overhead_bytes: u64,
    pub total_bytes_ever_allocated: u64,
    /// Successful allocation calls.
    pub allocation_count: u64,
    /// Regions removed by releases (scope pops in LIFO mode).
    pub free_count: u64,
    /// Live regions (open scopes in LIFO mode).
    pub region_count: u64,
    /// Highest address ever bump-allocated.
    pub high_watermark: u64,
    /// Allocation requests that failed with out-of-memory.
    pub oom_count: u64,
}

impl MemoryStats {
    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        let mib = |b: u64| b as f64 / (1024.0 * 1024.0);
        format!(
            "{:.2} MiB in use of {:.2} MiB, {:.2} MiB reclaimed, {} allocations, \
             {} frees, {} regions, {} OOMs",
            mib(self.bytes_in_use),
            mib(self.address_space_bytes),
            mib(self.bytes_reclaimed),
            self.allocation_count,
            self.free_count,
            self.region_count,
            self.oom_count,
        )
    }
}

/// Monotonic counters kept under the allocator lock.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Counters {
    pub total_bytes_allocated: u64,
    pub allocation_count: u64,
    pub bytes_reclaimed: u64,
    pub free_count: u64,
    pub oom_count: u64,
    pub high_watermark: usize,
}

impl Counters {
    #[inline]
    pub(crate) fn record_allocation(&mut self, size: usize) {
        self.allocation_count += 1;
        self.total_bytes_allocated += size as u64;
    }

    #[inline]
    pub(crate) fn record_oom(&mut self) {
        self.oom_count += 1;
    }

    pub(crate) fn record_release(&mut self, released: &Released) {
        self.bytes_reclaimed += released.bytes as u64;
        self.free_count += released.regions as u64;
    }

    pub(crate) fn record_pop(&mut self, reclaimed: usize) {
        self.bytes_reclaimed += reclaimed as u64;
        self.free_count += 1;
    }

    #[inline]
    pub(crate) fn update_high_watermark(&mut self, addr: usize) {
        self.high_watermark = self.high_watermark.max(addr);
    }
}
