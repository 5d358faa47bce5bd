//! Owner-tagged arena allocator
//!
//! Allocation order of preference:
//! 1. Spare capacity of a region already owned by the current owner
//! 2. A hole left behind by a released owner
//! 3. Fresh space at the bump pointer, growing linear memory if needed
//!
//! Memory is reclaimed only by releasing an owner tag, which removes every
//! region carrying that tag at once.

use super::growth::ensure_capacity;
use super::stats::{Counters, MemoryStats};
use super::ArenaAllocator;
use crate::config::AllocatorConfig;
use crate::error::{AllocError, Result};
use crate::logging::{
    debug, log_allocation, log_deallocation, log_invariant_violation, log_out_of_memory,
    log_region_created, log_release,
};
use crate::memory::LinearMemory;
use crate::registry::{Region, RegionRegistry};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

/// Owner tag used before any `set_current_owner` call.
pub const DEFAULT_OWNER: u32 = 0;

/// Scoped arena allocator over a [`LinearMemory`] driver.
///
/// # Current owner is allocator-wide
///
/// The current-owner cell is shared by every thread using this allocator.
/// It is **not** thread-local. Two threads that each set their own owner and
/// then allocate will race, and allocations can be attributed to the other
/// thread's tag. Callers needing per-thread or per-task scopes must serialize
/// their own set/allocate/release/restore sequences.
///
/// All registry work happens under one lock, held for time proportional to
/// the registry length. Linear memory growth also happens under that lock.
pub struct ScopedAllocator<M: LinearMemory> {
    state: Mutex<State<M>>,
    current_owner: AtomicU32,
    config: AllocatorConfig,
}

struct State<M> {
    memory: M,
    registry: RegionRegistry,
    heap_end: usize,
    counters: Counters,
    poisoned: bool,
}

impl<M: LinearMemory> ScopedAllocator<M> {
    pub fn new(memory: M, config: AllocatorConfig) -> Result<Self> {
        config.validate()?;
        if memory.page_size() != config.page_size {
            return Err(AllocError::Config(format!(
                "driver page size {} does not match configured {}",
                memory.page_size(),
                config.page_size
            )));
        }

        let heap_end = memory.size_bytes();
        debug!(
            heap_start = config.heap_start,
            heap_end,
            registry_capacity = config.registry_capacity,
            "Scoped allocator initialized"
        );

        Ok(Self {
            state: Mutex::new(State {
                memory,
                registry: RegionRegistry::new(config.heap_start, config.registry_capacity),
                heap_end,
                counters: Counters::default(),
                poisoned: false,
            }),
            current_owner: AtomicU32::new(DEFAULT_OWNER),
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    #[inline]
    pub fn heap_start(&self) -> usize {
        self.config.heap_start
    }

    /// Tag attributed to new allocations.
    #[inline]
    pub fn current_owner(&self) -> u32 {
        self.current_owner.load(Ordering::Acquire)
    }

    /// Set the current owner, returning the previous one.
    #[inline]
    pub fn set_current_owner(&self, owner: u32) -> u32 {
        self.current_owner.swap(owner, Ordering::AcqRel)
    }

    /// Run `f` with `owner` as current owner, restoring the previous owner after.
    pub fn with_owner<R>(&self, owner: u32, f: impl FnOnce() -> R) -> R {
        let _guard = super::OwnerGuard::enter(self, owner);
        f()
    }

    /// Allocate `size` zeroed bytes under the current owner.
    pub fn allocate(&self, size: usize) -> Result<usize> {
        let mut state = self.state.lock();
        let owner = self.current_owner();
        self.allocate_locked(&mut state, owner, size)
    }

    /// Allocate `new_size` bytes and copy `new_size` bytes from `addr`.
    ///
    /// Never grows in place. Bytes past the end of the old allocation are
    /// copied as they are. `None` behaves like [`allocate`](Self::allocate).
    pub fn reallocate(&self, addr: Option<usize>, new_size: usize) -> Result<usize> {
        let mut state = self.state.lock();
        let owner = self.current_owner();
        let new_addr = self.allocate_locked(&mut state, owner, new_size)?;

        if let Some(old) = addr {
            let limit = state.memory.size_bytes();
            let len = new_size.min(limit.saturating_sub(old));
            if len > 0 {
                state.memory.copy(old, new_addr, len);
            }
        }
        Ok(new_addr)
    }

    /// Accepted and ignored. Memory is reclaimed only per owner.
    #[inline]
    pub fn deallocate(&self, addr: usize, size: usize) {
        log_deallocation(addr, size);
    }

    /// Reclaim every region owned by `owner`. Returns the reserved bytes freed.
    ///
    /// Releasing a tag that owns nothing does nothing.
    pub fn release_owner(&self, owner: u32) -> usize {
        let mut state = self.state.lock();
        let released = state.registry.release(owner);
        if released.regions == 0 {
            debug!(owner, "Release of owner with no regions");
            return 0;
        }

        state.counters.record_release(&released);
        debug_assert!(state.registry.check_invariants().is_ok());
        log_release(owner, released.regions, released.bytes, released.used);
        released.bytes
    }

    pub fn statistics(&self) -> MemoryStats {
        let state = self.state.lock();
        let address_space = state.heap_end.saturating_sub(self.config.heap_start);
        let in_use = state.registry.live_bytes();
        let c = &state.counters;

        MemoryStats {
            bytes_idle: address_space.saturating_sub(in_use) as u64,
            bytes_in_use: in_use as u64,
            bytes_reclaimed: c.bytes_reclaimed,
            address_space_bytes: address_space as u64,
            registry_overhead_bytes: state.registry.overhead_bytes() as u64,
            total_bytes_ever_allocated: c.total_bytes_allocated,
            allocation_count: c.allocation_count,
            free_count: c.free_count,
            region_count: state.registry.len() as u64,
            high_watermark: c.high_watermark as u64,
            oom_count: c.oom_count,
        }
    }

    /// Snapshot of the live regions in address order.
    pub fn regions(&self) -> Vec<Region> {
        self.state.lock().registry.iter().copied().collect()
    }

    pub fn region_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    /// Owner of the region containing `addr`.
    pub fn owner_of(&self, addr: usize) -> Option<u32> {
        self.state.lock().registry.region_of(addr).map(|r| r.owner)
    }

    /// Whether an invariant violation has disabled allocation.
    pub fn is_poisoned(&self) -> bool {
        self.state.lock().poisoned
    }

    /// Audit the registry.
    pub fn check_invariants(&self) -> Result<()> {
        self.state.lock().registry.check_invariants()
    }

    /// Copy `buf.len()` bytes starting at `addr` out of the heap.
    pub fn read(&self, addr: usize, buf: &mut [u8]) -> Result<()> {
        let state = self.state.lock();
        self.check_bounds(&state, addr, buf.len())?;
        state.memory.read(addr, buf);
        Ok(())
    }

    /// Copy `data` into the heap at `addr`.
    pub fn write(&self, addr: usize, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        self.check_bounds(&state, addr, data.len())?;
        state.memory.write(addr, data);
        Ok(())
    }

    /// Inspect the driver.
    pub fn with_memory<R>(&self, f: impl FnOnce(&M) -> R) -> R {
        f(&self.state.lock().memory)
    }

    fn check_bounds(&self, state: &State<M>, addr: usize, len: usize) -> Result<()> {
        let in_heap = addr >= self.config.heap_start
            && addr
                .checked_add(len)
                .is_some_and(|end| end <= state.heap_end);
        if in_heap {
            Ok(())
        } else {
            Err(AllocError::OutOfBounds { addr, len })
        }
    }

    fn allocate_locked(&self, state: &mut State<M>, owner: u32, size: usize) -> Result<usize> {
        if state.poisoned {
            return Err(AllocError::Poisoned);
        }

        let result = self
            .config
            .align(size)
            .ok_or_else(|| state.out_of_memory(&self.config, size))
            .and_then(|aligned| state.allocate(&self.config, owner, aligned));

        match result {
            Ok(addr) => {
                log_allocation(owner, size, addr);
                Ok(addr)
            }
            Err(err @ AllocError::OutOfMemory { .. }) => {
                state.counters.record_oom();
                log_out_of_memory(owner, size, state.heap_end);
                Err(err)
            }
            Err(err) => {
                if let AllocError::InvariantViolation(detail) = &err {
                    log_invariant_violation(detail);
                }
                Err(err)
            }
        }
    }
}

impl<M: LinearMemory> State<M> {
    fn out_of_memory(&self, config: &AllocatorConfig, requested: usize) -> AllocError {
        AllocError::OutOfMemory {
            requested,
            address_space: self.heap_end.saturating_sub(config.heap_start),
        }
    }

    /// `size` is already aligned.
    fn allocate(&mut self, config: &AllocatorConfig, owner: u32, size: usize) -> Result<usize> {
        if let Some(index) = self.registry.find_reusable(owner, size) {
            let addr = self.registry.carve(index, size);
            self.memory.zero(addr, size);
            self.counters.record_allocation(size);
            return Ok(addr);
        }

        let reserved = config
            .page_round(size)
            .ok_or_else(|| self.out_of_memory(config, size))?;

        if let Some(gap) = self.registry.find_gap(reserved, self.heap_end) {
            return self.place(gap.index, Region::new(owner, gap.start, reserved, size));
        }

        let start = self.registry.bump_pointer();
        let required_end = start
            .checked_add(reserved)
            .ok_or_else(|| self.out_of_memory(config, size))?;
        if required_end > self.heap_end {
            let grown = ensure_capacity(&mut self.memory, config.growth, required_end);
            // A failed doubling may still have added pages.
            self.heap_end = self.memory.size_bytes();
            if grown.is_err() {
                return Err(self.out_of_memory(config, size));
            }
        }

        let index = self.registry.len();
        self.place(index, Region::new(owner, start, reserved, size))
    }

    fn place(&mut self, index: usize, region: Region) -> Result<usize> {
        debug_assert!(
            self.registry.len() < self.registry.capacity(),
            "region registry full ({} live regions)",
            self.registry.len()
        );
        if self.registry.len() >= self.registry.capacity() {
            self.poisoned = true;
            return Err(AllocError::InvariantViolation(format!(
                "region registry full ({} live regions)",
                self.registry.len()
            )));
        }
        if let Err(err) = self.registry.insert(index, region) {
            self.poisoned = true;
            return Err(err);
        }

        let size = region.used();
        self.memory.zero(region.start, size);
        self.counters.record_allocation(size);
        self.counters.update_high_watermark(region.end);
        debug_assert!(self.registry.check_invariants().is_ok());
        log_region_created(region.owner, region.start, region.reserved());
        Ok(region.start)
    }
}

impl<M: LinearMemory> ArenaAllocator for ScopedAllocator<M> {
    #[inline]
    fn allocate(&self, size: usize) -> Result<usize> {
        ScopedAllocator::allocate(self, size)
    }

    #[inline]
    fn reallocate(&self, addr: Option<usize>, new_size: usize) -> Result<usize> {
        ScopedAllocator::reallocate(self, addr, new_size)
    }

    #[inline]
    fn deallocate(&self, addr: usize, size: usize) {
        ScopedAllocator::deallocate(self, addr, size)
    }

    #[inline]
    fn statistics(&self) -> MemoryStats {
        ScopedAllocator::statistics(self)
    }
}
