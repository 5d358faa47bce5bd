//! LIFO scope allocator - bump pointer with saved marks
//!
//! Design: For lifetimes that nest strictly. `push_scope` saves the bump
//! pointer, `pop_scope` restores it and reclaims everything allocated in
//! between. No tags, no registry, no reuse search: allocation and release
//! are both O(1).

use super::growth::ensure_capacity;
use super::stats::{Counters, MemoryStats};
use super::ArenaAllocator;
use crate::config::AllocatorConfig;
use crate::error::{AllocError, Result};
use crate::logging::{
    log_allocation, log_deallocation, log_out_of_memory, log_scope, warn,
};
use crate::memory::LinearMemory;
use parking_lot::Mutex;

pub struct StackAllocator<M: LinearMemory> {
    state: Mutex<StackState<M>>,
    config: AllocatorConfig,
}

struct StackState<M> {
    memory: M,
    bump: usize,
    heap_end: usize,
    marks: Vec<usize>,
    counters: Counters,
}

impl<M: LinearMemory> StackAllocator<M> {
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
        Ok(Self {
            state: Mutex::new(StackState {
                memory,
                bump: config.heap_start,
                heap_end,
                marks: Vec::with_capacity(config.scope_depth),
                counters: Counters::default(),
            }),
            config,
        })
    }

    /// Open a scope. Returns the new nesting depth.
    pub fn push_scope(&self) -> Result<usize> {
        let mut state = self.state.lock();
        if state.marks.len() >= self.config.scope_depth {
            return Err(AllocError::ScopeStackOverflow {
                depth: self.config.scope_depth,
            });
        }

        let mark = state.bump;
        state.marks.push(mark);
        log_scope("scope_push", state.marks.len(), mark);
        Ok(state.marks.len())
    }

    /// Close the innermost scope, returning the bytes reclaimed.
    ///
    /// Popping with no open scope does nothing and returns `None`.
    pub fn pop_scope(&self) -> Option<usize> {
        let mut state = self.state.lock();
        let Some(mark) = state.marks.pop() else {
            warn!("Scope pop with no open scope ignored");
            return None;
        };

        let reclaimed = state.bump - mark;
        state.bump = mark;
        state.counters.record_pop(reclaimed);
        log_scope("scope_pop", state.marks.len(), mark);
        Some(reclaimed)
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.state.lock().marks.len()
    }

    /// Address the next allocation would start at.
    pub fn bump_pointer(&self) -> usize {
        self.state.lock().bump
    }

    pub fn allocate(&self, size: usize) -> Result<usize> {
        let mut state = self.state.lock();
        self.allocate_locked(&mut state, size)
    }

    /// Allocate `new_size` bytes and copy `new_size` bytes from `addr`.
    pub fn reallocate(&self, addr: Option<usize>, new_size: usize) -> Result<usize> {
        let mut state = self.state.lock();
        let new_addr = self.allocate_locked(&mut state, new_size)?;

        if let Some(old) = addr {
            let limit = state.memory.size_bytes();
            let len = new_size.min(limit.saturating_sub(old));
            if len > 0 {
                state.memory.copy(old, new_addr, len);
            }
        }
        Ok(new_addr)
    }

    #[inline]
    pub fn deallocate(&self, addr: usize, size: usize) {
        log_deallocation(addr, size);
    }

    pub fn statistics(&self) -> MemoryStats {
        let state = self.state.lock();
        let address_space = state.heap_end.saturating_sub(self.config.heap_start);
        let in_use = state.bump - self.config.heap_start;
        let c = &state.counters;

        MemoryStats {
            bytes_idle: address_space.saturating_sub(in_use) as u64,
            bytes_in_use: in_use as u64,
            bytes_reclaimed: c.bytes_reclaimed,
            address_space_bytes: address_space as u64,
            registry_overhead_bytes: (state.marks.capacity() * core::mem::size_of::<usize>())
                as u64,
            total_bytes_ever_allocated: c.total_bytes_allocated,
            allocation_count: c.allocation_count,
            free_count: c.free_count,
            region_count: state.marks.len() as u64,
            high_watermark: c.high_watermark as u64,
            oom_count: c.oom_count,
        }
    }

    pub fn read(&self, addr: usize, buf: &mut [u8]) -> Result<()> {
        let state = self.state.lock();
        let end = addr.checked_add(buf.len());
        if addr < self.config.heap_start || end.map_or(true, |e| e > state.heap_end) {
            return Err(AllocError::OutOfBounds {
                addr,
                len: buf.len(),
            });
        }
        state.memory.read(addr, buf);
        Ok(())
    }

    pub fn write(&self, addr: usize, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        let end = addr.checked_add(data.len());
        if addr < self.config.heap_start || end.map_or(true, |e| e > state.heap_end) {
            return Err(AllocError::OutOfBounds {
                addr,
                len: data.len(),
            });
        }
        state.memory.write(addr, data);
        Ok(())
    }

    fn allocate_locked(&self, state: &mut StackState<M>, size: usize) -> Result<usize> {
        let address_space = state.heap_end.saturating_sub(self.config.heap_start);
        let oom = AllocError::OutOfMemory {
            requested: size,
            address_space,
        };

        let Some(end) = self
            .config
            .align(size)
            .and_then(|aligned| state.bump.checked_add(aligned))
        else {
            state.counters.record_oom();
            log_out_of_memory(0, size, state.heap_end);
            return Err(oom);
        };

        if end > state.heap_end {
            let grown = ensure_capacity(&mut state.memory, self.config.growth, end);
            state.heap_end = state.memory.size_bytes();
            if grown.is_err() {
                state.counters.record_oom();
                log_out_of_memory(0, size, state.heap_end);
                return Err(oom);
            }
        }

        let addr = state.bump;
        let aligned = end - addr;
        state.memory.zero(addr, aligned);
        state.bump = end;
        state.counters.record_allocation(aligned);
        state.counters.update_high_watermark(end);
        log_allocation(0, size, addr);
        Ok(addr)
    }
}

impl<M: LinearMemory> ArenaAllocator for StackAllocator<M> {
    #[inline]
    fn allocate(&self, size: usize) -> Result<usize> {
        StackAllocator::allocate(self, size)
    }

    #[inline]
    fn reallocate(&self, addr: Option<usize>, new_size: usize) -> Result<usize> {
        StackAllocator::reallocate(self, addr, new_size)
    }

    #[inline]
    fn deallocate(&self, addr: usize, size: usize) {
        StackAllocator::deallocate(self, addr, size)
    }

    #[inline]
    fn statistics(&self) -> MemoryStats {
        StackAllocator::statistics(self)
    }
}
