//! WebAssembly linear memory (memory index 0)

use super::LinearMemory;
use crate::config::{AllocatorConfig, WASM_PAGE_SIZE};
use crate::error::GrowError;
use core::arch::wasm32;

extern "C" {
    /// First address past static data, provided by the linker.
    static __heap_base: u8;
}

const MEMORY_INDEX: u32 = 0;

pub struct Wasm32Memory {
    _private: (),
}

impl Wasm32Memory {
    /// # Safety
    ///
    /// At most one driver may manage memory 0, and nothing else may write
    /// above `__heap_base`.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }

    pub fn heap_base() -> usize {
        unsafe { core::ptr::addr_of!(__heap_base) as usize }
    }

    /// Default config with the heap starting at `__heap_base`.
    pub fn config() -> AllocatorConfig {
        let mut config = AllocatorConfig::default();
        let mask = config.alignment - 1;
        config.heap_start = (Self::heap_base() + mask) & !mask;
        config
    }
}

impl LinearMemory for Wasm32Memory {
    #[inline]
    fn page_size(&self) -> usize {
        WASM_PAGE_SIZE
    }

    #[inline]
    fn page_count(&self) -> usize {
        wasm32::memory_size(MEMORY_INDEX)
    }

    /// 32-bit memories top out at 4 GiB.
    #[inline]
    fn max_pages(&self) -> Option<usize> {
        Some(usize::MAX / WASM_PAGE_SIZE + 1)
    }

    fn grow(&mut self, additional_pages: usize) -> Result<usize, GrowError> {
        match wasm32::memory_grow(MEMORY_INDEX, additional_pages) {
            usize::MAX => Err(GrowError::Rejected {
                requested: additional_pages,
            }),
            previous => Ok(previous),
        }
    }

    fn zero(&mut self, addr: usize, len: usize) {
        unsafe { core::ptr::write_bytes(addr as *mut u8, 0, len) }
    }

    fn copy(&mut self, src: usize, dst: usize, len: usize) {
        unsafe { core::ptr::copy(src as *const u8, dst as *mut u8, len) }
    }

    fn read(&self, addr: usize, buf: &mut [u8]) {
        unsafe { core::ptr::copy_nonoverlapping(addr as *const u8, buf.as_mut_ptr(), buf.len()) }
    }

    fn write(&mut self, addr: usize, data: &[u8]) {
        unsafe { core::ptr::copy_nonoverlapping(data.as_ptr(), addr as *mut u8, data.len()) }
    }
}
