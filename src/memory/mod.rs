//! Linear memory drivers - page-granular, grow-only address spaces
//!
//! Design: The allocator only needs to ask how many pages exist and to add
//! more. Addresses are plain offsets into the linear space, so the driver
//! also owns byte access (zeroing, copying, reading, writing).
//!
//! Drivers:
//! - [`SimulatedMemory`]: heap-backed, optional page ceiling (hosts, tests)
//! - [`Wasm32Memory`]: the real WebAssembly memory (wasm32 only)

mod simulated;
#[cfg(target_arch = "wasm32")]
mod wasm;

pub use simulated::SimulatedMemory;
#[cfg(target_arch = "wasm32")]
pub use wasm::Wasm32Memory;

use crate::error::GrowError;

/// A flat address space extended in whole pages.
///
/// Implementations are not required to be reentrant; the allocators call
/// them only while holding their own lock.
///
/// Byte operations receive ranges that lie inside `[0, size_bytes())`.
/// Drivers may panic on out-of-range access.
pub trait LinearMemory: Send {
    /// Page size in bytes.
    fn page_size(&self) -> usize;

    /// Current size in pages.
    fn page_count(&self) -> usize;

    /// Extend by `additional_pages`, returning the previous page count.
    fn grow(&mut self, additional_pages: usize) -> Result<usize, GrowError>;

    /// Largest page count this memory can ever reach, if known.
    ///
    /// Growth toward a size above it is refused without calling `grow`.
    #[inline]
    fn max_pages(&self) -> Option<usize> {
        None
    }

    /// Current size in bytes.
    #[inline]
    fn size_bytes(&self) -> usize {
        self.page_count() * self.page_size()
    }

    /// Fill `[addr, addr + len)` with zeroes.
    fn zero(&mut self, addr: usize, len: usize);

    /// Copy `len` bytes from `src` to `dst`. Ranges may overlap.
    fn copy(&mut self, src: usize, dst: usize, len: usize);

    fn read(&self, addr: usize, buf: &mut [u8]);

    fn write(&mut self, addr: usize, data: &[u8]);
}

impl<M: LinearMemory + ?Sized> LinearMemory for Box<M> {
    #[inline]
    fn page_size(&self) -> usize {
        (**self).page_size()
    }

    #[inline]
    fn page_count(&self) -> usize {
        (**self).page_count()
    }

    #[inline]
    fn grow(&mut self, additional_pages: usize) -> Result<usize, GrowError> {
        (**self).grow(additional_pages)
    }

    #[inline]
    fn max_pages(&self) -> Option<usize> {
        (**self).max_pages()
    }

    #[inline]
    fn zero(&mut self, addr: usize, len: usize) {
        (**self).zero(addr, len)
    }

    #[inline]
    fn copy(&mut self, src: usize, dst: usize, len: usize) {
        (**self).copy(src, dst, len)
    }

    #[inline]
    fn read(&self, addr: usize, buf: &mut [u8]) {
        (**self).read(addr, buf)
    }

    #[inline]
    fn write(&mut self, addr: usize, data: &[u8]) {
        (**self).write(addr, data)
    }
}
