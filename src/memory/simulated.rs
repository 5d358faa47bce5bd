//! Heap-backed linear memory
//!
//! Mirrors the WebAssembly model on a host: one contiguous byte vector
//! that only grows, in whole pages, up to a ceiling. The default ceiling
//! is the 4 GiB address space of a 32-bit WebAssembly memory.

use super::LinearMemory;
use crate::error::GrowError;

pub struct SimulatedMemory {
    bytes: Vec<u8>,
    page_size: usize,
    max_pages: Option<usize>,
    grow_calls: usize,
}

impl SimulatedMemory {
    /// Memory starting at `initial_pages`, capped at 4 GiB.
    pub fn new(page_size: usize, initial_pages: usize) -> Self {
        debug_assert!(page_size.is_power_of_two(), "page size must be power of 2");
        Self {
            bytes: vec![0; page_size * initial_pages],
            page_size,
            max_pages: (u32::MAX as usize / page_size).checked_add(1),
            grow_calls: 0,
        }
    }

    /// Cap the memory at `max_pages` pages in total.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Memory that refuses every growth request.
    pub fn fixed(page_size: usize, pages: usize) -> Self {
        Self::new(page_size, pages).with_max_pages(pages)
    }

    /// Number of successful and failed `grow` calls so far.
    pub fn grow_calls(&self) -> usize {
        self.grow_calls
    }
}

impl LinearMemory for SimulatedMemory {
    #[inline]
    fn page_size(&self) -> usize {
        self.page_size
    }

    #[inline]
    fn page_count(&self) -> usize {
        self.bytes.len() / self.page_size
    }

    #[inline]
    fn max_pages(&self) -> Option<usize> {
        self.max_pages
    }

    fn grow(&mut self, additional_pages: usize) -> Result<usize, GrowError> {
        self.grow_calls += 1;
        let current = self.page_count();

        let target = current
            .checked_add(additional_pages)
            .ok_or(GrowError::Rejected {
                requested: additional_pages,
            })?;
        if let Some(limit) = self.max_pages {
            if target > limit {
                return Err(GrowError::LimitReached {
                    current,
                    requested: additional_pages,
                    limit,
                });
            }
        }

        let new_len = target
            .checked_mul(self.page_size)
            .ok_or(GrowError::Rejected {
                requested: additional_pages,
            })?;
        self.bytes
            .try_reserve_exact(new_len - self.bytes.len())
            .map_err(|_| GrowError::Rejected {
                requested: additional_pages,
            })?;
        self.bytes.resize(new_len, 0);
        Ok(current)
    }

    fn zero(&mut self, addr: usize, len: usize) {
        self.bytes[addr..addr + len].fill(0);
    }

    fn copy(&mut self, src: usize, dst: usize, len: usize) {
        self.bytes.copy_within(src..src + len, dst);
    }

    fn read(&self, addr: usize, buf: &mut [u8]) {
        buf.copy_from_slice(&self.bytes[addr..addr + buf.len()]);
    }

    fn write(&mut self, addr: usize, data: &[u8]) {
        self.bytes[addr..addr + data.len()].copy_from_slice(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: usize = 4096;

    #[test]
    fn grow_returns_previous_size() {
        let mut mem = SimulatedMemory::new(PAGE, 2);
        assert_eq!(mem.grow(3), Ok(2));
        assert_eq!(mem.page_count(), 5);
        assert_eq!(mem.size_bytes(), 5 * PAGE);
        assert_eq!(mem.grow_calls(), 1);
    }

    #[test]
    fn ceiling_rejects_growth() {
        let mut mem = SimulatedMemory::new(PAGE, 1).with_max_pages(2);
        assert!(mem.grow(1).is_ok());
        assert_eq!(
            mem.grow(1),
            Err(GrowError::LimitReached {
                current: 2,
                requested: 1,
                limit: 2
            })
        );
        assert_eq!(mem.page_count(), 2);
    }

    #[test]
    fn default_ceiling_is_four_gib() {
        let mem = SimulatedMemory::new(65536, 1);
        assert_eq!(mem.max_pages(), Some(65536));
        assert_eq!(SimulatedMemory::fixed(PAGE, 3).max_pages(), Some(3));
    }

    #[test]
    fn growth_past_default_ceiling_is_refused() {
        let mut mem = SimulatedMemory::new(65536, 1);
        assert!(matches!(
            mem.grow(65536),
            Err(GrowError::LimitReached { limit: 65536, .. })
        ));
        assert_eq!(mem.page_count(), 1);
    }

    #[test]
    fn fixed_memory_never_grows() {
        let mut mem = SimulatedMemory::fixed(PAGE, 1);
        assert!(mem.grow(1).is_err());
        assert_eq!(mem.page_count(), 1);
    }

    #[test]
    fn byte_access_round_trips() {
        let mut mem = SimulatedMemory::new(PAGE, 1);
        mem.write(10, &[1, 2, 3, 4]);
        mem.copy(10, 100, 4);

        let mut buf = [0u8; 4];
        mem.read(100, &mut buf);
        assert_eq!(buf, [1, 2, 3, 4]);

        mem.zero(10, 4);
        mem.read(10, &mut buf);
        assert_eq!(buf, [0; 4]);
    }
}
