//! Region registry - address-ordered record of live regions
//!
//! Every allocator invariant lives here:
//! - regions are sorted by `start`
//! - no two `[start, end)` spans overlap
//! - `start <= watermark <= end` for every region
//!
//! Storage is a capacity-limited vector with linear shift-insert and
//! in-place compaction. Its length tracks live owners rather than
//! allocations, since same-owner requests are packed into existing regions.

use crate::error::{AllocError, Result};

/// A contiguous span of linear memory owned by one tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub owner: u32,
    pub start: usize,
    /// Exclusive end of the reserved span.
    pub end: usize,
    /// Highest handed-out byte (exclusive). Bytes above it are spare.
    pub watermark: usize,
}

impl Region {
    #[inline]
    pub fn new(owner: u32, start: usize, reserved: usize, used: usize) -> Self {
        debug_assert!(used <= reserved, "watermark past region end");
        Self {
            owner,
            start,
            end: start + reserved,
            watermark: start + used,
        }
    }

    /// Bytes available for same-owner requests.
    #[inline]
    pub fn spare(&self) -> usize {
        self.end - self.watermark
    }

    #[inline]
    pub fn reserved(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn used(&self) -> usize {
        self.watermark - self.start
    }

    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        self.start <= addr && addr < self.end
    }

    #[inline]
    pub fn overlaps(&self, other: &Region) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Insertion point for a new region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub index: usize,
    pub start: usize,
}

/// Totals from a bulk release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Released {
    /// Reserved bytes returned to the gap pool.
    pub bytes: usize,
    /// Handed-out bytes within the released regions.
    pub used: usize,
    pub regions: usize,
}

pub struct RegionRegistry {
    regions: Vec<Region>,
    capacity: usize,
    heap_start: usize,
}

impl RegionRegistry {
    const INITIAL_SLOTS: usize = 64;

    pub fn new(heap_start: usize, capacity: usize) -> Self {
        Self {
            regions: Vec::with_capacity(capacity.min(Self::INITIAL_SLOTS)),
            capacity,
            heap_start,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn heap_start(&self) -> usize {
        self.heap_start
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Region> {
        self.regions.get(index)
    }

    /// Address where the next appended region would start.
    #[inline]
    pub fn bump_pointer(&self) -> usize {
        self.regions.last().map_or(self.heap_start, |r| r.end)
    }

    /// First region (address order) owned by `owner` with `size` spare bytes.
    pub fn find_reusable(&self, owner: u32, size: usize) -> Option<usize> {
        self.regions
            .iter()
            .position(|r| r.owner == owner && r.spare() >= size)
    }

    /// First hole below the bump pointer that fits `size` bytes.
    ///
    /// `size` should already be page-rounded. An empty registry fits when
    /// the managed space up to `heap_end` is large enough.
    pub fn find_gap(&self, size: usize, heap_end: usize) -> Option<Gap> {
        let Some(first) = self.regions.first() else {
            return (heap_end.saturating_sub(self.heap_start) >= size).then_some(Gap {
                index: 0,
                start: self.heap_start,
            });
        };

        if first.start - self.heap_start >= size {
            return Some(Gap {
                index: 0,
                start: self.heap_start,
            });
        }

        self.regions
            .windows(2)
            .position(|pair| pair[1].start - pair[0].end >= size)
            .map(|i| Gap {
                index: i + 1,
                start: self.regions[i].end,
            })
    }

    /// Insert `region` at `index`, shifting later entries up.
    pub fn insert(&mut self, index: usize, region: Region) -> Result<()> {
        if self.regions.len() >= self.capacity {
            return Err(AllocError::InvariantViolation(format!(
                "region registry full ({} entries)",
                self.capacity
            )));
        }
        if index > self.regions.len() {
            return Err(AllocError::InvariantViolation(format!(
                "insertion index {} past registry length {}",
                index,
                self.regions.len()
            )));
        }

        let lower = match index {
            0 => self.heap_start,
            i => self.regions[i - 1].end,
        };
        let upper = self.regions.get(index).map_or(usize::MAX, |r| r.start);
        if region.start < lower || region.end > upper || region.start > region.end {
            return Err(AllocError::InvariantViolation(format!(
                "region [{:#x}, {:#x}) overlaps neighbours at index {}",
                region.start, region.end, index
            )));
        }

        self.regions.insert(index, region);
        Ok(())
    }

    /// Hand out `size` spare bytes of the region at `index`.
    ///
    /// Returns the carved address. Caller must have checked spare capacity.
    pub fn carve(&mut self, index: usize, size: usize) -> usize {
        let region = &mut self.regions[index];
        debug_assert!(region.spare() >= size, "carving past region end");
        let addr = region.watermark;
        region.watermark += size;
        addr
    }

    /// Remove every region owned by `owner`, preserving survivor order.
    pub fn release(&mut self, owner: u32) -> Released {
        let mut released = Released::default();
        self.regions.retain(|r| {
            if r.owner == owner {
                released.bytes += r.reserved();
                released.used += r.used();
                released.regions += 1;
                false
            } else {
                true
            }
        });
        released
    }

    /// Σ handed-out bytes over live regions.
    pub fn live_bytes(&self) -> usize {
        self.regions.iter().map(Region::used).sum()
    }

    /// Σ reserved bytes over live regions.
    pub fn reserved_bytes(&self) -> usize {
        self.regions.iter().map(Region::reserved).sum()
    }

    /// Bookkeeping cost of the registry itself.
    pub fn overhead_bytes(&self) -> usize {
        self.regions.capacity() * core::mem::size_of::<Region>()
            + core::mem::size_of::<Self>()
    }

    /// Region containing `addr`, if any.
    pub fn region_of(&self, addr: usize) -> Option<&Region> {
        let idx = self.regions.partition_point(|r| r.end <= addr);
        self.regions.get(idx).filter(|r| r.contains(addr))
    }

    /// Full audit of ordering, bounds, and non-overlap.
    pub fn check_invariants(&self) -> Result<()> {
        let mut floor = self.heap_start;
        for (i, r) in self.regions.iter().enumerate() {
            if r.start < floor {
                return Err(AllocError::InvariantViolation(format!(
                    "region {} starts at {:#x} below {:#x}",
                    i, r.start, floor
                )));
            }
            if !(r.start <= r.watermark && r.watermark <= r.end) {
                return Err(AllocError::InvariantViolation(format!(
                    "region {} watermark {:#x} outside [{:#x}, {:#x}]",
                    i, r.watermark, r.start, r.end
                )));
            }
            floor = r.end;
        }
        Ok(())
    }
}
