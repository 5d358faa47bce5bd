//! Growth protocol - extend linear memory in whole pages
//!
//! Memory only grows, never shrinks. With the doubling policy the number
//! of driver calls is logarithmic in the final size. A rejected doubling
//! falls back to the exact page shortfall before giving up, so a driver
//! with a hard ceiling is used up to that ceiling. A target past the
//! driver's ceiling is refused before any page is added.

use crate::config::GrowthPolicy;
use crate::error::GrowError;
use crate::logging::log_growth;
use crate::memory::LinearMemory;

/// Grow `memory` until it spans at least `required_end` bytes.
///
/// Returns the new size in bytes.
pub(crate) fn ensure_capacity<M: LinearMemory + ?Sized>(
    memory: &mut M,
    policy: GrowthPolicy,
    required_end: usize,
) -> Result<usize, GrowError> {
    let page_size = memory.page_size();

    if let Some(limit) = memory.max_pages() {
        let needed = required_end.div_ceil(page_size);
        if needed > limit {
            let current = memory.page_count();
            return Err(GrowError::LimitReached {
                current,
                requested: needed.saturating_sub(current),
                limit,
            });
        }
    }

    loop {
        let current = memory.page_count();
        let size = current.saturating_mul(page_size);
        if size >= required_end {
            return Ok(size);
        }

        let shortfall = (required_end - size).div_ceil(page_size);
        let pages = match policy {
            GrowthPolicy::Doubling => current.max(1),
            GrowthPolicy::ExactNeed => shortfall,
        };

        match memory.grow(pages) {
            Ok(previous) => log_growth(previous, pages, page_size),
            Err(_) if pages > shortfall => {
                let previous = memory.grow(shortfall)?;
                log_growth(previous, shortfall, page_size);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::SimulatedMemory;

    const PAGE: usize = 1024;

    #[test]
    fn no_growth_when_large_enough() {
        let mut mem = SimulatedMemory::new(PAGE, 4);
        assert_eq!(
            ensure_capacity(&mut mem, GrowthPolicy::Doubling, 3 * PAGE),
            Ok(4 * PAGE)
        );
        assert_eq!(mem.grow_calls(), 0);
    }

    #[test]
    fn doubling_grows_geometrically() {
        let mut mem = SimulatedMemory::new(PAGE, 1);
        let size = ensure_capacity(&mut mem, GrowthPolicy::Doubling, 5 * PAGE).unwrap();
        // 1 -> 2 -> 4 -> 8 pages
        assert_eq!(size, 8 * PAGE);
        assert_eq!(mem.grow_calls(), 3);
    }

    #[test]
    fn doubling_from_empty_memory() {
        let mut mem = SimulatedMemory::new(PAGE, 0);
        let size = ensure_capacity(&mut mem, GrowthPolicy::Doubling, 1).unwrap();
        assert_eq!(size, PAGE);
    }

    #[test]
    fn exact_need_grows_once() {
        let mut mem = SimulatedMemory::new(PAGE, 1);
        let size = ensure_capacity(&mut mem, GrowthPolicy::ExactNeed, 5 * PAGE + 1).unwrap();
        assert_eq!(size, 6 * PAGE);
        assert_eq!(mem.grow_calls(), 1);
    }

    #[test]
    fn rejected_doubling_falls_back_to_shortfall() {
        let mut mem = SimulatedMemory::new(PAGE, 4).with_max_pages(5);
        let size = ensure_capacity(&mut mem, GrowthPolicy::Doubling, 5 * PAGE).unwrap();
        assert_eq!(size, 5 * PAGE);
    }

    #[test]
    fn unreachable_target_fails_without_growing() {
        let mut mem = SimulatedMemory::new(PAGE, 1).with_max_pages(64);
        let err = ensure_capacity(&mut mem, GrowthPolicy::Doubling, 65 * PAGE).unwrap_err();
        assert_eq!(
            err,
            GrowError::LimitReached {
                current: 1,
                requested: 64,
                limit: 64
            }
        );
        assert_eq!(mem.grow_calls(), 0);
        assert_eq!(mem.page_count(), 1);
    }

    #[test]
    fn ceiling_surfaces_error() {
        let mut mem = SimulatedMemory::fixed(PAGE, 2);
        let err = ensure_capacity(&mut mem, GrowthPolicy::Doubling, 3 * PAGE).unwrap_err();
        assert!(matches!(err, GrowError::LimitReached { .. }));
        assert_eq!(mem.page_count(), 2);
    }
}
