//! Property tests over random allocate/release sequences.

use proptest::prelude::*;
use scopealloc::{AllocError, AllocatorConfig, ScopedAllocator, SimulatedMemory};
use std::collections::HashMap;

const PAGE: usize = 4096;

#[derive(Debug, Clone)]
enum Op {
    Alloc { owner: u32, size: usize },
    Release { owner: u32 },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u32..4, 1usize..3 * PAGE).prop_map(|(owner, size)| Op::Alloc { owner, size }),
        1 => (0u32..5).prop_map(|owner| Op::Release { owner }),
    ]
}

/// A live allocation and the byte pattern written into it.
struct Live {
    addr: usize,
    size: usize,
    fill: u8,
}

fn allocator() -> ScopedAllocator<SimulatedMemory> {
    let config = AllocatorConfig {
        page_size: PAGE,
        heap_start: PAGE,
        ..AllocatorConfig::default()
    };
    let memory = SimulatedMemory::new(PAGE, 1).with_max_pages(64);
    ScopedAllocator::new(memory, config).expect("allocator")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn allocator_invariants_hold(ops in prop::collection::vec(op(), 1..120)) {
        let alloc = allocator();
        let mut live: HashMap<u32, Vec<Live>> = HashMap::new();
        let mut last_space = 0u64;
        let mut fill = 0u8;

        for op in ops {
            match op {
                Op::Alloc { owner, size } => {
                    alloc.set_current_owner(owner);
                    match alloc.allocate(size) {
                        Ok(addr) => {
                            let mut buf = vec![0xEEu8; size];
                            alloc.read(addr, &mut buf).unwrap();
                            prop_assert!(buf.iter().all(|&b| b == 0), "not zero-filled");

                            fill = fill.wrapping_add(1).max(1);
                            alloc.write(addr, &vec![fill; size]).unwrap();
                            live.entry(owner).or_default().push(Live { addr, size, fill });
                        }
                        Err(AllocError::OutOfMemory { .. }) => {}
                        Err(other) => {
                            prop_assert!(false, "unexpected error {:?}", other);
                        }
                    }
                }
                Op::Release { owner } => {
                    let before = alloc.statistics().bytes_in_use;
                    let owned: u64 = alloc
                        .regions()
                        .iter()
                        .filter(|r| r.owner == owner)
                        .map(|r| r.used() as u64)
                        .sum();

                    alloc.release_owner(owner);
                    live.remove(&owner);

                    prop_assert_eq!(alloc.statistics().bytes_in_use, before - owned);
                    prop_assert!(alloc.regions().iter().all(|r| r.owner != owner));
                }
            }

            prop_assert!(alloc.check_invariants().is_ok());

            let regions = alloc.regions();
            for pair in regions.windows(2) {
                prop_assert!(pair[0].end <= pair[1].start, "regions overlap");
            }

            let space = alloc.statistics().address_space_bytes;
            prop_assert!(space >= last_space, "address space shrank");
            last_space = space;

            // Surviving allocations keep their contents.
            for entries in live.values() {
                for entry in entries {
                    let mut buf = vec![0u8; entry.size];
                    alloc.read(entry.addr, &mut buf).unwrap();
                    prop_assert!(buf.iter().all(|&b| b == entry.fill), "live bytes clobbered");
                }
            }
        }
    }

    #[test]
    fn reuse_never_grows(sizes in prop::collection::vec(1usize..256, 1..40)) {
        let alloc = allocator();
        alloc.set_current_owner(1);
        alloc.allocate(8).unwrap();

        for size in sizes {
            let region = alloc.regions()[alloc.region_count() - 1];
            let aligned = (size + 7) & !7;
            let space = alloc.statistics().address_space_bytes;
            let count = alloc.region_count();

            alloc.allocate(size).unwrap();

            if region.spare() >= aligned {
                prop_assert_eq!(alloc.statistics().address_space_bytes, space);
                prop_assert_eq!(alloc.region_count(), count);
            }
        }
    }
}
