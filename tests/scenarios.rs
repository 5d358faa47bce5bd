//! End-to-end allocator scenarios on WebAssembly-sized pages.

use scopealloc::config::WASM_PAGE_SIZE;
use scopealloc::{AllocError, AllocatorConfig, ScopedAllocator, SimulatedMemory};

const MIB: usize = 1024 * 1024;

fn wasm_allocator(memory: SimulatedMemory) -> ScopedAllocator<SimulatedMemory> {
    ScopedAllocator::new(memory, AllocatorConfig::default()).expect("allocator")
}

fn assert_zeroed(alloc: &ScopedAllocator<SimulatedMemory>, addr: usize, len: usize) {
    let mut buf = vec![0xEEu8; len];
    alloc.read(addr, &mut buf).expect("read");
    assert!(buf.iter().all(|&b| b == 0), "allocation at {:#x} not zeroed", addr);
}

#[test]
fn owner_release_and_gap_reuse() {
    let alloc = wasm_allocator(SimulatedMemory::new(WASM_PAGE_SIZE, 1));
    let baseline = alloc.statistics().bytes_in_use;

    alloc.set_current_owner(7);
    let a = alloc.allocate(MIB).expect("1 MiB");
    let b = alloc.allocate(2 * MIB).expect("2 MiB");
    alloc.set_current_owner(0);

    assert_zeroed(&alloc, a, MIB);
    assert_zeroed(&alloc, b, 2 * MIB);
    assert_eq!(b, a + MIB, "regions should be adjacent");
    assert!(alloc.statistics().bytes_in_use >= baseline + 3 * MIB as u64);

    alloc.release_owner(7);
    let after_release = alloc.statistics();
    assert_eq!(after_release.bytes_in_use, baseline);

    let grow_calls = alloc.with_memory(|m| m.grow_calls());
    alloc.set_current_owner(8);
    let c = alloc.allocate(MIB).expect("reuse");

    assert_eq!(c, a);
    assert_eq!(
        alloc.statistics().address_space_bytes,
        after_release.address_space_bytes
    );
    assert_eq!(alloc.with_memory(|m| m.grow_calls()), grow_calls);
}

#[test]
fn exhausted_growth_reports_out_of_memory() {
    let alloc = wasm_allocator(SimulatedMemory::fixed(WASM_PAGE_SIZE, 1));

    let err = alloc.allocate(1).unwrap_err();
    assert!(matches!(err, AllocError::OutOfMemory { .. }));
    assert_eq!(alloc.region_count(), 0);
    assert!(alloc.check_invariants().is_ok());

    // Still usable and still failing cleanly.
    assert!(alloc.allocate(64).is_err());
    assert_eq!(alloc.statistics().oom_count, 2);
}

#[test]
fn ceiling_is_used_up_before_failing() {
    let alloc = wasm_allocator(SimulatedMemory::new(WASM_PAGE_SIZE, 1).with_max_pages(4));

    alloc.set_current_owner(1);
    alloc.allocate(3 * WASM_PAGE_SIZE).expect("fits under ceiling");
    alloc.set_current_owner(2);
    assert!(matches!(
        alloc.allocate(1),
        Err(AllocError::OutOfMemory { .. })
    ));

    alloc.release_owner(1);
    assert!(alloc.allocate(1).is_ok());
}

#[test]
fn zero_fill_up_to_full_capacity() {
    let alloc = wasm_allocator(SimulatedMemory::fixed(WASM_PAGE_SIZE, 5));
    let capacity = alloc.statistics().address_space_bytes as usize;

    for size in [1, 7, 4096, capacity] {
        alloc.set_current_owner(1);
        let addr = alloc.allocate(size).expect("alloc");
        assert_zeroed(&alloc, addr, size);
        alloc.write(addr, &vec![0x5A; size]).expect("dirty");
        alloc.release_owner(1);
    }
}

#[test]
fn request_scoped_workload() {
    let alloc = wasm_allocator(SimulatedMemory::new(WASM_PAGE_SIZE, 1));

    for request in 1..=10u32 {
        alloc.with_owner(request, || {
            for i in 0..50 {
                alloc.allocate(100 + i * 10).expect("alloc");
            }
        });
        alloc.release_owner(request);
    }

    let stats = alloc.statistics();
    assert_eq!(stats.bytes_in_use, 0);
    assert_eq!(stats.allocation_count, 500);
    assert_eq!(stats.free_count, 10);
    // Every request fits in the space of the first one.
    assert!(stats.address_space_bytes <= 2 * WASM_PAGE_SIZE as u64);
}
