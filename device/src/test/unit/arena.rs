use std::sync::Arc;

use test_case::test_case;

use crate::{Arena, ArenaInfo, CountingAllocator, CpuAllocator};

fn arena() -> Arena {
    Arena::new(Arc::new(CpuAllocator))
}

fn blocks(arena: &Arena) -> Vec<(usize, usize)> {
    arena.free_blocks().collect()
}

#[test]
fn test_default_alignment_is_widest_dtype() {
    assert_eq!(arena().alignment(), 8);
}

#[test_case(8, 1, 8; "round_one_to_eight")]
#[test_case(8, 8, 8; "exact")]
#[test_case(8, 9, 16; "round_up")]
#[test_case(8, 0, 8; "empty_takes_one_unit")]
#[test_case(64, 65, 128; "wide_alignment")]
#[test_case(1, 3, 3; "byte_alignment")]
fn test_aligned_size(alignment: usize, size: usize, expected: usize) {
    let arena = Arena::with_alignment(Arc::new(CpuAllocator), alignment);
    assert_eq!(arena.aligned_size(size), expected);
}

#[test]
#[should_panic(expected = "power of two")]
fn test_rejects_bad_alignment() {
    Arena::with_alignment(Arc::new(CpuAllocator), 12);
}

#[test]
fn test_bump_allocation() {
    let mut arena = arena();
    assert_eq!(arena.alloc(8), 0);
    assert_eq!(arena.alloc(12), 8);
    assert_eq!(arena.alloc(4), 24);
    assert_eq!(arena.info(), ArenaInfo { used: 32, peak: 32 });
}

#[test]
fn test_tail_free_shrinks_used() {
    let mut arena = arena();
    let a = arena.alloc(16);
    let b = arena.alloc(16);
    arena.free(b, 16);

    assert_eq!(arena.used(), 16);
    assert_eq!(arena.peak(), 32);
    assert!(blocks(&arena).is_empty());

    arena.free(a, 16);
    assert_eq!(arena.used(), 0);
    assert_eq!(arena.peak(), 32);
}

#[test]
fn test_tail_free_swallows_preceding_free_block() {
    let mut arena = arena();
    let a = arena.alloc(8);
    let b = arena.alloc(8);
    let c = arena.alloc(8);

    arena.free(b, 8);
    assert_eq!(blocks(&arena), vec![(8, 8)]);

    arena.free(c, 8);
    assert_eq!(arena.used(), 8);
    assert!(blocks(&arena).is_empty());

    arena.free(a, 8);
    assert_eq!(arena.used(), 0);
}

#[test]
fn test_coalesce_with_following_block() {
    let mut arena = arena();
    let a = arena.alloc(8);
    let b = arena.alloc(8);
    let _tail = arena.alloc(8);

    arena.free(b, 8);
    arena.free(a, 8);
    assert_eq!(blocks(&arena), vec![(0, 16)]);
}

#[test]
fn test_coalesce_with_preceding_block() {
    let mut arena = arena();
    let a = arena.alloc(8);
    let b = arena.alloc(8);
    let _tail = arena.alloc(8);

    arena.free(a, 8);
    arena.free(b, 8);
    assert_eq!(blocks(&arena), vec![(0, 16)]);
}

#[test]
fn test_coalesce_bridges_two_blocks() {
    let mut arena = arena();
    let a = arena.alloc(8);
    let b = arena.alloc(8);
    let c = arena.alloc(8);
    let _tail = arena.alloc(8);

    arena.free(a, 8);
    arena.free(c, 8);
    assert_eq!(blocks(&arena), vec![(0, 8), (16, 8)]);

    arena.free(b, 8);
    assert_eq!(blocks(&arena), vec![(0, 24)]);
}

#[test]
fn test_best_fit_prefers_smallest_block() {
    let mut arena = arena();
    let big = arena.alloc(32);
    let _sep1 = arena.alloc(8);
    let small = arena.alloc(16);
    let _sep2 = arena.alloc(8);

    arena.free(big, 32);
    arena.free(small, 16);

    assert_eq!(arena.alloc(16), small);
    assert_eq!(blocks(&arena), vec![(big, 32)]);
}

#[test]
fn test_split_keeps_remainder() {
    let mut arena = arena();
    let big = arena.alloc(32);
    let _tail = arena.alloc(8);
    arena.free(big, 32);

    assert_eq!(arena.alloc(8), 0);
    assert_eq!(blocks(&arena), vec![(8, 24)]);
    assert_eq!(arena.used(), 40);
}

#[test]
fn test_falls_back_to_bump_when_nothing_fits() {
    let mut arena = arena();
    let small = arena.alloc(8);
    let _tail = arena.alloc(8);
    arena.free(small, 8);

    assert_eq!(arena.alloc(16), 16);
    assert_eq!(arena.peak(), 32);
    assert_eq!(blocks(&arena), vec![(0, 8)]);
}

#[test]
fn test_reuse_keeps_peak() {
    let mut arena = arena();
    for _ in 0..10 {
        let offset = arena.alloc(64);
        arena.free(offset, 64);
    }
    assert_eq!(arena.peak(), 64);
    assert_eq!(arena.used(), 0);
}

#[test]
#[should_panic(expected = "exceeds used")]
fn test_free_beyond_used() {
    let mut arena = arena();
    arena.alloc(8);
    arena.free(8, 8);
}

#[test]
#[should_panic(expected = "overlaps free block")]
fn test_double_free() {
    let mut arena = arena();
    let a = arena.alloc(8);
    let _tail = arena.alloc(8);
    arena.free(a, 8);
    arena.free(a, 8);
}

#[test]
fn test_materialize_once() {
    let backend = Arc::new(CountingAllocator::new(Box::new(CpuAllocator)));
    let mut arena = Arena::new(backend.clone());
    let a = arena.alloc(24);
    let b = arena.alloc(8);
    arena.free(a, 24);
    arena.free(b, 8);

    let first = arena.get_ptr().unwrap();
    let second = arena.get_ptr().unwrap();
    assert!(arena.is_materialized());
    assert!(first.shares_allocation(&second));
    assert_eq!(first.size(), 32);
    assert_eq!(backend.allocs(), 1);
    assert_eq!(backend.bytes_allocated(), 32);

    drop(arena);
    drop(first);
    assert_eq!(backend.frees(), 0);
    drop(second);
    assert_eq!(backend.frees(), 1);
}

#[test]
#[should_panic(expected = "materialized")]
fn test_alloc_after_materialize() {
    let mut arena = arena();
    arena.alloc(8);
    let _buffer = arena.get_ptr().unwrap();
    arena.alloc(8);
}

#[test]
#[should_panic(expected = "materialized")]
fn test_free_after_materialize() {
    let mut arena = arena();
    let a = arena.alloc(8);
    let _buffer = arena.get_ptr().unwrap();
    arena.free(a, 8);
}
