use crate::mach::memory::Memory;

#[test]
fn test_unaligned_little_endian_access() {
    let mut memory = Memory::new();
    let base = memory.alloc(32).unwrap();
    memory.write_i32(base + 1, 0x0403_0201).unwrap();
    assert_eq!(memory.read_u8(base + 1).unwrap(), 0x01);
    assert_eq!(memory.read_u8(base + 4).unwrap(), 0x04);
    assert_eq!(memory.read_i32(base + 1).unwrap(), 0x0403_0201);
    memory.write_i64(base + 3, -2).unwrap();
    assert_eq!(memory.read_i64(base + 3).unwrap(), -2);
    memory.write_f64(base + 5, 1.25).unwrap();
    assert_eq!(memory.read_f64(base + 5).unwrap(), 1.25);
}

#[test]
fn test_cstring_terminates_at_carriage_return() {
    let mut memory = Memory::new();
    let base = memory.alloc(32).unwrap();
    memory.write_string(base, "hello").unwrap();
    assert_eq!(memory.cstring_len(base).unwrap(), 5);
    assert_eq!(memory.read_string(base).unwrap(), "hello");
    memory.write_string(base, "").unwrap();
    assert_eq!(memory.cstring_len(base).unwrap(), 0);
}

#[test]
fn test_dim_minus_one_is_a_valid_address() {
    let mut memory = Memory::new();
    let first = memory.alloc(-1).unwrap();
    let second = memory.alloc(-1).unwrap();
    // Zero bytes allocated: both blocks share the address.
    assert_eq!(first, second);
    assert!(memory.alloc(-2).is_err());
}

#[test]
fn test_offheap_blocks_release_explicitly() {
    let mut memory = Memory::new();
    let block = memory.alloc_himem(100).unwrap();
    // Not reclaimed implicitly by a heap reset.
    memory.reset();
    assert!(memory.free_himem(block).is_ok());
    assert!(memory.free_himem(block).is_err());
    let again = memory.alloc_himem(100).unwrap();
    assert_eq!(block, again);
    memory.clear_himem();
    assert_eq!(memory.alloc_himem(100).unwrap(), block);
}

#[test]
fn test_out_of_range_access_reports() {
    let memory = Memory::new();
    assert!(memory.read_u8(usize::MAX).is_err());
    assert!(memory.read_i32(usize::MAX - 2).is_err());
}
