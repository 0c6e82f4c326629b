use partmem::{
    layout::{MIB, MemoryLayout, READ_WRITE_PARTITION},
    partition::PartitionError,
    protection::ProtectionFlags,
    region::{Region, RegionError},
    store::BlockStore,
    system::MemorySystem,
};

#[test]
fn test_three_partition_region() {
    let partition_size = 256 * MIB;
    let rwx = ProtectionFlags::READ_WRITE | ProtectionFlags::EXECUTE;

    let mut region = Region::create(3 * partition_size).unwrap();
    let gaming = region.add_partition("Gaming", partition_size, rwx).unwrap();
    let rw = region.add_partition("RW", partition_size, ProtectionFlags::READ_WRITE).unwrap();
    let user = region.add_partition("User", partition_size, rwx).unwrap();

    assert_eq!(region.used(), 3 * partition_size);
    assert_eq!(gaming.offset() + gaming.size(), rw.offset());
    assert_eq!(rw.offset() + rw.size(), user.offset());

    assert!(matches!(
        region.add_partition("Extra", 1, ProtectionFlags::READ_WRITE),
        Err(RegionError::InsufficientSpace { requested: 1, available: 0 })
    ));
    assert_eq!(region.used(), 3 * partition_size);
}

#[test]
fn test_block_store_hello() {
    let mut region = Region::create(MIB).unwrap();
    let partition = region.add_partition("RW", MIB, ProtectionFlags::READ_WRITE).unwrap();
    let mut store = BlockStore::init(partition).unwrap();

    let block = store.create_block(1024).unwrap();
    store.write(block.id(), b"hello").unwrap();

    let mut buffer = [0u8; 5];
    store.read(block.id(), &mut buffer).unwrap();
    assert_eq!(&buffer, b"hello");
    assert!(store.verify(block.id()).unwrap());
}

#[test]
fn test_default_layout_boot() {
    let mut system = MemorySystem::boot(&MemoryLayout::default()).unwrap();
    assert_eq!(system.region().used(), 768 * MIB);
    assert_eq!(system.region().available(), 0);

    let gaming = system.partition_mut("Gaming").unwrap();
    let scratch = gaming.allocate(4096).unwrap();
    gaming.fill(scratch.offset(), scratch.len(), 0x5A).unwrap();

    let mut store = BlockStore::init(system.take_partition(READ_WRITE_PARTITION).unwrap()).unwrap();
    let id = store.create_block(64).unwrap().id();
    store.write(id, b"Hello from Read/Write partition! Testing 1, 2, 3...").unwrap();
    assert!(store.verify_integrity().unwrap().is_intact());

    let user = system.partition_mut("User Space").unwrap();
    user.set_protection(ProtectionFlags::NO_ACCESS);
    assert!(matches!(user.allocate(1), Err(PartitionError::InvalidProtection { .. })));

    let status = system.status();
    assert_eq!(status.partitions.len(), 2);
    assert_eq!(status.partitions[0].used, 4096);
}
