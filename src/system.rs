use crate::{layout::{LayoutError, MemoryLayout}, partition::{Partition, PartitionName}, region::{Region, RegionError}, stats::SystemStatus};

#[derive(thiserror::Error, Debug)]
pub enum SystemError {
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),
    #[error("Region error: {0}")]
    Region(#[from] RegionError),
    #[error("Unknown partition '{0}'")]
    UnknownPartition(String),
}

/// One region plus the partitions carved from it, owned together and passed
/// by reference to whichever subsystem needs them.
pub struct MemorySystem {
    region: Region,
    partitions: Vec<Partition>,
}

impl MemorySystem {
    /// Creates the region and carves every partition of `layout` in order.
    pub fn boot(layout: &MemoryLayout) -> Result<Self, SystemError> {
        layout.validate()?;
        let mut region = Region::create(layout.capacity)?;
        let partitions = layout.partitions.iter()
            .map(|spec| region.add_partition(&spec.name, spec.size, spec.protection))
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("memory system up: {} partitions, {} of {} bytes carved", partitions.len(), region.used(), region.capacity());
        Ok(MemorySystem { region, partitions })
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn partition(&self, name: &str) -> Option<&Partition> {
        let name = PartitionName::new(name);
        self.partitions.iter().find(|partition| *partition.name() == name)
    }

    pub fn partition_mut(&mut self, name: &str) -> Option<&mut Partition> {
        let name = PartitionName::new(name);
        self.partitions.iter_mut().find(|partition| *partition.name() == name)
    }

    /// Hands a partition over, e.g. to bind it to a block store. It no
    /// longer shows up in [`MemorySystem::status`].
    pub fn take_partition(&mut self, name: &str) -> Result<Partition, SystemError> {
        let key = PartitionName::new(name);
        let index = self.partitions.iter()
            .position(|partition| *partition.name() == key)
            .ok_or_else(|| SystemError::UnknownPartition(name.to_string()))?;
        Ok(self.partitions.remove(index))
    }

    pub fn partitions(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.iter()
    }

    pub fn status(&self) -> SystemStatus {
        SystemStatus {
            total_memory: self.region.capacity(),
            available_memory: self.region.available(),
            partitions: self.partitions.iter().map(Partition::stats).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{layout::{GAMING_PARTITION, READ_WRITE_PARTITION, USER_SPACE_PARTITION}, protection::ProtectionFlags, store::BlockStore};

    fn small_layout() -> MemoryLayout {
        MemoryLayout::new(3072)
            .with_partition(GAMING_PARTITION, 1024, ProtectionFlags::READ_WRITE | ProtectionFlags::EXECUTE)
            .with_partition(READ_WRITE_PARTITION, 1024, ProtectionFlags::READ_WRITE)
            .with_partition(USER_SPACE_PARTITION, 1024, ProtectionFlags::READ_WRITE | ProtectionFlags::EXECUTE)
    }

    #[test]
    fn test_memory_system_boot() {
        let mut system = MemorySystem::boot(&small_layout()).unwrap();
        assert_eq!(system.region().used(), 3072);
        assert_eq!(system.region().partitions().len(), 3);

        let gaming = system.partition(GAMING_PARTITION).unwrap();
        let user = system.partition(USER_SPACE_PARTITION).unwrap();
        assert_eq!(gaming.offset(), 0);
        assert_eq!(user.offset(), 2048);

        system.partition_mut(USER_SPACE_PARTITION).unwrap().allocate(256).unwrap();
        let status = system.status();
        assert_eq!(status.total_memory, 3072);
        assert_eq!(status.available_memory, 0);
        assert_eq!(status.partitions[2].used, 256);
        assert!(system.partition("Nope").is_none());
    }

    #[test]
    fn test_memory_system_take_partition() {
        let mut system = MemorySystem::boot(&small_layout()).unwrap();
        let partition = system.take_partition(READ_WRITE_PARTITION).unwrap();
        let mut store = BlockStore::init(partition).unwrap();
        let id = store.create_block(64).unwrap().id();
        store.write(id, b"bound").unwrap();
        assert!(store.verify(id).unwrap());

        assert!(system.partition(READ_WRITE_PARTITION).is_none());
        assert_eq!(system.status().partitions.len(), 2);
        assert!(matches!(system.take_partition(READ_WRITE_PARTITION), Err(SystemError::UnknownPartition(_))));
    }

    #[test]
    fn test_memory_system_rejects_bad_layout() {
        let layout = small_layout().with_partition("Overflow", 1, ProtectionFlags::READ_WRITE);
        assert!(matches!(MemorySystem::boot(&layout), Err(SystemError::Layout(_))));

        let layout = MemoryLayout::new(usize::MAX);
        assert!(matches!(MemorySystem::boot(&layout), Err(SystemError::Region(RegionError::OutOfMemory { .. }))));
    }
}
