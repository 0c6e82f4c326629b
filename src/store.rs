use std::collections::BTreeMap;

use chrono::Utc;

use crate::{checksum::checksum, partition::{Allocation, AllocationStrategy, BumpAllocator, Partition, PartitionError}, protection::ProtectionFlags, stats::BlockStoreMetrics};

pub mod block;

pub use block::{BlockId, DataBlock};

#[derive(thiserror::Error, Debug)]
pub enum BlockStoreError {
    #[error("Partition error: {0}")]
    Partition(#[from] PartitionError),
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("Block {0} not found")]
    BlockNotFound(BlockId),
    #[error("Block ids exhausted")]
    IdsExhausted,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub checked: usize,
    pub corrupted: Vec<BlockId>,
}

impl IntegrityReport {
    pub fn is_intact(&self) -> bool {
        self.corrupted.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefragmentReport {
    pub blocks_moved: usize,
    pub bytes_reclaimed: usize,
}

/// Named data blocks with checksummed content, allocated from one partition.
///
/// Deleting a block drops it from the index and hands its range back to the
/// partition's strategy. Under the default [`BumpAllocator`] that reclaims
/// nothing: space only comes back through [`BlockStore::defragment`].
pub struct BlockStore<S = BumpAllocator> {
    partition: Partition<S>,
    blocks: BTreeMap<BlockId, DataBlock>,
    next_id: BlockId,
    // raw ranges outside the block index; defragmentation never moves them
    pinned: Vec<Allocation>,
    metrics: BlockStoreMetrics,
}

impl<S: AllocationStrategy> BlockStore<S> {
    /// Binds a store to `partition` with fresh metrics and ids.
    ///
    /// Ranges the partition's strategy already holds are pinned and left
    /// untouched by defragmentation.
    pub fn init(partition: Partition<S>) -> Result<Self, BlockStoreError> {
        if partition.size() == 0 {
            return Err(BlockStoreError::InvalidArgument("partition has no capacity"));
        }
        let pinned = partition.allocations();
        log::debug!("block store bound to partition '{}' ({} ranges pinned)", partition.name(), pinned.len());
        Ok(BlockStore {
            partition,
            blocks: BTreeMap::new(),
            next_id: 1,
            pinned,
            metrics: BlockStoreMetrics::default(),
        })
    }

    /// Allocates a zeroed block of `size` bytes.
    pub fn create_block(&mut self, size: usize) -> Result<DataBlock, BlockStoreError> {
        if size == 0 {
            return Err(BlockStoreError::InvalidArgument("zero-sized block"));
        }
        let id = self.next_id;
        let next_id = id.checked_add(1).ok_or(BlockStoreError::IdsExhausted)?;

        let allocation = self.partition.allocate(size)?;
        let checksum = self.partition.checksum(allocation.offset(), size)?;
        let now = Utc::now();
        let block = DataBlock {
            id,
            allocation,
            len: size,
            checksum,
            created_at: now,
            updated_at: now,
        };
        self.next_id = next_id;
        self.blocks.insert(id, block.clone());
        self.metrics.blocks_created += 1;
        log::debug!("created block {} ({} bytes at {})", id, size, allocation.offset());
        Ok(block)
    }

    /// Writes the head of `data` into the block and returns the number of
    /// bytes copied.
    ///
    /// Input longer than the block is truncated to the block size without an
    /// error; compare the returned count against `data.len()` if that
    /// matters. The checksum covers the copied bytes only.
    pub fn write(&mut self, id: BlockId, data: &[u8]) -> Result<usize, BlockStoreError> {
        if data.is_empty() {
            return Err(BlockStoreError::InvalidArgument("empty write"));
        }
        let block = self.blocks.get_mut(&id).ok_or(BlockStoreError::BlockNotFound(id))?;
        let copied = data.len().min(block.size());
        self.partition.write(block.offset(), &data[..copied])?;

        block.len = copied;
        block.checksum = checksum(&data[..copied]);
        block.updated_at = Utc::now();
        self.metrics.total_writes += 1;
        self.metrics.bytes_written += copied;
        log::trace!("wrote {} bytes to block {}", copied, id);
        Ok(copied)
    }

    /// Fills the head of `buffer` from the block and returns the number of
    /// bytes copied.
    pub fn read(&mut self, id: BlockId, buffer: &mut [u8]) -> Result<usize, BlockStoreError> {
        if buffer.is_empty() {
            return Err(BlockStoreError::InvalidArgument("empty read buffer"));
        }
        let block = self.blocks.get(&id).ok_or(BlockStoreError::BlockNotFound(id))?;
        let copied = buffer.len().min(block.size());
        self.partition.read(block.offset(), &mut buffer[..copied])?;

        self.metrics.total_reads += 1;
        self.metrics.bytes_read += copied;
        log::trace!("read {} bytes from block {}", copied, id);
        Ok(copied)
    }

    /// Drops the block from the index and returns its last metadata.
    pub fn delete(&mut self, id: BlockId) -> Result<DataBlock, BlockStoreError> {
        let allocation = self.blocks.get(&id).ok_or(BlockStoreError::BlockNotFound(id))?.allocation;
        self.partition.free(allocation)?;
        let block = self.blocks.remove(&id).ok_or(BlockStoreError::BlockNotFound(id))?;
        self.metrics.blocks_deleted += 1;
        log::debug!("deleted block {}", id);
        Ok(block)
    }

    /// Recomputes the checksum of the stored content and compares it with
    /// the one recorded by the last write.
    pub fn verify(&self, id: BlockId) -> Result<bool, BlockStoreError> {
        let block = self.blocks.get(&id).ok_or(BlockStoreError::BlockNotFound(id))?;
        Ok(self.partition.checksum(block.offset(), block.len)? == block.checksum)
    }

    pub fn verify_integrity(&self) -> Result<IntegrityReport, BlockStoreError> {
        let mut report = IntegrityReport::default();
        for &id in self.blocks.keys() {
            report.checked += 1;
            if !self.verify(id)? {
                log::warn!("block {} failed checksum verification", id);
                report.corrupted.push(id);
            }
        }
        Ok(report)
    }

    /// Packs live blocks towards the front of the partition. Ids and
    /// content are preserved; offsets change. Pinned raw ranges stay where
    /// they are and blocks are packed around them.
    pub fn defragment(&mut self) -> Result<DefragmentReport, BlockStoreError> {
        let used = self.partition.used();
        let live: Vec<Allocation> = self.blocks.values().map(|block| block.allocation).collect();
        let moved = self.partition.compact(&self.pinned, &live)?;

        let mut report = DefragmentReport::default();
        for (block, allocation) in self.blocks.values_mut().zip(moved) {
            if block.allocation != allocation {
                report.blocks_moved += 1;
                block.allocation = allocation;
            }
        }
        report.bytes_reclaimed = used.saturating_sub(self.partition.used());
        log::debug!("defragmented: {} blocks moved, {} bytes reclaimed", report.blocks_moved, report.bytes_reclaimed);
        Ok(report)
    }

    /// Allocates a raw range outside the block index. It is pinned: the
    /// store never moves or reuses it until [`BlockStore::free_raw`].
    pub fn allocate_raw(&mut self, size: usize) -> Result<Allocation, BlockStoreError> {
        let allocation = self.partition.allocate(size)?;
        let index = self.pinned.partition_point(|pinned| pinned.offset() < allocation.offset());
        self.pinned.insert(index, allocation);
        Ok(allocation)
    }

    /// Releases a range from [`BlockStore::allocate_raw`], or one the
    /// partition held when the store was bound.
    pub fn free_raw(&mut self, allocation: Allocation) -> Result<(), BlockStoreError> {
        let index = self.pinned.iter().position(|&pinned| pinned == allocation).ok_or(
            PartitionError::InvalidFree { offset: allocation.offset(), len: allocation.len() },
        )?;
        self.partition.free(allocation)?;
        self.pinned.remove(index);
        Ok(())
    }

    /// Raw ranges the store keeps in place, in offset order.
    pub fn pinned(&self) -> &[Allocation] {
        &self.pinned
    }

    /// Writes straight into the partition, bypassing block checksums.
    pub fn write_raw(&mut self, offset: usize, data: &[u8]) -> Result<(), BlockStoreError> {
        Ok(self.partition.write(offset, data)?)
    }

    pub fn set_protection(&mut self, protection: ProtectionFlags) {
        self.partition.set_protection(protection);
    }

    /// Clears the partition and forgets every block and raw range. Ids keep
    /// counting from where they were.
    pub fn clear(&mut self) -> Result<(), BlockStoreError> {
        self.partition.clear()?;
        self.metrics.blocks_deleted += self.blocks.len();
        self.blocks.clear();
        self.pinned.clear();
        log::debug!("block store on partition '{}' cleared", self.partition.name());
        Ok(())
    }

    pub fn block(&self, id: BlockId) -> Option<&DataBlock> {
        self.blocks.get(&id)
    }

    /// Live blocks in id order.
    pub fn blocks(&self) -> impl Iterator<Item = &DataBlock> {
        self.blocks.values()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn metrics(&self) -> BlockStoreMetrics {
        BlockStoreMetrics {
            live_blocks: self.blocks.len(),
            ..self.metrics
        }
    }

    pub fn partition(&self) -> &Partition<S> {
        &self.partition
    }

    pub fn into_partition(self) -> Partition<S> {
        self.partition
    }
}
