use chrono::{DateTime, Utc};

use crate::{checksum::Checksum, partition::Allocation};

pub type BlockId = u32;

/// Metadata of a live block. Content lives in the partition.
#[derive(Clone, Debug, PartialEq)]
pub struct DataBlock {
    pub(super) id: BlockId,
    pub(super) allocation: Allocation,
    pub(super) len: usize,
    pub(super) checksum: Checksum,
    pub(super) created_at: DateTime<Utc>,
    pub(super) updated_at: DateTime<Utc>,
}

impl DataBlock {
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Partition-relative start of the block.
    pub fn offset(&self) -> usize {
        self.allocation.offset()
    }

    pub fn size(&self) -> usize {
        self.allocation.len()
    }

    pub fn allocation(&self) -> Allocation {
        self.allocation
    }

    /// Number of leading bytes covered by [`DataBlock::checksum`]: the whole
    /// block until the first write, then the length of the last write.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn checksum(&self) -> Checksum {
        self.checksum
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
