//! Read-only snapshots for reporting. Nothing here feeds back into the
//! allocators.

use crate::{partition::PartitionName, protection::ProtectionFlags};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegionStats {
    pub capacity: usize,
    pub used: usize,
    pub available: usize,
    pub partition_count: usize,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartitionStats {
    pub name: PartitionName,
    /// Start inside the region.
    pub offset: usize,
    pub size: usize,
    pub used: usize,
    pub available: usize,
    pub protection: ProtectionFlags,
    pub usage_percent: f64,
}

/// Counters kept by a block store since it was bound to its partition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockStoreMetrics {
    pub total_reads: usize,
    pub total_writes: usize,
    pub bytes_read: usize,
    pub bytes_written: usize,
    pub blocks_created: usize,
    pub blocks_deleted: usize,
    pub live_blocks: usize,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SystemStatus {
    pub total_memory: usize,
    pub available_memory: usize,
    pub partitions: Vec<PartitionStats>,
}
