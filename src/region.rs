use std::{alloc::{self, Layout}, ptr, sync::{Arc, RwLock}};

use crate::{partition::{AllocationStrategy, BumpAllocator, Partition, PartitionName}, protection::ProtectionFlags, stats::RegionStats};

pub(crate) type SharedBuffer = Arc<RwLock<Box<[u8]>>>;

#[derive(thiserror::Error, Debug)]
pub enum RegionError {
    #[error("Out of memory: cannot reserve {requested} bytes")]
    OutOfMemory { requested: usize },
    #[error("Insufficient space: requested {requested} bytes, {available} available")]
    InsufficientSpace { requested: usize, available: usize },
}

/// Record of one carve-out, kept by the region in creation order.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartitionInfo {
    pub name: PartitionName,
    pub offset: usize,
    pub size: usize,
    pub protection: ProtectionFlags,
}

/// Fixed-capacity backing memory, split front to back into partitions.
///
/// Carving is one-way: partitions are never removed or resized, so `used`
/// only grows. The backing buffer is released once the region and every
/// partition cut from it are dropped.
pub struct Region {
    buffer: SharedBuffer,
    capacity: usize,
    used: usize,
    partitions: Vec<PartitionInfo>,
}

impl Region {
    /// Reserves `capacity` zeroed bytes.
    pub fn create(capacity: usize) -> Result<Self, RegionError> {
        let buffer = zeroed_buffer(capacity).ok_or(RegionError::OutOfMemory { requested: capacity })?;
        log::debug!("region created with {} bytes", capacity);
        Ok(Region {
            buffer: Arc::new(RwLock::new(buffer)),
            capacity,
            used: 0,
            partitions: Vec::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn available(&self) -> usize {
        self.capacity - self.used
    }

    /// Carves the next `size` bytes into a partition using the default bump
    /// allocator. Names longer than [`crate::partition::MAX_NAME_LEN`] bytes
    /// are truncated.
    pub fn add_partition(&mut self, name: &str, size: usize, protection: ProtectionFlags) -> Result<Partition, RegionError> {
        self.add_partition_with::<BumpAllocator>(name, size, protection)
    }

    /// Same as [`Region::add_partition`] with an explicit allocation strategy.
    pub fn add_partition_with<S: AllocationStrategy>(&mut self, name: &str, size: usize, protection: ProtectionFlags) -> Result<Partition<S>, RegionError> {
        let available = self.available();
        if size > available {
            return Err(RegionError::InsufficientSpace { requested: size, available });
        }

        let name = PartitionName::new(name);
        let offset = self.used;
        self.used += size;
        self.partitions.push(PartitionInfo {
            name: name.clone(),
            offset,
            size,
            protection,
        });
        log::debug!("partition '{}' carved at {} ({} bytes, {:?})", name, offset, size, protection);

        Ok(Partition::new(name, self.buffer.clone(), offset, size, protection))
    }

    pub fn partitions(&self) -> &[PartitionInfo] {
        &self.partitions
    }

    pub fn stats(&self) -> RegionStats {
        RegionStats {
            capacity: self.capacity,
            used: self.used,
            available: self.available(),
            partition_count: self.partitions.len(),
        }
    }
}

/// Fallible zeroed allocation. Zeroed pages come straight from the allocator,
/// so large regions cost nothing until touched.
fn zeroed_buffer(capacity: usize) -> Option<Box<[u8]>> {
    if capacity == 0 {
        return Some(Box::default());
    }
    let layout = Layout::array::<u8>(capacity).ok()?;
    // SAFETY: `layout` has a non-zero size.
    let data = unsafe { alloc::alloc_zeroed(layout) };
    if data.is_null() {
        return None;
    }
    // SAFETY: `data` was returned by the global allocator for exactly the
    // layout of `[u8; capacity]` and every byte is initialised to zero.
    Some(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(data, capacity)) })
}
