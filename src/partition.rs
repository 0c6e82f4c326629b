use std::{ops::Range, sync::{RwLockReadGuard, RwLockWriteGuard}};

use crate::{checksum::{Checksum, RollingChecksum}, protection::ProtectionFlags, region::SharedBuffer, stats::PartitionStats};

pub mod bump;
pub mod free_list;
pub mod name;

pub use bump::BumpAllocator;
pub use free_list::FreeListAllocator;
pub use name::{MAX_NAME_LEN, PartitionName};

#[derive(thiserror::Error, Debug)]
pub enum PartitionError {
    #[error("{operation} denied by protection {protection:?}")]
    InvalidProtection {
        operation: &'static str,
        protection: ProtectionFlags,
    },
    #[error("Insufficient space: requested {requested} bytes, {available} available")]
    InsufficientSpace { requested: usize, available: usize },
    #[error("Out of bounds: {len} bytes at offset {offset} exceed partition size {size}")]
    OutOfBounds { offset: usize, len: usize, size: usize },
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("Invalid free: {len} bytes at offset {offset} are not allocated")]
    InvalidFree { offset: usize, len: usize },
    #[error("Poisoned lock")]
    PoisonedLock,
}

/// Byte range handed out by a partition allocator, relative to the start of
/// the partition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Allocation {
    offset: usize,
    len: usize,
}

impl Allocation {
    pub fn new(offset: usize, len: usize) -> Self {
        Allocation { offset, len }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }
}

/// Placement policy behind [`Partition::allocate`].
///
/// Strategies only do bookkeeping over `[0, capacity)`; zeroing, bounds and
/// protection checks stay in the partition. After `reset`, successive
/// allocations must be handed out front to back with no gaps.
pub trait AllocationStrategy {
    fn with_capacity(capacity: usize) -> Self where Self: Sized;
    fn capacity(&self) -> usize;
    fn used(&self) -> usize;
    /// Allocated extents in offset order, adjacent extents merged.
    fn allocated(&self) -> Vec<Allocation>;
    /// Returns the offset of a fresh `size`-byte range.
    fn allocate(&mut self, size: usize) -> Result<usize, PartitionError>;
    fn free(&mut self, allocation: Allocation) -> Result<(), PartitionError>;
    fn reset(&mut self);
}

/// Named, protection-tagged view over `[offset, offset + size)` of a region.
///
/// The partition does not own its bytes. It shares the region's backing
/// buffer, which stays alive for as long as any partition refers to it.
pub struct Partition<S = BumpAllocator> {
    name: PartitionName,
    buffer: SharedBuffer,
    offset: usize,
    size: usize,
    protection: ProtectionFlags,
    strategy: S,
}

impl<S: AllocationStrategy> Partition<S> {
    pub(crate) fn new(name: PartitionName, buffer: SharedBuffer, offset: usize, size: usize, protection: ProtectionFlags) -> Self {
        Partition {
            name,
            buffer,
            offset,
            size,
            protection,
            strategy: S::with_capacity(size),
        }
    }

    pub fn name(&self) -> &PartitionName {
        &self.name
    }

    /// Start of the partition inside its region.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn used(&self) -> usize {
        self.strategy.used()
    }

    pub fn available(&self) -> usize {
        self.size - self.strategy.used()
    }

    pub fn protection(&self) -> ProtectionFlags {
        self.protection
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Ranges currently held by the strategy, in offset order.
    pub fn allocations(&self) -> Vec<Allocation> {
        self.strategy.allocated()
    }

    /// Replaces the protection flags. Ranges handed out earlier are not
    /// re-checked; the new flags apply to every later call.
    pub fn set_protection(&mut self, protection: ProtectionFlags) {
        log::debug!("partition '{}' protection {:?} -> {:?}", self.name, self.protection, protection);
        self.protection = protection;
    }

    /// Hands out a zeroed range of `size` bytes.
    pub fn allocate(&mut self, size: usize) -> Result<Allocation, PartitionError> {
        self.require_write("allocate")?;
        if size == 0 {
            return Err(PartitionError::InvalidArgument("zero-sized allocation"));
        }
        let mut bytes = self.buffer.write().map_err(|_| PartitionError::PoisonedLock)?;
        let offset = self.strategy.allocate(size)?;
        let allocation = Allocation::new(offset, size);
        bytes[self.offset + offset..self.offset + allocation.end()].fill(0);
        drop(bytes);
        log::trace!("partition '{}' allocated {} bytes at {}", self.name, size, offset);
        Ok(allocation)
    }

    /// Returns an allocation to the strategy. With the default
    /// [`BumpAllocator`] this reclaims nothing.
    pub fn free(&mut self, allocation: Allocation) -> Result<(), PartitionError> {
        self.require_write("free")?;
        self.check_bounds(allocation.offset(), allocation.len())?;
        self.strategy.free(allocation)
    }

    /// Zero-fills the whole partition and forgets every allocation.
    pub fn clear(&mut self) -> Result<(), PartitionError> {
        let range = self.absolute(0..self.size);
        self.lock_mut()?[range].fill(0);
        self.strategy.reset();
        log::debug!("partition '{}' cleared", self.name);
        Ok(())
    }

    pub fn read(&self, offset: usize, buffer: &mut [u8]) -> Result<(), PartitionError> {
        self.require_read("read")?;
        let range = self.check_bounds(offset, buffer.len())?;
        buffer.copy_from_slice(&self.lock()?[range]);
        Ok(())
    }

    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), PartitionError> {
        self.require_write("write")?;
        let range = self.check_bounds(offset, data.len())?;
        self.lock_mut()?[range].copy_from_slice(data);
        Ok(())
    }

    pub fn fill(&mut self, offset: usize, len: usize, value: u8) -> Result<(), PartitionError> {
        self.require_write("fill")?;
        let range = self.check_bounds(offset, len)?;
        self.lock_mut()?[range].fill(value);
        Ok(())
    }

    /// Copies `len` bytes from `src` to `dst`; the ranges may overlap.
    pub fn copy_within(&mut self, src: usize, len: usize, dst: usize) -> Result<(), PartitionError> {
        self.require_write("copy")?;
        let source = self.check_bounds(src, len)?;
        let target = self.check_bounds(dst, len)?;
        self.lock_mut()?.copy_within(source, target.start);
        Ok(())
    }

    /// Checksum of `len` bytes at `offset`, computed in place.
    pub fn checksum(&self, offset: usize, len: usize) -> Result<Checksum, PartitionError> {
        self.require_read("checksum")?;
        let range = self.check_bounds(offset, len)?;
        let mut hasher = RollingChecksum::new();
        hasher.update(&self.lock()?[range]);
        Ok(hasher.finalize())
    }

    /// Moves `movable` allocations towards the front of the partition,
    /// keeping their relative order, and zero-fills everything behind them.
    ///
    /// `pinned` allocations keep their offsets and content; movable ones are
    /// packed into the space before, between and after them. Returns the
    /// relocated `movable` allocations in input order. Any allocation listed
    /// in neither slice is dropped.
    pub fn compact(&mut self, pinned: &[Allocation], movable: &[Allocation]) -> Result<Vec<Allocation>, PartitionError> {
        self.require_write("compact")?;
        // `None` marks a pinned entry, `Some(index)` a movable one
        let mut entries: Vec<(Allocation, Option<usize>)> = pinned.iter().map(|&allocation| (allocation, None))
            .chain(movable.iter().enumerate().map(|(index, &allocation)| (allocation, Some(index))))
            .collect();
        for (allocation, _) in &entries {
            if allocation.is_empty() {
                return Err(PartitionError::InvalidArgument("zero-sized allocation"));
            }
            self.check_bounds(allocation.offset(), allocation.len())?;
        }
        entries.sort_by_key(|(allocation, _)| allocation.offset());
        if entries.windows(2).any(|pair| pair[0].0.end() > pair[1].0.offset()) {
            return Err(PartitionError::InvalidArgument("overlapping allocations"));
        }

        let mut bytes = self.buffer.write().map_err(|_| PartitionError::PoisonedLock)?;
        self.strategy.reset();
        let mut moved = vec![Allocation::default(); movable.len()];
        let mut gaps = Vec::new();
        // sorted by offset, so every target lies at or before its source
        for (allocation, slot) in entries {
            let cursor = self.strategy.used();
            match slot {
                None => {
                    if allocation.offset() > cursor {
                        let gap = Allocation::new(cursor, allocation.offset() - cursor);
                        self.strategy.allocate(gap.len())?;
                        bytes[self.offset + gap.offset()..self.offset + gap.end()].fill(0);
                        gaps.push(gap);
                    }
                    self.strategy.allocate(allocation.len())?;
                }
                Some(index) => {
                    let offset = self.strategy.allocate(allocation.len())?;
                    if offset != allocation.offset() {
                        let source = self.offset + allocation.offset()..self.offset + allocation.end();
                        bytes.copy_within(source, self.offset + offset);
                    }
                    moved[index] = Allocation::new(offset, allocation.len());
                }
            }
        }
        let end = self.strategy.used();
        bytes[self.offset + end..self.offset + self.size].fill(0);
        drop(bytes);
        // holes in front of pinned ranges; a no-op for the bump allocator
        for gap in gaps {
            self.strategy.free(gap)?;
        }

        log::debug!("partition '{}' compacted to {} bytes", self.name, end);
        Ok(moved)
    }

    pub fn stats(&self) -> PartitionStats {
        let used = self.used();
        PartitionStats {
            name: self.name.clone(),
            offset: self.offset,
            size: self.size,
            used,
            available: self.size - used,
            protection: self.protection,
            usage_percent: if self.size == 0 { 0.0 } else { used as f64 / self.size as f64 * 100.0 },
        }
    }

    fn require_read(&self, operation: &'static str) -> Result<(), PartitionError> {
        if !self.protection.allows_read() {
            return Err(PartitionError::InvalidProtection { operation, protection: self.protection });
        }
        Ok(())
    }

    fn require_write(&self, operation: &'static str) -> Result<(), PartitionError> {
        if !self.protection.allows_write() {
            return Err(PartitionError::InvalidProtection { operation, protection: self.protection });
        }
        Ok(())
    }

    /// Maps a partition-relative span to a region-absolute range.
    fn check_bounds(&self, offset: usize, len: usize) -> Result<Range<usize>, PartitionError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.size => Ok(self.absolute(offset..end)),
            _ => Err(PartitionError::OutOfBounds { offset, len, size: self.size }),
        }
    }

    fn absolute(&self, range: Range<usize>) -> Range<usize> {
        self.offset + range.start..self.offset + range.end
    }

    fn lock(&self) -> Result<RwLockReadGuard<'_, Box<[u8]>>, PartitionError> {
        self.buffer.read().map_err(|_| PartitionError::PoisonedLock)
    }

    fn lock_mut(&self) -> Result<RwLockWriteGuard<'_, Box<[u8]>>, PartitionError> {
        self.buffer.write().map_err(|_| PartitionError::PoisonedLock)
    }
}
