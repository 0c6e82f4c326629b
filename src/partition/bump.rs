use super::{Allocation, AllocationStrategy, PartitionError};

/// Cursor-only allocator. Individual allocations are never returned: the
/// only way to get space back is [`AllocationStrategy::reset`], which the
/// partition issues on `clear`.
#[derive(Clone, Debug)]
pub struct BumpAllocator {
    capacity: usize,
    cursor: usize,
}

impl AllocationStrategy for BumpAllocator {
    fn with_capacity(capacity: usize) -> Self {
        BumpAllocator {
            capacity,
            cursor: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn used(&self) -> usize {
        self.cursor
    }

    fn allocated(&self) -> Vec<Allocation> {
        if self.cursor == 0 {
            return Vec::new();
        }
        vec![Allocation::new(0, self.cursor)]
    }

    fn allocate(&mut self, size: usize) -> Result<usize, PartitionError> {
        let available = self.capacity - self.cursor;
        if size > available {
            return Err(PartitionError::InsufficientSpace {
                requested: size,
                available,
            });
        }
        let offset = self.cursor;
        self.cursor += size;
        Ok(offset)
    }

    fn free(&mut self, allocation: Allocation) -> Result<(), PartitionError> {
        // space stays consumed until the next reset
        log::trace!("bump free of {} bytes at {} ignored", allocation.len(), allocation.offset());
        Ok(())
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}
