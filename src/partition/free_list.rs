use std::ops::Range;

use super::{Allocation, AllocationStrategy, PartitionError};

/// First-fit allocator over a sorted list of free extents.
///
/// Opt-in alternative to [`super::BumpAllocator`] for consumers that need
/// per-allocation reclaim. Adjacent extents are merged on free, so the list
/// never holds two touching ranges.
#[derive(Clone, Debug)]
pub struct FreeListAllocator {
    capacity: usize,
    free: Vec<Range<usize>>,
}

impl FreeListAllocator {
    /// Size of the largest contiguous free extent.
    pub fn largest_free(&self) -> usize {
        self.free.iter().map(|extent| extent.len()).max().unwrap_or(0)
    }

    pub fn free_extents(&self) -> usize {
        self.free.len()
    }
}

impl AllocationStrategy for FreeListAllocator {
    fn with_capacity(capacity: usize) -> Self {
        let free = if capacity == 0 { Vec::new() } else { vec![0..capacity] };
        FreeListAllocator { capacity, free }
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn used(&self) -> usize {
        self.capacity - self.free.iter().map(|extent| extent.len()).sum::<usize>()
    }

    fn allocated(&self) -> Vec<Allocation> {
        let mut allocated = Vec::new();
        let mut cursor = 0;
        for extent in &self.free {
            if extent.start > cursor {
                allocated.push(Allocation::new(cursor, extent.start - cursor));
            }
            cursor = extent.end;
        }
        if cursor < self.capacity {
            allocated.push(Allocation::new(cursor, self.capacity - cursor));
        }
        allocated
    }

    fn allocate(&mut self, size: usize) -> Result<usize, PartitionError> {
        if size == 0 {
            return Err(PartitionError::InvalidArgument("zero-sized allocation"));
        }
        let Some(index) = self.free.iter().position(|extent| extent.len() >= size) else {
            return Err(PartitionError::InsufficientSpace {
                requested: size,
                available: self.largest_free(),
            });
        };
        let extent = &mut self.free[index];
        let offset = extent.start;
        extent.start += size;
        if extent.is_empty() {
            self.free.remove(index);
        }
        Ok(offset)
    }

    fn free(&mut self, allocation: Allocation) -> Result<(), PartitionError> {
        let invalid = PartitionError::InvalidFree {
            offset: allocation.offset(),
            len: allocation.len(),
        };
        if allocation.is_empty() || allocation.end() > self.capacity {
            return Err(invalid);
        }

        let index = self.free.partition_point(|extent| extent.start < allocation.offset());
        let merge_prev = match index.checked_sub(1).map(|prev| &self.free[prev]) {
            Some(prev) if prev.end > allocation.offset() => return Err(invalid),
            Some(prev) => prev.end == allocation.offset(),
            None => false,
        };
        let merge_next = match self.free.get(index) {
            Some(next) if next.start < allocation.end() => return Err(invalid),
            Some(next) => next.start == allocation.end(),
            None => false,
        };

        match (merge_prev, merge_next) {
            (true, true) => {
                let next = self.free.remove(index);
                self.free[index - 1].end = next.end;
            }
            (true, false) => self.free[index - 1].end = allocation.end(),
            (false, true) => self.free[index].start = allocation.offset(),
            (false, false) => self.free.insert(index, allocation.range()),
        }
        Ok(())
    }

    fn reset(&mut self) {
        *self = FreeListAllocator::with_capacity(self.capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_list_reuse_and_coalesce() {
        let mut list = FreeListAllocator::with_capacity(100);
        let a = list.allocate(30).unwrap();
        let b = list.allocate(30).unwrap();
        let c = list.allocate(30).unwrap();
        assert_eq!((a, b, c), (0, 30, 60));
        assert_eq!(list.used(), 90);

        list.free(Allocation::new(b, 30)).unwrap();
        assert_eq!(list.used(), 60);
        assert_eq!(list.free_extents(), 2);
        assert_eq!(list.allocated(), vec![Allocation::new(0, 30), Allocation::new(60, 30)]);

        // first fit lands in the hole left by b
        assert_eq!(list.allocate(20).unwrap(), 30);
        assert_eq!(list.largest_free(), 10);

        list.free(Allocation::new(30, 20)).unwrap();
        list.free(Allocation::new(a, 30)).unwrap();
        list.free(Allocation::new(c, 30)).unwrap();
        assert_eq!(list.used(), 0);
        assert!(list.allocated().is_empty());
        assert_eq!(list.free_extents(), 1);
        assert_eq!(list.largest_free(), 100);
    }

    #[test]
    fn test_free_list_rejects_invalid_free() {
        let mut list = FreeListAllocator::with_capacity(64);
        let a = list.allocate(16).unwrap();

        // never allocated
        assert!(matches!(list.free(Allocation::new(32, 8)), Err(PartitionError::InvalidFree { .. })));
        // straddles the allocated/free boundary
        assert!(matches!(list.free(Allocation::new(8, 16)), Err(PartitionError::InvalidFree { .. })));
        // out of range
        assert!(matches!(list.free(Allocation::new(60, 8)), Err(PartitionError::InvalidFree { .. })));

        list.free(Allocation::new(a, 16)).unwrap();
        // double free
        assert!(matches!(list.free(Allocation::new(a, 16)), Err(PartitionError::InvalidFree { .. })));
    }

    #[test]
    fn test_free_list_exhaustion() {
        let mut list = FreeListAllocator::with_capacity(32);
        list.allocate(10).unwrap();
        let hole = list.allocate(10).unwrap();
        list.allocate(10).unwrap();
        list.free(Allocation::new(hole, 10)).unwrap();

        // 12 bytes free in total but no extent is large enough
        assert!(matches!(
            list.allocate(11),
            Err(PartitionError::InsufficientSpace { requested: 11, available: 10 })
        ));

        list.reset();
        assert_eq!(list.used(), 0);
        assert_eq!(list.allocate(32).unwrap(), 0);
    }
}
