use std::collections::BTreeSet;
#[cfg(feature = "serde")]
use std::{fs::{rename, OpenOptions}, io::{self, Read, Write}, path::Path};

use crate::{partition::PartitionName, protection::ProtectionFlags, region::RegionError};

pub const MIB: usize = 1024 * 1024;

/// Size of each partition in the default layout.
pub const DEFAULT_PARTITION_SIZE: usize = 256 * MIB;

pub const GAMING_PARTITION: &str = "Gaming";
pub const READ_WRITE_PARTITION: &str = "Read/Write";
pub const USER_SPACE_PARTITION: &str = "User Space";

#[derive(thiserror::Error, Debug)]
pub enum LayoutError {
    #[error("Region error: {0}")]
    Region(#[from] RegionError),
    #[error("Duplicate partition name '{0}'")]
    DuplicatePartition(PartitionName),
    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),
    #[cfg(feature = "serde")]
    #[error("Malformed layout: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartitionSpec {
    pub name: String,
    pub size: usize,
    pub protection: ProtectionFlags,
}

impl PartitionSpec {
    pub fn new(name: &str, size: usize, protection: ProtectionFlags) -> Self {
        PartitionSpec {
            name: name.to_string(),
            size,
            protection,
        }
    }
}

/// Region capacity and the partitions to carve from it, in placement order.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryLayout {
    pub capacity: usize,
    pub partitions: Vec<PartitionSpec>,
}

impl Default for MemoryLayout {
    fn default() -> Self {
        let rwx = ProtectionFlags::READ_WRITE | ProtectionFlags::EXECUTE;
        MemoryLayout {
            capacity: 3 * DEFAULT_PARTITION_SIZE,
            partitions: vec![
                PartitionSpec::new(GAMING_PARTITION, DEFAULT_PARTITION_SIZE, rwx),
                PartitionSpec::new(READ_WRITE_PARTITION, DEFAULT_PARTITION_SIZE, ProtectionFlags::READ_WRITE),
                PartitionSpec::new(USER_SPACE_PARTITION, DEFAULT_PARTITION_SIZE, rwx),
            ],
        }
    }
}

impl MemoryLayout {
    pub fn new(capacity: usize) -> Self {
        MemoryLayout {
            capacity,
            partitions: Vec::new(),
        }
    }

    pub fn with_partition(mut self, name: &str, size: usize, protection: ProtectionFlags) -> Self {
        self.partitions.push(PartitionSpec::new(name, size, protection));
        self
    }

    /// Checks that the partitions fit and that names stay unique once
    /// truncated.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let mut remaining = self.capacity;
        let mut names = BTreeSet::new();
        for spec in &self.partitions {
            if spec.size > remaining {
                return Err(RegionError::InsufficientSpace {
                    requested: spec.size,
                    available: remaining,
                }.into());
            }
            remaining -= spec.size;

            let name = PartitionName::new(&spec.name);
            if !names.insert(name.clone()) {
                return Err(LayoutError::DuplicatePartition(name));
            }
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl MemoryLayout {
    pub fn from_reader(reader: impl Read) -> Result<Self, LayoutError> {
        let layout: MemoryLayout = serde_json::from_reader(reader)?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let file = OpenOptions::new().read(true).open(path)?;
        MemoryLayout::from_reader(io::BufReader::new(file))
    }

    /// Writes the layout as pretty JSON, replacing `path` atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), LayoutError> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("json.tmp");
        let mut tmp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        serde_json::to_writer_pretty(&mut tmp_file, self)?;
        tmp_file.flush()?;
        rename(&tmp_path, path)?;
        Ok(())
    }
}
