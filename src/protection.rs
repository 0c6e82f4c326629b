bitflags::bitflags! {
    /// Access policy of a partition.
    ///
    /// Flags are enforced logically: operations that would violate them are
    /// rejected with an error, nothing traps.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ProtectionFlags: u32 {
        /// Readable, not writable.
        const READ_ONLY     = 0x01;
        /// Readable and writable. Required for allocation.
        const READ_WRITE    = 0x02;
        /// Executable.
        const EXECUTE       = 0x04;
        /// Overrides everything else: no reads, writes or allocations.
        const NO_ACCESS     = 0x08;
    }
}

impl ProtectionFlags {
    pub fn allows_read(&self) -> bool {
        !self.contains(ProtectionFlags::NO_ACCESS)
    }

    pub fn allows_write(&self) -> bool {
        self.contains(ProtectionFlags::READ_WRITE) && !self.contains(ProtectionFlags::NO_ACCESS)
    }
}

impl Default for ProtectionFlags {
    fn default() -> Self {
        ProtectionFlags::READ_WRITE
    }
}
