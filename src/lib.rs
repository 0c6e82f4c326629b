//! Fixed-size memory region split into protected partitions, with a
//! checksummed block store on top.
//!
//! A [`region::Region`] owns one zeroed buffer and carves it front to back
//! into [`partition::Partition`]s. Each partition enforces its
//! [`protection::ProtectionFlags`] and hands out memory through a bump
//! allocator. A [`store::BlockStore`] manages id-addressed data blocks inside
//! one partition and detects corruption with [`checksum::checksum`].

pub mod checksum;
pub mod layout;
pub mod partition;
pub mod protection;
pub mod region;
pub mod stats;
pub mod store;
pub mod system;
