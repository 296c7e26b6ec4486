//! Core traits for partition table probing

use crate::types::{Partition, TableKind};
use std::collections::BTreeMap;
use std::io::{Read, Seek};

/// Read-only view shared by every decoded partition table
pub trait PartitionTable: Send + Sync {
    /// Get a human-readable identifier for this table layout
    fn identify(&self) -> &str;

    /// Get the layout of this table
    fn table_kind(&self) -> TableKind;

    /// Get the disk-wide identifier (empty when the layout has none)
    fn disk_identifier(&self) -> &str;

    /// Get all partitions keyed by partition number
    fn partitions(&self) -> &BTreeMap<u32, Partition>;

    /// Get a specific partition by number
    fn partition(&self, number: u32) -> Option<&Partition> {
        self.partitions().get(&number)
    }
}

/// Combined trait for Read + Seek
///
/// This is the byte source every decoder reads from. A probe borrows it
/// mutably for the whole call, so its position is never shared.
pub trait ReadSeek: Read + Seek + Send {}

/// Blanket implementation for any type that implements Read + Seek
impl<T: Read + Seek + Send> ReadSeek for T {}
