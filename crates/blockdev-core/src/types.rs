//! Core types for partition table probing

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::traits::PartitionTable;

/// Logical sector size assumed by both table layouts
pub const SECTOR_SIZE: u64 = 512;

/// Layout of a decoded partition table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    /// Classic MBR ("msdos") table
    #[serde(rename = "msdos")]
    Mbr,
    /// GUID partition table
    Gpt,
}

impl TableKind {
    /// Short name as reported by partitioning tools
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mbr => "msdos",
            Self::Gpt => "gpt",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Role of a partition within its table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    Primary,
    Extended,
    Logical,
}

impl PartitionKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Extended => "extended",
            Self::Logical => "logical",
        }
    }
}

impl fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// A partition found in a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Partition number (1-4 primary slots, 5+ logical, or GPT array position)
    pub number: u32,

    /// Unique partition identifier (empty for MBR)
    pub identifier: String,

    /// Role of the partition
    pub kind: PartitionKind,

    /// First sector of the partition
    pub start_block: u64,

    /// Number of sectors covered
    pub block_count: u64,

    /// Display name (GPT only)
    pub name: String,
}

impl Partition {
    /// Create a new partition without identifier or name
    pub fn new(number: u32, kind: PartitionKind, start_block: u64, block_count: u64) -> Self {
        Self {
            number,
            identifier: String::new(),
            kind,
            start_block,
            block_count,
            name: String::new(),
        }
    }

    /// Set the unique identifier
    pub fn with_identifier(mut self, identifier: String) -> Self {
        self.identifier = identifier;
        self
    }

    /// Set the display name
    pub fn with_name(mut self, name: String) -> Self {
        self.name = name;
        self
    }

    /// Byte offset of the partition from the start of the device
    pub fn byte_offset(&self) -> u64 {
        self.start_block.saturating_mul(SECTOR_SIZE)
    }

    /// Size of the partition in bytes
    pub fn byte_length(&self) -> u64 {
        self.block_count.saturating_mul(SECTOR_SIZE)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Partition {} [{} @ LBA {}, {}]",
            self.number,
            self.kind,
            self.start_block,
            format_size(self.byte_length())
        )?;
        if !self.identifier.is_empty() {
            write!(f, " {}", self.identifier)?;
        }
        if !self.name.is_empty() {
            write!(f, " \"{}\"", self.name)?;
        }
        Ok(())
    }
}

/// Owned, serializable snapshot of any decoded table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub table_kind: TableKind,
    pub disk_identifier: String,
    pub partitions: Vec<Partition>,
}

impl TableSummary {
    /// Capture the state of a decoded table
    pub fn from_table(table: &dyn PartitionTable) -> Self {
        Self {
            table_kind: table.table_kind(),
            disk_identifier: table.disk_identifier().to_string(),
            partitions: table.partitions().values().cloned().collect(),
        }
    }
}

/// Format size in human-readable format
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
