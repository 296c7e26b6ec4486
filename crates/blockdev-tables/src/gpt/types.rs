//! GPT partition types and structures

use crate::checksum;
use crate::guid::{format_guid, is_nil};
use blockdev_core::limits::{MIN_GPT_ENTRY_SIZE, MIN_GPT_HEADER_SIZE};
use blockdev_core::{Error, Result};
use std::fmt;

fn le_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

fn le_u64(bytes: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes([
        bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3],
        bytes[offset + 4], bytes[offset + 5], bytes[offset + 6], bytes[offset + 7],
    ])
}

fn guid_at(bytes: &[u8], offset: usize) -> [u8; 16] {
    let mut guid = [0u8; 16];
    guid.copy_from_slice(&bytes[offset..offset + 16]);
    guid
}

/// GPT partition type GUID
///
/// Well-known partition type GUIDs used in GPT partition tables, stored in on-disk byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartitionTypeGuid(pub [u8; 16]);

impl PartitionTypeGuid {
    /// Unused entry
    pub const UNUSED: Self = Self([0; 16]);

    /// EFI System Partition
    pub const EFI_SYSTEM: Self = Self([
        0x28, 0x73, 0x2a, 0xc1, 0x1f, 0xf8, 0xd2, 0x11,
        0xba, 0x4b, 0x00, 0xa0, 0xc9, 0x3e, 0xc9, 0x3b,
    ]);

    /// Microsoft Basic Data (FAT, NTFS, exFAT)
    pub const MICROSOFT_BASIC_DATA: Self = Self([
        0xa2, 0xa0, 0xd0, 0xeb, 0xe5, 0xb9, 0x33, 0x44,
        0x87, 0xc0, 0x68, 0xb6, 0xb7, 0x26, 0x99, 0xc7,
    ]);

    /// Linux filesystem
    pub const LINUX_FILESYSTEM: Self = Self([
        0xaf, 0x3d, 0xc6, 0x0f, 0x83, 0x84, 0x72, 0x47,
        0x8e, 0x79, 0x3d, 0x69, 0xd8, 0x47, 0x7d, 0xe4,
    ]);

    /// Linux swap
    pub const LINUX_SWAP: Self = Self([
        0x6d, 0xfd, 0x57, 0x06, 0xab, 0xa4, 0xc4, 0x43,
        0x84, 0xe5, 0x09, 0x33, 0xc8, 0x4b, 0x4f, 0x4f,
    ]);

    /// Get a human-readable name for this partition type
    pub fn name(&self) -> &str {
        match *self {
            Self::UNUSED => "Unused",
            Self::EFI_SYSTEM => "EFI System",
            Self::MICROSOFT_BASIC_DATA => "Microsoft Basic Data",
            Self::LINUX_FILESYSTEM => "Linux filesystem",
            Self::LINUX_SWAP => "Linux swap",
            _ => "Unknown",
        }
    }

    /// True when the slot holding this type is unused
    pub fn is_unused(&self) -> bool {
        is_nil(&self.0)
    }

    /// Canonical text form of the type GUID
    pub fn to_guid_string(&self) -> String {
        format_guid(&self.0)
    }
}

impl fmt::Display for PartitionTypeGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// GPT partition entry
///
/// The first 128 bytes of each array slot; larger entry sizes only add reserved space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GptPartitionEntry {
    /// Partition type GUID
    pub partition_type_guid: PartitionTypeGuid,
    /// Unique partition GUID
    pub unique_partition_guid: [u8; 16],
    /// First LBA (inclusive)
    pub first_lba: u64,
    /// Last LBA (inclusive)
    pub last_lba: u64,
    /// Attribute flags
    pub attributes: u64,
    /// Partition name (UTF-16LE, 72 bytes = 36 characters)
    pub name: String,
}

impl GptPartitionEntry {
    /// Size of the defined part of a partition entry in bytes
    pub const ENTRY_SIZE: usize = 128;

    /// Attribute bit 0: required by the platform
    pub const ATTR_REQUIRED: u64 = 1;

    /// Parse a partition entry from the first 128 bytes of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            partition_type_guid: PartitionTypeGuid(guid_at(bytes, 0)),
            unique_partition_guid: guid_at(bytes, 16),
            first_lba: le_u64(bytes, 32),
            last_lba: le_u64(bytes, 40),
            attributes: le_u64(bytes, 48),
            name: Self::parse_name(&bytes[56..Self::ENTRY_SIZE]),
        }
    }

    /// Check if this entry is unused
    pub fn is_unused(&self) -> bool {
        self.partition_type_guid.is_unused()
    }

    /// Get the size of this partition in LBA sectors
    pub fn size_lba(&self) -> u64 {
        if self.last_lba >= self.first_lba {
            self.last_lba - self.first_lba + 1
        } else {
            0
        }
    }

    /// Canonical text form of the unique partition GUID
    pub fn unique_guid_string(&self) -> String {
        format_guid(&self.unique_partition_guid)
    }

    /// Parse UTF-16LE partition name from bytes
    fn parse_name(bytes: &[u8]) -> String {
        let utf16_chars: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .take_while(|&c| c != 0)
            .collect();

        String::from_utf16_lossy(&utf16_chars)
    }
}

/// GPT header
///
/// The GPT header contains metadata about the partition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GptHeader {
    /// GPT revision (usually 0x00010000)
    pub revision: u32,
    /// Header size in bytes (usually 92)
    pub header_size: u32,
    /// CRC32 checksum of header
    pub header_crc32: u32,
    /// Reserved (must be zero)
    pub reserved: u32,
    /// Current LBA (location of this header)
    pub current_lba: u64,
    /// Backup LBA (location of the other header)
    pub backup_lba: u64,
    /// First usable LBA for partitions
    pub first_usable_lba: u64,
    /// Last usable LBA for partitions
    pub last_usable_lba: u64,
    /// Disk GUID
    pub disk_guid: [u8; 16],
    /// Starting LBA of partition entries
    pub partition_entries_lba: u64,
    /// Number of partition entries
    pub num_partition_entries: u32,
    /// Size of each partition entry
    pub partition_entry_size: u32,
    /// CRC32 of partition entries array
    pub partition_entries_crc32: u32,
}

impl GptHeader {
    /// GPT header signature
    pub const SIGNATURE: &'static [u8; 8] = b"EFI PART";

    /// Typical GPT header size
    pub const HEADER_SIZE: usize = 92;

    /// Byte range of the header CRC32 field
    const CRC_FIELD: std::ops::Range<usize> = 16..20;

    /// Parse a GPT header from a header sector
    ///
    /// Returns [`Error::NotFound`] when the signature is missing.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::HEADER_SIZE || &bytes[0..8] != Self::SIGNATURE {
            return Err(Error::not_found("no GPT header signature"));
        }

        Ok(Self {
            revision: le_u32(bytes, 8),
            header_size: le_u32(bytes, 12),
            header_crc32: le_u32(bytes, 16),
            reserved: le_u32(bytes, 20),
            current_lba: le_u64(bytes, 24),
            backup_lba: le_u64(bytes, 32),
            first_usable_lba: le_u64(bytes, 40),
            last_usable_lba: le_u64(bytes, 48),
            disk_guid: guid_at(bytes, 56),
            partition_entries_lba: le_u64(bytes, 72),
            num_partition_entries: le_u32(bytes, 80),
            partition_entry_size: le_u32(bytes, 84),
            partition_entries_crc32: le_u32(bytes, 88),
        })
    }

    /// Verify the header CRC32 checksum
    ///
    /// # Security
    /// Validates header integrity to detect corruption or tampering
    ///
    /// # Arguments
    /// * `header_bytes` - The raw header sector as read from disk
    pub fn verify_header_crc32(&self, header_bytes: &[u8]) -> Result<()> {
        let size = self.header_size as usize;
        if self.header_size < MIN_GPT_HEADER_SIZE || size > header_bytes.len() {
            return Err(Error::integrity_mismatch(format!(
                "GPT header size {} outside {}..={}",
                self.header_size,
                MIN_GPT_HEADER_SIZE,
                header_bytes.len()
            )));
        }

        let calculated = checksum::crc32_with_zeroed(&header_bytes[..size], Self::CRC_FIELD);
        if calculated != self.header_crc32 {
            return Err(Error::integrity_mismatch(format!(
                "GPT header CRC32 0x{:08X} does not match stored 0x{:08X}",
                calculated, self.header_crc32
            )));
        }

        Ok(())
    }

    /// Verify the partition entries array CRC32 checksum
    ///
    /// # Arguments
    /// * `partition_entries_bytes` - The raw partition entries array, exactly as long as the
    ///   header declares
    pub fn verify_partition_entries_crc32(&self, partition_entries_bytes: &[u8]) -> Result<()> {
        let calculated = checksum::crc32(partition_entries_bytes);
        if calculated != self.partition_entries_crc32 {
            return Err(Error::integrity_mismatch(format!(
                "GPT partition entries CRC32 0x{:08X} does not match stored 0x{:08X}",
                calculated, self.partition_entries_crc32
            )));
        }

        Ok(())
    }

    /// Check that declared entries are large enough to hold the defined fields
    pub fn validate_entry_size(&self) -> Result<()> {
        if self.partition_entry_size < MIN_GPT_ENTRY_SIZE {
            return Err(Error::integrity_mismatch(format!(
                "GPT partition entry size {} below minimum {}",
                self.partition_entry_size, MIN_GPT_ENTRY_SIZE
            )));
        }
        Ok(())
    }

    /// Canonical text form of the disk GUID
    pub fn disk_guid_string(&self) -> String {
        format_guid(&self.disk_guid)
    }
}
