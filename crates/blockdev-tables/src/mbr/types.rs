//! MBR partition type codes and entry descriptors

use std::fmt;

/// MBR partition type codes
///
/// Only `Empty`, the two extended codes and `GptProtective` change how a
/// table is decoded. The rest are kept so listings can name what they see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MbrPartitionType {
    /// Empty/unused partition entry
    Empty,
    /// FAT12, CHS
    Fat12,
    /// FAT16 < 32MB, CHS
    Fat16Small,
    /// Extended partition, CHS
    Extended,
    /// FAT16 >= 32MB, CHS
    Fat16,
    /// NTFS/exFAT/HPFS
    Ntfs,
    /// FAT32, CHS
    Fat32Chs,
    /// FAT32, LBA
    Fat32Lba,
    /// FAT16, LBA
    Fat16Lba,
    /// Extended partition, LBA
    ExtendedLba,
    /// Linux swap
    LinuxSwap,
    /// Linux native (ext2/ext3/ext4)
    LinuxNative,
    /// Linux LVM
    LinuxLvm,
    /// GPT protective MBR
    GptProtective,
    /// EFI system partition
    EfiSystem,
    /// Linux RAID autodetect
    LinuxRaid,
    /// Any other code
    Unknown(u8),
}

impl MbrPartitionType {
    /// Create a partition type from a byte value
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x00 => Self::Empty,
            0x01 => Self::Fat12,
            0x04 => Self::Fat16Small,
            0x05 => Self::Extended,
            0x06 => Self::Fat16,
            0x07 => Self::Ntfs,
            0x0B => Self::Fat32Chs,
            0x0C => Self::Fat32Lba,
            0x0E => Self::Fat16Lba,
            0x0F => Self::ExtendedLba,
            0x82 => Self::LinuxSwap,
            0x83 => Self::LinuxNative,
            0x8E => Self::LinuxLvm,
            0xEE => Self::GptProtective,
            0xEF => Self::EfiSystem,
            0xFD => Self::LinuxRaid,
            _ => Self::Unknown(b),
        }
    }

    /// Get the byte value of this partition type
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Empty => 0x00,
            Self::Fat12 => 0x01,
            Self::Fat16Small => 0x04,
            Self::Extended => 0x05,
            Self::Fat16 => 0x06,
            Self::Ntfs => 0x07,
            Self::Fat32Chs => 0x0B,
            Self::Fat32Lba => 0x0C,
            Self::Fat16Lba => 0x0E,
            Self::ExtendedLba => 0x0F,
            Self::LinuxSwap => 0x82,
            Self::LinuxNative => 0x83,
            Self::LinuxLvm => 0x8E,
            Self::GptProtective => 0xEE,
            Self::EfiSystem => 0xEF,
            Self::LinuxRaid => 0xFD,
            Self::Unknown(b) => b,
        }
    }

    /// True for the two codes that root a logical partition chain
    pub fn is_extended(self) -> bool {
        matches!(self, Self::Extended | Self::ExtendedLba)
    }

    /// Get a human-readable name for this partition type
    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Fat12 => "FAT12",
            Self::Fat16Small => "FAT16 (<32MB)",
            Self::Extended => "Extended",
            Self::Fat16 => "FAT16",
            Self::Ntfs => "NTFS/exFAT",
            Self::Fat32Chs => "FAT32 (CHS)",
            Self::Fat32Lba => "FAT32 (LBA)",
            Self::Fat16Lba => "FAT16 (LBA)",
            Self::ExtendedLba => "Extended (LBA)",
            Self::LinuxSwap => "Linux swap",
            Self::LinuxNative => "Linux",
            Self::LinuxLvm => "Linux LVM",
            Self::GptProtective => "GPT Protective",
            Self::EfiSystem => "EFI System",
            Self::LinuxRaid => "Linux RAID",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl fmt::Display for MbrPartitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(b) => write!(f, "Unknown (0x{:02X})", b),
            _ => f.write_str(self.name()),
        }
    }
}

/// One 16-byte partition descriptor
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0x0     1     Status (0x80 = bootable)
/// 0x1     3     CHS start (ignored)
/// 0x4     1     Partition type
/// 0x5     3     CHS end (ignored)
/// 0x8     4     Starting LBA
/// 0xC     4     Sector count
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbrEntry {
    pub status: u8,
    pub partition_type: MbrPartitionType,
    pub start_lba: u32,
    pub sector_count: u32,
}

impl MbrEntry {
    /// Size of a descriptor in bytes
    pub const SIZE: usize = 16;

    /// Parse a descriptor from the first 16 bytes of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            status: bytes[0],
            partition_type: MbrPartitionType::from_byte(bytes[4]),
            start_lba: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            sector_count: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        }
    }

    /// True when the descriptor is unused
    pub fn is_empty(&self) -> bool {
        self.partition_type == MbrPartitionType::Empty
    }

    pub fn is_bootable(&self) -> bool {
        self.status & 0x80 != 0
    }
}
