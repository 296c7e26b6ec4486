//! GPT (GUID Partition Table) partition table implementation

pub mod types;

use blockdev_core::limits::{entry_array_size, sector_offset};
use blockdev_core::{
    Error, Partition, PartitionKind, PartitionTable, ProbeOptions, ReadSeek, Result, TableKind,
    SECTOR_SIZE,
};
use std::collections::BTreeMap;
use std::io::SeekFrom;
use types::{GptHeader, GptPartitionEntry, PartitionTypeGuid};

/// GPT partition table
///
/// The GUID Partition Table is the modern partitioning scheme used by UEFI-based systems.
/// It supports up to 128 partitions by default and uses GUIDs for partition identification.
///
/// # Structure
///
/// ```text
/// LBA 0:    Protective MBR (for backward compatibility)
/// LBA 1:    Primary GPT header
/// LBA 2-33: Partition entries array (typically 128 entries)
/// LBA 34+:  Usable disk space
/// ...
/// Last 33:  Backup partition entries array
/// Last 1:   Backup GPT header
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GptPartitionTable {
    partitions: BTreeMap<u32, Partition>,
    partition_types: BTreeMap<u32, PartitionTypeGuid>,
    header: GptHeader,
    disk_identifier: String,
    from_backup: bool,
}

impl GptPartitionTable {
    /// LBA of the primary GPT header
    pub const PRIMARY_HEADER_LBA: u64 = 1;

    /// Parse a GPT from a readable and seekable stream
    ///
    /// The primary header is read from byte offset 512 regardless of the current
    /// stream position. With [`ProbeOptions::recover_from_backup`] set, a primary
    /// that fails its checksums is replaced by the backup copy in the last sector.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the GPT signature is missing
    /// - [`Error::IntegrityMismatch`] if a checksum or a checksummed size field is invalid
    /// - [`Error::Io`] if the stream fails or is shorter than the declared structures
    pub fn parse(stream: &mut dyn ReadSeek, options: &ProbeOptions) -> Result<Self> {
        match Self::parse_at(stream, Self::PRIMARY_HEADER_LBA, options) {
            Err(Error::IntegrityMismatch(reason)) if options.recover_from_backup => {
                tracing::warn!("Primary GPT rejected ({}), trying backup header", reason);
                Self::parse_backup(stream, options).map_err(|backup_err| {
                    tracing::warn!("Backup GPT rejected: {}", backup_err);
                    Error::IntegrityMismatch(reason)
                })
            }
            result => result,
        }
    }

    /// Parse the backup GPT stored in the last sector of the stream
    pub fn parse_backup(stream: &mut dyn ReadSeek, options: &ProbeOptions) -> Result<Self> {
        let length = stream.seek(SeekFrom::End(0))?;
        let sectors = length / SECTOR_SIZE;
        if sectors <= Self::PRIMARY_HEADER_LBA {
            return Err(Error::not_found(format!(
                "stream of {} bytes has no room for a backup GPT header",
                length
            )));
        }

        let mut table = Self::parse_at(stream, sectors - 1, options)?;
        table.from_backup = true;
        Ok(table)
    }

    /// Parse a GPT whose header lives at `header_lba`
    pub fn parse_at(
        stream: &mut dyn ReadSeek,
        header_lba: u64,
        options: &ProbeOptions,
    ) -> Result<Self> {
        let header_offset = sector_offset(header_lba).ok_or_else(|| {
            Error::not_found(format!("GPT header sector {} is not addressable", header_lba))
        })?;

        stream.seek(SeekFrom::Start(header_offset))?;
        let mut header_bytes = [0u8; SECTOR_SIZE as usize];
        stream.read_exact(&mut header_bytes)?;

        let header = GptHeader::from_bytes(&header_bytes)?;
        header.verify_header_crc32(&header_bytes)?;
        header.validate_entry_size()?;

        let entry_size = header.partition_entry_size as usize;
        let total_entries_size = entry_array_size(
            header.num_partition_entries,
            header.partition_entry_size,
            options.max_entry_array_bytes,
        )?;
        let entries_offset = sector_offset(header.partition_entries_lba).ok_or_else(|| {
            Error::integrity_mismatch(format!(
                "GPT partition entries LBA {} is not addressable",
                header.partition_entries_lba
            ))
        })?;

        // Read all partition entries at once for CRC32 verification
        stream.seek(SeekFrom::Start(entries_offset))?;
        let mut all_entries_bytes = vec![0u8; total_entries_size];
        stream.read_exact(&mut all_entries_bytes)?;

        header.verify_partition_entries_crc32(&all_entries_bytes)?;

        let mut partitions = BTreeMap::new();
        let mut partition_types = BTreeMap::new();

        for (i, entry_bytes) in all_entries_bytes.chunks_exact(entry_size).enumerate() {
            let entry = GptPartitionEntry::from_bytes(entry_bytes);

            if entry.is_unused() {
                continue;
            }

            let number = i as u32 + 1;
            let partition =
                Partition::new(number, PartitionKind::Primary, entry.first_lba, entry.size_lba())
                    .with_identifier(entry.unique_guid_string())
                    .with_name(entry.name.clone());

            partition_types.insert(number, entry.partition_type_guid);
            partitions.insert(number, partition);
        }

        let disk_identifier = header.disk_guid_string();
        tracing::debug!(
            "Decoded GPT {} at LBA {} with {} of {} entries in use",
            disk_identifier,
            header_lba,
            partitions.len(),
            header.num_partition_entries
        );

        Ok(Self {
            partitions,
            partition_types,
            header,
            disk_identifier,
            from_backup: false,
        })
    }

    /// Get the raw disk GUID
    pub fn disk_guid(&self) -> &[u8; 16] {
        &self.header.disk_guid
    }

    /// Get the GPT header
    pub fn header(&self) -> &GptHeader {
        &self.header
    }

    /// Get the partition type GUID of a partition
    pub fn partition_type(&self, number: u32) -> Option<PartitionTypeGuid> {
        self.partition_types.get(&number).copied()
    }

    /// True when this table was recovered from the backup header
    pub fn is_from_backup(&self) -> bool {
        self.from_backup
    }

    /// Get the number of usable sectors on the disk
    pub fn usable_block_count(&self) -> u64 {
        if self.header.last_usable_lba >= self.header.first_usable_lba {
            self.header.last_usable_lba - self.header.first_usable_lba + 1
        } else {
            0
        }
    }
}

impl PartitionTable for GptPartitionTable {
    fn identify(&self) -> &str {
        "GUID Partition Table"
    }

    fn table_kind(&self) -> TableKind {
        TableKind::Gpt
    }

    fn disk_identifier(&self) -> &str {
        &self.disk_identifier
    }

    fn partitions(&self) -> &BTreeMap<u32, Partition> {
        &self.partitions
    }
}
