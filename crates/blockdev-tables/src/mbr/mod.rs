//! MBR (Master Boot Record) partition table implementation

pub mod types;

use blockdev_core::limits::sector_offset;
use blockdev_core::{
    Error, Partition, PartitionKind, PartitionTable, ProbeOptions, ReadSeek, Result, TableKind,
};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::SeekFrom;
use types::{MbrEntry, MbrPartitionType};

/// MBR partition table
///
/// The Master Boot Record is the traditional partitioning scheme used by BIOS-based systems.
/// It holds up to 4 primary slots; one of them may be an extended partition whose first
/// sector starts a chain of extension records, each describing one logical partition.
///
/// # Structure
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0x000   440   Bootstrap code
/// 0x1B8   4     Disk signature
/// 0x1BE   16    Partition entry 1
/// 0x1CE   16    Partition entry 2
/// 0x1DE   16    Partition entry 3
/// 0x1EE   16    Partition entry 4
/// 0x1FE   2     Boot signature (0xAA55)
/// ```
///
/// Extension records reuse the same sector layout; only the first two
/// entries are meaningful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MbrPartitionTable {
    partitions: BTreeMap<u32, Partition>,
    partition_types: BTreeMap<u32, MbrPartitionType>,
    bootable: BTreeSet<u32>,
    disk_signature: u32,
}

impl MbrPartitionTable {
    /// The boot signature that must be present at offset 0x1FE
    pub const BOOT_SIGNATURE: u16 = 0xAA55;

    /// Size of the MBR in bytes (always 512)
    pub const MBR_SIZE: usize = 512;

    /// Offset of the first partition entry
    pub const PARTITION_TABLE_OFFSET: usize = 0x1BE;

    /// Offset of the disk signature
    pub const DISK_SIGNATURE_OFFSET: usize = 0x1B8;

    /// Offset of the boot signature
    pub const BOOT_SIGNATURE_OFFSET: usize = 0x1FE;

    /// Number of partition entries in MBR
    pub const NUM_PARTITIONS: usize = 4;

    /// Number given to the first logical partition
    pub const FIRST_LOGICAL_NUMBER: u32 = 5;

    /// Parse an MBR from a readable and seekable stream
    ///
    /// The first sector of the stream is read regardless of the current position.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the boot signature is missing
    /// - [`Error::GptTableFollows`] if a slot holds a GPT protective entry
    /// - [`Error::ChainCorruption`] if the logical partition chain is cyclic, too long,
    ///   or more than one extended slot exists
    /// - [`Error::Io`] if the stream fails or ends early
    pub fn parse(stream: &mut dyn ReadSeek, options: &ProbeOptions) -> Result<Self> {
        let mbr = read_sector(stream, 0)?;

        let boot_signature = u16::from_le_bytes([
            mbr[Self::BOOT_SIGNATURE_OFFSET],
            mbr[Self::BOOT_SIGNATURE_OFFSET + 1],
        ]);

        if boot_signature != Self::BOOT_SIGNATURE {
            return Err(Error::not_found(format!(
                "no MBR boot signature: expected 0x{:04X}, got 0x{:04X}",
                Self::BOOT_SIGNATURE,
                boot_signature
            )));
        }

        let disk_signature = u32::from_le_bytes([
            mbr[Self::DISK_SIGNATURE_OFFSET],
            mbr[Self::DISK_SIGNATURE_OFFSET + 1],
            mbr[Self::DISK_SIGNATURE_OFFSET + 2],
            mbr[Self::DISK_SIGNATURE_OFFSET + 3],
        ]);

        let mut table = Self {
            partitions: BTreeMap::new(),
            partition_types: BTreeMap::new(),
            bootable: BTreeSet::new(),
            disk_signature,
        };
        let mut extended_base = None;

        for (i, entry) in Self::entries(&mbr).enumerate() {
            let number = i as u32 + 1;

            let kind = match entry.partition_type {
                MbrPartitionType::Empty => continue,
                MbrPartitionType::GptProtective => {
                    tracing::debug!("Slot {} is a GPT protective entry", number);
                    return Err(Error::GptTableFollows);
                }
                t if t.is_extended() => {
                    if let Some(base) = extended_base {
                        return Err(Error::chain_corruption(format!(
                            "second extended partition in slot {} (first starts at sector {})",
                            number, base
                        )));
                    }
                    extended_base = Some(entry.start_lba);
                    PartitionKind::Extended
                }
                _ => PartitionKind::Primary,
            };

            if entry.is_bootable() {
                table.bootable.insert(number);
            }

            table.insert(
                Partition::new(number, kind, entry.start_lba as u64, entry.sector_count as u64),
                entry.partition_type,
            );
        }

        if let Some(base) = extended_base {
            table.read_logical_chain(stream, base as u64, options.max_logical_partitions)?;
        }

        tracing::debug!(
            "Decoded MBR with {} partitions (disk signature 0x{:08X})",
            table.partitions.len(),
            disk_signature
        );

        Ok(table)
    }

    /// Walk the extension records starting at `base`
    ///
    /// Each record holds a logical partition relative to itself and a link
    /// relative to `base`. Records are read in chain order and numbered from 5.
    fn read_logical_chain(
        &mut self,
        stream: &mut dyn ReadSeek,
        base: u64,
        max_records: usize,
    ) -> Result<()> {
        let mut visited = HashSet::new();
        let mut chain_offset = 0u64;
        let mut number = Self::FIRST_LOGICAL_NUMBER;

        loop {
            if visited.len() >= max_records {
                return Err(Error::chain_corruption(format!(
                    "more than {} extension records",
                    max_records
                )));
            }

            let record_lba = base + chain_offset;
            if !visited.insert(record_lba) {
                return Err(Error::chain_corruption(format!(
                    "extension record at sector {} visited twice",
                    record_lba
                )));
            }

            let record = read_sector(stream, record_lba)?;
            let logical = MbrEntry::from_bytes(&record[Self::PARTITION_TABLE_OFFSET..]);
            let link =
                MbrEntry::from_bytes(&record[Self::PARTITION_TABLE_OFFSET + MbrEntry::SIZE..]);

            if !logical.is_empty() {
                let start = record_lba + logical.start_lba as u64;
                tracing::debug!("Logical partition {} at sector {}", number, start);
                self.insert(
                    Partition::new(number, PartitionKind::Logical, start, logical.sector_count as u64),
                    logical.partition_type,
                );
                number += 1;
            }

            if link.is_empty() || link.start_lba == 0 {
                return Ok(());
            }
            chain_offset = link.start_lba as u64;
        }
    }

    fn entries(sector: &[u8]) -> impl Iterator<Item = MbrEntry> + '_ {
        sector[Self::PARTITION_TABLE_OFFSET..Self::BOOT_SIGNATURE_OFFSET]
            .chunks_exact(MbrEntry::SIZE)
            .map(MbrEntry::from_bytes)
    }

    fn insert(&mut self, partition: Partition, partition_type: MbrPartitionType) {
        self.partition_types.insert(partition.number, partition_type);
        self.partitions.insert(partition.number, partition);
    }

    /// Get the disk signature
    pub fn disk_signature(&self) -> u32 {
        self.disk_signature
    }

    /// Get the raw type code of a partition
    pub fn partition_type(&self, number: u32) -> Option<MbrPartitionType> {
        self.partition_types.get(&number).copied()
    }

    /// True when the primary slot carries the active (0x80) flag
    pub fn is_bootable(&self, number: u32) -> bool {
        self.bootable.contains(&number)
    }
}

impl PartitionTable for MbrPartitionTable {
    fn identify(&self) -> &str {
        "Master Boot Record"
    }

    fn table_kind(&self) -> TableKind {
        TableKind::Mbr
    }

    fn disk_identifier(&self) -> &str {
        ""
    }

    fn partitions(&self) -> &BTreeMap<u32, Partition> {
        &self.partitions
    }
}

fn read_sector(stream: &mut dyn ReadSeek, lba: u64) -> Result<[u8; MbrPartitionTable::MBR_SIZE]> {
    let offset = sector_offset(lba).ok_or_else(|| {
        Error::chain_corruption(format!("sector {} lies beyond addressable space", lba))
    })?;

    stream.seek(SeekFrom::Start(offset))?;
    let mut sector = [0u8; MbrPartitionTable::MBR_SIZE];
    stream.read_exact(&mut sector)?;
    Ok(sector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SECTOR: usize = 512;

    fn write_entry(sector: &mut [u8], slot: usize, partition_type: u8, start: u32, count: u32) {
        let offset = MbrPartitionTable::PARTITION_TABLE_OFFSET + slot * MbrEntry::SIZE;
        sector[offset + 4] = partition_type;
        sector[offset + 8..offset + 12].copy_from_slice(&start.to_le_bytes());
        sector[offset + 12..offset + 16].copy_from_slice(&count.to_le_bytes());
    }

    fn sign(sector: &mut [u8]) {
        sector[0x1FE] = 0x55;
        sector[0x1FF] = 0xAA;
    }

    /// Create a disk of `sectors` sectors with a signed, empty MBR
    fn create_test_disk(sectors: usize) -> Vec<u8> {
        let mut disk = vec![0u8; sectors * SECTOR];
        disk[0x1B8..0x1BC].copy_from_slice(&0x7856_3412u32.to_le_bytes());
        sign(&mut disk[..SECTOR]);
        disk
    }

    /// Primary at slot 1, extended at slot 2 holding two logical partitions
    fn create_logical_disk() -> Vec<u8> {
        let mut disk = create_test_disk(256);
        write_entry(&mut disk[..SECTOR], 0, 0x83, 2, 90);
        write_entry(&mut disk[..SECTOR], 1, 0x05, 100, 150);

        let ebr1 = 100 * SECTOR;
        write_entry(&mut disk[ebr1..ebr1 + SECTOR], 0, 0x83, 1, 50);
        write_entry(&mut disk[ebr1..ebr1 + SECTOR], 1, 0x05, 60, 60);
        sign(&mut disk[ebr1..ebr1 + SECTOR]);

        let ebr2 = 160 * SECTOR;
        write_entry(&mut disk[ebr2..ebr2 + SECTOR], 0, 0x82, 1, 40);
        sign(&mut disk[ebr2..ebr2 + SECTOR]);

        disk
    }

    fn parse(disk: Vec<u8>) -> Result<MbrPartitionTable> {
        MbrPartitionTable::parse(&mut Cursor::new(disk), &ProbeOptions::default())
    }

    #[test]
    fn test_parse_empty_mbr() {
        let table = parse(create_test_disk(1)).unwrap();

        assert_eq!(table.identify(), "Master Boot Record");
        assert_eq!(table.table_kind(), TableKind::Mbr);
        assert_eq!(table.disk_identifier(), "");
        assert!(table.partitions().is_empty());
        assert_eq!(table.disk_signature(), 0x7856_3412);
    }

    #[test]
    fn test_parse_four_primaries() {
        let mut disk = create_test_disk(1);
        for (slot, code) in [0x83u8, 0x07, 0x0C, 0x42].into_iter().enumerate() {
            write_entry(&mut disk, slot, code, 2048 * (slot as u32 + 1), 2048);
        }

        let table = parse(disk).unwrap();
        let numbers: Vec<u32> = table.partitions().keys().copied().collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        for partition in table.partitions().values() {
            assert_eq!(partition.kind, PartitionKind::Primary);
            assert!(partition.identifier.is_empty());
        }
        assert_eq!(table.partition(3).unwrap().start_block, 3 * 2048);
        assert_eq!(table.partition_type(4), Some(MbrPartitionType::Unknown(0x42)));
    }

    #[test]
    fn test_empty_slots_are_skipped() {
        let mut disk = create_test_disk(1);
        write_entry(&mut disk, 2, 0x83, 2048, 2048);

        let table = parse(disk).unwrap();
        assert_eq!(table.partitions().len(), 1);
        assert_eq!(table.partition(3).unwrap().number, 3);
    }

    #[test]
    fn test_active_flag_is_recorded() {
        let mut disk = create_test_disk(1);
        write_entry(&mut disk, 0, 0x07, 2048, 2048);
        write_entry(&mut disk, 1, 0x83, 4096, 2048);
        disk[MbrPartitionTable::PARTITION_TABLE_OFFSET + MbrEntry::SIZE] = 0x80;

        let table = parse(disk).unwrap();
        assert!(!table.is_bootable(1));
        assert!(table.is_bootable(2));
        assert!(!table.is_bootable(3));
    }

    #[test]
    fn test_parse_logical_chain() {
        let table = parse(create_logical_disk()).unwrap();

        let kinds: Vec<(u32, PartitionKind)> =
            table.partitions().values().map(|p| (p.number, p.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (1, PartitionKind::Primary),
                (2, PartitionKind::Extended),
                (5, PartitionKind::Logical),
                (6, PartitionKind::Logical),
            ]
        );

        // Logical starts are relative to their own extension record
        assert_eq!(table.partition(5).unwrap().start_block, 101);
        assert_eq!(table.partition(5).unwrap().block_count, 50);
        assert_eq!(table.partition(6).unwrap().start_block, 161);
        assert_eq!(table.partition_type(6), Some(MbrPartitionType::LinuxSwap));
    }

    #[test]
    fn test_gpt_protective_hands_off() {
        let mut disk = create_test_disk(1);
        write_entry(&mut disk, 0, 0xEE, 1, u32::MAX);

        assert!(matches!(parse(disk), Err(Error::GptTableFollows)));
    }

    #[test]
    fn test_protective_in_later_slot_hands_off() {
        let mut disk = create_test_disk(1);
        write_entry(&mut disk, 0, 0x83, 2048, 2048);
        write_entry(&mut disk, 3, 0xEE, 1, 2047);

        assert!(matches!(parse(disk), Err(Error::GptTableFollows)));
    }

    #[test]
    fn test_zero_sector_not_found() {
        let result = parse(vec![0u8; SECTOR]);
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(result.unwrap_err().to_string().contains("boot signature"));
    }

    #[test]
    fn test_truncated_sector_is_io_failure() {
        let result = parse(vec![0u8; 300]);
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_truncated_chain_is_io_failure() {
        let mut disk = create_logical_disk();
        disk.truncate(150 * SECTOR);

        assert!(matches!(parse(disk), Err(Error::Io(_))));
    }

    #[test]
    fn test_cyclic_chain_is_corruption() {
        let mut disk = create_logical_disk();
        // Second record links to itself
        let ebr2 = 160 * SECTOR;
        write_entry(&mut disk[ebr2..ebr2 + SECTOR], 1, 0x05, 60, 60);

        let result = parse(disk);
        assert!(matches!(result, Err(Error::ChainCorruption(_))));
    }

    #[test]
    fn test_chain_bound_is_enforced() {
        let disk = create_logical_disk();
        let options = ProbeOptions::default().with_max_logical_partitions(1);

        let result = MbrPartitionTable::parse(&mut Cursor::new(disk), &options);
        assert!(matches!(result, Err(Error::ChainCorruption(_))));
    }

    #[test]
    fn test_second_extended_is_corruption() {
        let mut disk = create_logical_disk();
        write_entry(&mut disk[..SECTOR], 2, 0x0F, 200, 10);

        assert!(matches!(parse(disk), Err(Error::ChainCorruption(_))));
    }

    #[test]
    fn test_empty_record_continues_chain() {
        let mut disk = create_logical_disk();
        // First record describes nothing but still links onwards
        let ebr1 = 100 * SECTOR;
        write_entry(&mut disk[ebr1..ebr1 + SECTOR], 0, 0x00, 0, 0);

        let table = parse(disk).unwrap();
        assert_eq!(table.partition(5).unwrap().start_block, 161);
        assert!(table.partition(6).is_none());
    }

    #[test]
    fn test_parse_ignores_stream_position() {
        let mut cursor = Cursor::new(create_logical_disk());
        cursor.set_position(4096);

        let table = MbrPartitionTable::parse(&mut cursor, &ProbeOptions::default()).unwrap();
        assert_eq!(table.partitions().len(), 4);
    }
}
