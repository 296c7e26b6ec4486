//! Disk image builders shared by the integration tests

#![allow(dead_code)]

use blockdev_tables::checksum::crc32;
use blockdev_tables::parse_guid;

pub const SECTOR: usize = 512;

/// In-memory disk image assembled sector by sector
pub struct DiskImage {
    pub bytes: Vec<u8>,
}

impl DiskImage {
    pub fn zeroed(sectors: usize) -> Self {
        Self {
            bytes: vec![0u8; sectors * SECTOR],
        }
    }

    fn sector_mut(&mut self, lba: usize) -> &mut [u8] {
        &mut self.bytes[lba * SECTOR..(lba + 1) * SECTOR]
    }

    /// Write the 0x55AA signature into a sector
    pub fn sign(&mut self, lba: usize) -> &mut Self {
        let sector = self.sector_mut(lba);
        sector[0x1FE] = 0x55;
        sector[0x1FF] = 0xAA;
        self
    }

    /// Fill one 16-byte descriptor of the MBR-style sector at `lba`
    pub fn mbr_entry(&mut self, lba: usize, slot: usize, code: u8, start: u32, count: u32) -> &mut Self {
        let offset = 0x1BE + slot * 16;
        let sector = self.sector_mut(lba);
        sector[offset] = 0x00;
        sector[offset + 4] = code;
        sector[offset + 8..offset + 12].copy_from_slice(&start.to_le_bytes());
        sector[offset + 12..offset + 16].copy_from_slice(&count.to_le_bytes());
        self
    }

    /// Protective MBR covering the whole disk
    pub fn protective_mbr(&mut self) -> &mut Self {
        let last = (self.bytes.len() / SECTOR - 1) as u32;
        self.mbr_entry(0, 0, 0xEE, 1, last).sign(0)
    }

    /// Write a GPT header at `header_lba` and its entry array at `entries_lba`
    ///
    /// `entries` lists `(slot, unique identifier)` pairs; every used slot gets the
    /// Linux filesystem type.
    pub fn gpt(
        &mut self,
        header_lba: usize,
        entries_lba: usize,
        disk_identifier: &str,
        entries: &[(usize, &str)],
    ) -> &mut Self {
        const NUM_ENTRIES: usize = 128;
        const ENTRY_SIZE: usize = 128;
        const LINUX_FILESYSTEM: &str = "0fc63daf-8483-4772-8e79-3d69d8477de4";

        let array_start = entries_lba * SECTOR;
        let array_len = NUM_ENTRIES * ENTRY_SIZE;
        for (i, (slot, identifier)) in entries.iter().enumerate() {
            let offset = array_start + slot * ENTRY_SIZE;
            let first = 2048 * (i as u64 + 1);
            let e = &mut self.bytes[offset..offset + ENTRY_SIZE];
            e[0..16].copy_from_slice(&parse_guid(LINUX_FILESYSTEM).unwrap());
            e[16..32].copy_from_slice(&parse_guid(identifier).unwrap());
            e[32..40].copy_from_slice(&first.to_le_bytes());
            e[40..48].copy_from_slice(&(first + 2047).to_le_bytes());
        }
        let entries_crc = crc32(&self.bytes[array_start..array_start + array_len]);

        let h = self.sector_mut(header_lba);
        h[0..8].copy_from_slice(b"EFI PART");
        h[8..12].copy_from_slice(&0x0001_0000u32.to_le_bytes());
        h[12..16].copy_from_slice(&92u32.to_le_bytes());
        h[16..20].fill(0);
        h[24..32].copy_from_slice(&(header_lba as u64).to_le_bytes());
        h[40..48].copy_from_slice(&34u64.to_le_bytes());
        h[56..72].copy_from_slice(&parse_guid(disk_identifier).unwrap());
        h[72..80].copy_from_slice(&(entries_lba as u64).to_le_bytes());
        h[80..84].copy_from_slice(&(NUM_ENTRIES as u32).to_le_bytes());
        h[84..88].copy_from_slice(&(ENTRY_SIZE as u32).to_le_bytes());
        h[88..92].copy_from_slice(&entries_crc.to_le_bytes());
        let header_crc = crc32(&h[..92]);
        h[16..20].copy_from_slice(&header_crc.to_le_bytes());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

pub const DISK_IDENTIFIER: &str = "6ce102c7-cfc2-4b1c-b658-02ba8cd9f58f";

pub const PARTITION_IDENTIFIERS: [&str; 4] = [
    "0d167e49-2c8d-4c6c-ad82-b5e66b6a9eda",
    "a183b96b-072c-4236-ae9a-d8adce39859d",
    "89fc4f86-1519-47c8-a9f1-11ed504c8f18",
    "8a7d885f-88ba-4734-bbc7-90881480a5a6",
];

/// Protective MBR plus a GPT with four partitions in slots 1-4
pub fn gpt_disk() -> Vec<u8> {
    let entries: Vec<(usize, &str)> = PARTITION_IDENTIFIERS.iter().copied().enumerate().collect();
    DiskImage::zeroed(64)
        .protective_mbr()
        .gpt(1, 2, DISK_IDENTIFIER, &entries)
        .build()
}

/// MBR with a primary in slot 1, an extended in slot 2, and two logical partitions
pub fn logical_disk() -> Vec<u8> {
    DiskImage::zeroed(256)
        .mbr_entry(0, 0, 0x83, 2, 90)
        .mbr_entry(0, 1, 0x0F, 100, 150)
        .sign(0)
        .mbr_entry(100, 0, 0x83, 2, 40)
        .mbr_entry(100, 1, 0x05, 50, 50)
        .sign(100)
        .mbr_entry(150, 0, 0x07, 2, 40)
        .sign(150)
        .build()
}
