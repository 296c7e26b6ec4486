//! CRC32 helpers for GPT integrity checks

use std::ops::Range;

/// IEEE CRC-32 (reflected polynomial 0xEDB88320) over a byte span
pub fn crc32(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// CRC-32 of `bytes` with the bytes in `field` treated as zero
///
/// The GPT header stores its own checksum inside the checksummed range.
pub fn crc32_with_zeroed(bytes: &[u8], field: Range<usize>) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&bytes[..field.start]);
    hasher.update(&vec![0u8; field.len()]);
    hasher.update(&bytes[field.end..]);
    hasher.finalize()
}
