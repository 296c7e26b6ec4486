//! Decoding limits and probe configuration
//!
//! Every size or count read from disk is untrusted. The helpers here turn
//! on-disk values into addresses and buffer sizes without overflowing or
//! allocating without bound.

use crate::{Error, Result};

/// Default bound on extension records visited while walking a logical chain
pub const DEFAULT_MAX_LOGICAL_PARTITIONS: usize = 128;

/// Default bound on the GPT entry array (1 MiB, 64x the usual 16 KiB array)
pub const DEFAULT_MAX_ENTRY_ARRAY_BYTES: usize = 1024 * 1024;

/// Smallest GPT header size the format allows
pub const MIN_GPT_HEADER_SIZE: u32 = 92;

/// Smallest GPT entry size the format allows
pub const MIN_GPT_ENTRY_SIZE: u32 = 128;

/// Options controlling a probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Maximum number of extension records followed in an MBR logical chain
    pub max_logical_partitions: usize,

    /// Maximum size in bytes of a GPT partition entry array
    pub max_entry_array_bytes: usize,

    /// Fall back to the backup GPT when the primary fails its checksums
    pub recover_from_backup: bool,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            max_logical_partitions: DEFAULT_MAX_LOGICAL_PARTITIONS,
            max_entry_array_bytes: DEFAULT_MAX_ENTRY_ARRAY_BYTES,
            recover_from_backup: false,
        }
    }
}

impl ProbeOptions {
    /// Set the logical chain bound
    pub fn with_max_logical_partitions(mut self, max: usize) -> Self {
        self.max_logical_partitions = max;
        self
    }

    /// Set the entry array size bound
    pub fn with_max_entry_array_bytes(mut self, max: usize) -> Self {
        self.max_entry_array_bytes = max;
        self
    }

    /// Enable or disable backup GPT recovery
    pub fn with_backup_recovery(mut self, enabled: bool) -> Self {
        self.recover_from_backup = enabled;
        self
    }
}

/// Validate the byte size of a GPT entry array read from a header
///
/// # Security
/// Prevents memory exhaustion from a forged entry count or entry size
pub fn entry_array_size(count: u32, entry_size: u32, limit: usize) -> Result<usize> {
    let size = (count as u64)
        .checked_mul(entry_size as u64)
        .ok_or_else(|| Error::integrity_mismatch("GPT entry array size overflows"))?;

    if size > limit as u64 {
        return Err(Error::integrity_mismatch(format!(
            "GPT entry array size {} exceeds limit {}",
            size, limit
        )));
    }

    size.try_into()
        .map_err(|_| Error::integrity_mismatch("GPT entry array size exceeds platform limits"))
}

/// Convert a sector number into an absolute byte offset
pub fn sector_offset(lba: u64) -> Option<u64> {
    lba.checked_mul(crate::SECTOR_SIZE)
}
