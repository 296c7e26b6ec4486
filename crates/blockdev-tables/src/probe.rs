//! Partition table detection
//!
//! The MBR is decoded first. Only a missing boot signature or a protective
//! MBR lets the probe move on to the GPT; every other MBR failure means a
//! table exists but is damaged, and is returned as it is.

use crate::gpt::GptPartitionTable;
use crate::mbr::MbrPartitionTable;
use blockdev_core::{Partition, PartitionTable, ProbeOptions, ReadSeek, Result, TableKind};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

/// The authoritative partition table found on a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbedTable {
    Mbr(MbrPartitionTable),
    Gpt(GptPartitionTable),
}

impl ProbedTable {
    fn inner(&self) -> &dyn PartitionTable {
        match self {
            Self::Mbr(table) => table,
            Self::Gpt(table) => table,
        }
    }
}

impl PartitionTable for ProbedTable {
    fn identify(&self) -> &str {
        self.inner().identify()
    }

    fn table_kind(&self) -> TableKind {
        self.inner().table_kind()
    }

    fn disk_identifier(&self) -> &str {
        self.inner().disk_identifier()
    }

    fn partitions(&self) -> &BTreeMap<u32, Partition> {
        self.inner().partitions()
    }
}

/// Detect and decode the partition table of a stream with default options
pub fn probe(stream: &mut dyn ReadSeek) -> Result<ProbedTable> {
    probe_with(stream, &ProbeOptions::default())
}

/// Detect and decode the partition table of a stream
///
/// # Errors
///
/// Returns exactly one error: the MBR error when it is not a "no MBR here"
/// outcome, otherwise whatever the GPT decoder reports.
pub fn probe_with(stream: &mut dyn ReadSeek, options: &ProbeOptions) -> Result<ProbedTable> {
    match MbrPartitionTable::parse(stream, options) {
        Ok(mbr) => Ok(ProbedTable::Mbr(mbr)),
        Err(err) if err.is_absent() => {
            tracing::debug!("No usable MBR ({}), reading GPT header", err);
            GptPartitionTable::parse(stream, options).map(ProbedTable::Gpt)
        }
        Err(err) => Err(err),
    }
}

/// Open a device node or disk image read-only and probe it
pub fn probe_path(path: &Path, options: &ProbeOptions) -> Result<ProbedTable> {
    let mut file = File::open(path)?;
    tracing::debug!("Probing {}", path.display());
    probe_with(&mut file, options)
}
