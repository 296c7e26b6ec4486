//! # blockdev Tables
//!
//! Partition table decoders for block devices and disk images.
//!
//! This crate provides read-only decoders for the two common layouts:
//! - **MBR**: Master Boot Record, including extended/logical partition chains
//! - **GPT**: GUID Partition Table, with header and entry array CRC32 checks
//!
//! [`probe`] picks the authoritative one: an MBR wins unless it is missing
//! or protective, in which case the GPT at byte offset 512 is decoded.
//!
//! ## Example
//!
//! ```rust,no_run
//! use blockdev_tables::probe_path;
//! use blockdev_core::{PartitionTable, ProbeOptions};
//! use std::path::Path;
//!
//! let table = probe_path(Path::new("/dev/sda"), &ProbeOptions::default()).unwrap();
//!
//! println!("Partition table: {} {}", table.table_kind(), table.disk_identifier());
//! for partition in table.partitions().values() {
//!     println!("  {}", partition);
//! }
//! ```

pub mod checksum;
pub mod gpt;
pub mod guid;
pub mod mbr;
pub mod probe;

pub use gpt::GptPartitionTable;
pub use guid::{format_guid, parse_guid};
pub use mbr::MbrPartitionTable;
pub use probe::{probe, probe_path, probe_with, ProbedTable};
