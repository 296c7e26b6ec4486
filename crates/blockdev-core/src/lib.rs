//! # blockdev Core
//!
//! Core traits, types, and error handling for partition table probing.
//!
//! This crate provides the foundations shared by the table decoders:
//! - **Error**: the probe error taxonomy
//! - **PartitionTable**: read-only view over a decoded table
//! - **Partition**: one numbered partition and its kind
//! - **ProbeOptions**: decoding limits and opt-in recovery
//!
//! ## Example
//!
//! ```rust,no_run
//! use blockdev_core::{PartitionTable, Result};
//!
//! fn list(table: &dyn PartitionTable) -> Result<()> {
//!     println!("Table type: {}", table.table_kind());
//!     for partition in table.partitions().values() {
//!         println!("  {}", partition);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod limits;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use error::{Error, Result};
pub use limits::ProbeOptions;
pub use traits::{PartitionTable, ReadSeek};
pub use types::{format_size, Partition, PartitionKind, TableKind, TableSummary, SECTOR_SIZE};
