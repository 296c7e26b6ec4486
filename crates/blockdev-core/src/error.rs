//! Probe error types

use thiserror::Error;

/// The main error type for partition table probing
#[derive(Error, Debug)]
pub enum Error {
    /// The byte source failed or ended before a full structure was read
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// No recognized signature at the probed location
    #[error("Partition table not found: {0}")]
    NotFound(String),

    /// The first sector holds a protective MBR; the GUID partition table is authoritative
    #[error("Protective MBR found, GUID partition table follows")]
    GptTableFollows,

    /// A stored checksum disagrees with the computed one
    #[error("Integrity mismatch: {0}")]
    IntegrityMismatch(String),

    /// The logical partition chain is cyclic, overlong or inconsistent
    #[error("Logical partition chain corrupted: {0}")]
    ChainCorruption(String),

    /// Text that is not a canonical 8-4-4-4-12 identifier
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

/// Result type alias for probe operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create an integrity mismatch error
    pub fn integrity_mismatch(msg: impl Into<String>) -> Self {
        Error::IntegrityMismatch(msg.into())
    }

    /// Create a chain corruption error
    pub fn chain_corruption(msg: impl Into<String>) -> Self {
        Error::ChainCorruption(msg.into())
    }

    /// Create an invalid identifier error
    pub fn invalid_identifier(msg: impl Into<String>) -> Self {
        Error::InvalidIdentifier(msg.into())
    }

    /// True when the error means "no table of this kind here".
    ///
    /// These are the only outcomes that allow a caller to try another layout.
    pub fn is_absent(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::GptTableFollows)
    }

    /// True when a table exists but its contents are damaged
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::IntegrityMismatch(_) | Error::ChainCorruption(_))
    }
}
