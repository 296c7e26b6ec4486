//! Mixed-endian GUID formatting
//!
//! On disk a GUID is stored as `u32 LE, u16 LE, u16 LE, [u8; 2], [u8; 6]`.
//! The canonical text form prints every field big-endian, so the first three
//! fields are byte-swapped while the last two are copied as they are.

use blockdev_core::{Error, Result};
use uuid::Uuid;

/// Length of the canonical `8-4-4-4-12` text form
const GUID_TEXT_LEN: usize = 36;

/// Format 16 raw on-disk bytes as a lowercase `8-4-4-4-12` string
pub fn format_guid(raw: &[u8; 16]) -> String {
    Uuid::from_bytes_le(*raw).hyphenated().to_string()
}

/// Parse a canonical `8-4-4-4-12` string back into raw on-disk bytes
pub fn parse_guid(text: &str) -> Result<[u8; 16]> {
    if text.len() != GUID_TEXT_LEN {
        return Err(Error::invalid_identifier(format!(
            "expected {} characters, got {}: {:?}",
            GUID_TEXT_LEN,
            text.len(),
            text
        )));
    }

    let uuid = Uuid::parse_str(text)
        .map_err(|e| Error::invalid_identifier(format!("{:?}: {}", text, e)))?;

    Ok(uuid.to_bytes_le())
}

/// True when every byte of the GUID is zero
pub fn is_nil(raw: &[u8; 16]) -> bool {
    raw.iter().all(|&b| b == 0)
}
